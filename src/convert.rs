//! Extraction entry points.
//!
//! [`extract`] runs the whole pipeline and returns an [`ExtractionOutput`];
//! [`extract_to_file`] additionally persists the document as pretty JSON.
//! [`extract_rows`] stops after OCR and reduction and needs no LLM at all.

use crate::blocks::Row;
use crate::config::ExtractionConfig;
use crate::error::Pdf2JsonError;
use crate::output::{ExtractionOutput, ExtractionStats, MapOutcome};
use crate::pipeline::input::{self, LoadedInput};
use crate::pipeline::llm::{ProviderGenerator, TextGenerator};
use crate::pipeline::mapper;
use crate::pipeline::ocr::{DocumentAnalyzer, TextractAnalyzer};
use crate::pipeline::reduce::reduce_blocks;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Extract a PDF file or URL into a validated `VendorDoc`.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ExtractionOutput)` on success, including the degraded case where the
/// model answered but its JSON failed validation (check
/// `output.validation_error`).
///
/// # Errors
/// Returns `Err(Pdf2JsonError)` only for fatal errors:
/// - input file missing / not a PDF / download failed
/// - OCR failure, or no table found under the strict table policy
/// - inconsistent block graph (dangling reference, malformed cell)
/// - LLM failure, or output that is not JSON even after repair
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2JsonError> {
    let input_str = input_str.as_ref();
    info!("Starting extraction: {}", input_str);
    let loaded = input::load_input(
        input_str,
        config.download_timeout_secs,
        config.require_pdf_magic,
    )
    .await
    .inspect_err(|e| report_error(config, e))?;
    run(loaded, config).await
}

/// Extract from PDF bytes already in memory.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2JsonError> {
    if config.require_pdf_magic {
        input::check_pdf_magic(bytes, "<memory>".into())?;
    }
    let loaded = LoadedInput {
        source: "<memory>".to_string(),
        bytes: bytes.to_vec(),
    };
    run(loaded, config).await
}

/// Extract and write the document to `output_path` as pretty-printed JSON.
///
/// Uses atomic write (temp file + rename) so a failed run never leaves a
/// partial file behind. Fatal errors write nothing.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2JsonError> {
    let output = extract(input_str, config).await?;
    write_document(&output, output_path.as_ref()).await?;
    Ok(output)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2JsonError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2JsonError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Run OCR and block reduction only.
///
/// Does not require an LLM provider or API key.
pub async fn extract_rows(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<Vec<Row>, Pdf2JsonError> {
    let loaded = input::load_input(
        input_str.as_ref(),
        config.download_timeout_secs,
        config.require_pdf_magic,
    )
    .await?;
    let analyzer = resolve_analyzer(config).await;
    let nodes = analyzer.analyze(&loaded.bytes).await?;
    reduce_blocks(&nodes, config.strict_tables)
}

/// Serialise the document and write it atomically.
pub async fn write_document(
    output: &ExtractionOutput,
    path: &Path,
) -> Result<(), Pdf2JsonError> {
    let write_err = |e: std::io::Error| Pdf2JsonError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    let json = serde_json::to_string_pretty(&output.document)
        .map_err(|e| Pdf2JsonError::Internal(format!("Failed to serialise document: {e}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let written = match tokio::fs::write(&tmp_path, format!("{json}\n")).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    info!("Wrote {}", path.display());
    Ok(())
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    loaded: LoadedInput,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2JsonError> {
    let result = run_stages(loaded, config).await;
    match &result {
        Ok(output) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_extraction_complete(output.stats.total_duration_ms);
            }
        }
        Err(e) => report_error(config, e),
    }
    result
}

async fn run_stages(
    loaded: LoadedInput,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, Pdf2JsonError> {
    let total_start = Instant::now();
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_extraction_start(loaded.bytes.len());
    }

    // ── Step 1: Resolve collaborators ────────────────────────────────────
    // Both are resolved before OCR so a missing API key fails fast instead
    // of after a paid Textract call.
    let generator = resolve_generator(config).await?;
    let analyzer = resolve_analyzer(config).await;

    // ── Step 2: OCR ──────────────────────────────────────────────────────
    if let Some(cb) = cb {
        cb.on_ocr_start();
    }
    let ocr_start = Instant::now();
    let nodes = analyzer.analyze(&loaded.bytes).await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    // ── Step 3: Reduce blocks to rows ────────────────────────────────────
    let rows = reduce_blocks(&nodes, config.strict_tables)?;
    info!("Recovered {} rows from {} blocks", rows.len(), nodes.len());
    if let Some(cb) = cb {
        cb.on_ocr_complete(rows.len());
    }

    // ── Step 4: Map rows to the schema ───────────────────────────────────
    if let Some(cb) = cb {
        cb.on_mapping_start(rows.len());
    }
    let llm_start = Instant::now();
    let mapping = mapper::map_rows(generator.as_ref(), &rows, config).await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    let (document, validation_error) = match mapping.outcome {
        MapOutcome::Valid(doc) => (doc, None),
        MapOutcome::Degraded {
            document,
            diagnostic,
        } => {
            warn!("Using fallback document: {}", diagnostic);
            (document, Some(diagnostic))
        }
    };
    if let Some(cb) = cb {
        cb.on_mapping_complete(document.items.len(), validation_error.is_some());
    }

    let stats = ExtractionStats {
        input_bytes: loaded.bytes.len(),
        ocr_blocks: nodes.len(),
        rows: rows.len(),
        items: document.items.len(),
        input_tokens: mapping.generation.input_tokens as u64,
        output_tokens: mapping.generation.output_tokens as u64,
        repaired: mapping.repaired,
        ocr_duration_ms,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Extraction complete: {} items from {} rows, {}ms total",
        stats.items, stats.rows, stats.total_duration_ms
    );

    Ok(ExtractionOutput {
        document,
        rows,
        validation_error,
        stats,
    })
}

fn report_error(config: &ExtractionConfig, error: &Pdf2JsonError) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_error(&error.to_string());
    }
}

async fn resolve_analyzer(config: &ExtractionConfig) -> Arc<dyn DocumentAnalyzer> {
    match config.analyzer {
        Some(ref analyzer) => Arc::clone(analyzer),
        None => Arc::new(TextractAnalyzer::from_config(config).await),
    }
}

async fn resolve_generator(
    config: &ExtractionConfig,
) -> Result<Arc<dyn TextGenerator>, Pdf2JsonError> {
    if let Some(ref generator) = config.generator {
        return Ok(Arc::clone(generator));
    }
    let provider = resolve_provider(config).await?;
    Ok(Arc::new(ProviderGenerator::new(provider, config)))
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Pdf2JsonError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Pdf2JsonError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key (`OPENAI_API_KEY`, …) from the environment.
/// 3. **Environment** (`EDGEQUAKE_LLM_PROVIDER`, with `EDGEQUAKE_MODEL` or the
///    configured model).
/// 4. **OpenAI** when `OPENAI_API_KEY` is set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
async fn resolve_provider(
    config: &ExtractionConfig,
) -> Result<Arc<dyn LLMProvider>, Pdf2JsonError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        return create_provider(name, config.model_id());
    }

    if let Some(prov) = non_empty_env("EDGEQUAKE_LLM_PROVIDER") {
        let model = non_empty_env("EDGEQUAKE_MODEL");
        return create_provider(&prov, model.as_deref().unwrap_or(config.model_id()));
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return create_provider("openai", config.model_id());
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Pdf2JsonError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
