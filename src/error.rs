//! Error types for the edgequake-pdf2json library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2JsonError`] — **Fatal**: the extraction cannot proceed at all
//!   (missing input, OCR failure, inconsistent block graph, model output that
//!   is not JSON). Returned as `Err(Pdf2JsonError)` from the top-level
//!   `extract*` functions. Nothing is written to disk on these paths.
//!
//! * [`ValidationError`] — **Non-fatal**: the model produced JSON, but it does
//!   not satisfy the `VendorDoc` schema. It is never returned as `Err`;
//!   instead it travels inside [`crate::output::MapOutcome::Degraded`] next to
//!   a flagged fallback document so callers can still persist a result.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2json library.
///
/// Schema violations use [`ValidationError`] and are recovered locally rather
/// than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2JsonError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    MissingInputFile { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is neither a usable file path nor a valid HTTP/HTTPS URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The document-analysis service rejected or failed the request.
    #[error("OCR analysis failed: {detail}")]
    OcrFailed { detail: String },

    /// The document-analysis call exceeded its operation timeout.
    #[error("OCR analysis timed out after {secs}s\nIncrease --ocr-timeout.")]
    OcrTimeout { secs: u64 },

    // ── Block graph errors ────────────────────────────────────────────────
    /// OCR succeeded but produced no TABLE block (strict table policy).
    #[error("No table found in the OCR result ({blocks} blocks analysed)\nUse --lenient-tables to continue with zero rows.")]
    NoTableFound { blocks: usize },

    /// A relationship points at a block id that is not in the result.
    #[error("Block '{from}' references unknown block '{to}'")]
    DanglingReference { from: String, to: String },

    /// A CELL block has no row index, so its row cannot be recovered.
    #[error("CELL block '{id}' has no row index")]
    MalformedCell { id: String },

    /// Two blocks share the same id; lookups would be ambiguous.
    #[error("Duplicate block id '{id}' in OCR result")]
    DuplicateBlockId { id: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error. The call is not retried.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// The LLM call exceeded the configured timeout.
    #[error("API call timed out after {elapsed_ms}ms")]
    ApiTimeout { elapsed_ms: u64 },

    /// Model output is not JSON, even after the single brace-span repair.
    #[error("Model output is not valid JSON after repair: {detail}\nRaw output starts with: {preview:?}")]
    MalformedModelOutput { detail: String, preview: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A schema violation found while validating model output.
///
/// `path` is a JSON-pointer-like location (`$.items[2].confidence`), `reason`
/// a human-readable description. Several violations may be found in one
/// document; [`ValidationError::violations`] keeps them all, in document order.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
#[error("schema validation failed{}", render_violations(.violations))]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

/// One failed schema check.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Violation {
    pub path: String,
    pub reason: String,
}

impl ValidationError {
    pub fn single(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            violations: vec![Violation {
                path: path.into(),
                reason: reason.into(),
            }],
        }
    }
}

fn render_violations(violations: &[Violation]) -> String {
    if violations.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = violations
        .iter()
        .map(|v| format!("{} {}", v.path, v.reason))
        .collect();
    format!(": {}", parts.join("; "))
}
