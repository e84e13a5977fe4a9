//! CLI binary for edgequake-pdf2json.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and reports results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2json::pipeline::input::DEFAULT_INPUT;
use edgequake_pdf2json::{
    extract, extract_from_bytes, extract_rows, parse_blocks_json, reduce_blocks, write_document,
    AwsCredentials, ExtractionConfig, ExtractionOutput, ExtractionProgressCallback,
    ProgressCallback, StaticBlocks,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a single spinner whose message follows the
/// pipeline stage, plus one log line per completed stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading input…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, input_bytes: usize) {
        self.bar.println(format!(
            "  {} Read {}",
            green("✓"),
            dim(&format!("{input_bytes} bytes"))
        ));
    }

    fn on_ocr_start(&self) {
        self.bar.set_prefix("OCR");
        self.bar.set_message("Analysing tables…");
    }

    fn on_ocr_complete(&self, rows: usize) {
        self.bar
            .println(format!("  {} Tables → {} rows", green("✓"), bold(&rows.to_string())));
    }

    fn on_mapping_start(&self, rows: usize) {
        self.bar.set_prefix("LLM");
        self.bar.set_message(format!("Normalising {rows} rows…"));
    }

    fn on_mapping_complete(&self, items: usize, degraded: bool) {
        if degraded {
            self.bar.println(format!(
                "  {} Model output failed validation; using fallback document",
                yellow("⚠")
            ));
        } else {
            self.bar
                .println(format!("  {} {} items", green("✓"), bold(&items.to_string())));
        }
    }

    fn on_error(&self, error: &str) {
        self.bar.finish_and_clear();
        let first_line = error.lines().next().unwrap_or(error);
        eprintln!("  {} {}", red("✗"), red(first_line));
    }

    fn on_extraction_complete(&self, _total_duration_ms: u64) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Default: sample_menu.pdf → output.json
  pdf2json

  # Explicit input and output
  pdf2json price_list.pdf -o prices.json

  # Print the document to stdout instead of writing a file
  pdf2json menu.pdf --stdout

  # Only run OCR and print the recovered rows (no API key needed)
  pdf2json menu.pdf --rows-only

  # Replay a captured Textract response instead of calling the service
  aws textract analyze-document --document Bytes=fileb://menu.pdf \
      --feature-types TABLES > blocks.json
  pdf2json --blocks blocks.json

  # Continue with zero rows when no table is detected
  pdf2json scan.pdf --lenient-tables

ENVIRONMENT VARIABLES:
  AWS_REGION / REGION     Textract region
  AWS_ACCESS_KEY_ID       Static AWS credentials (else the AWS default chain)
  AWS_SECRET_ACCESS_KEY
  AWS_SESSION_TOKEN
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID

  A `.env` file in the current directory (or a parent) is loaded first;
  variables already set in the environment take precedence.
"#;

/// Extract PDF tables with AWS Textract and normalise them into JSON with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2json",
    version,
    about = "Extract PDF tables into validated JSON using AWS Textract and an LLM",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(default_value = DEFAULT_INPUT)]
    input: String,

    /// Write the JSON document to this file.
    #[arg(short, long, env = "PDF2JSON_OUTPUT", default_value = "output.json")]
    output: PathBuf,

    /// Print the JSON document to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,

    /// Stop after OCR and print the recovered rows as JSON.
    #[arg(long)]
    rows_only: bool,

    /// Read Textract blocks from this JSON file instead of calling Textract.
    #[arg(long, env = "PDF2JSON_BLOCKS")]
    blocks: Option<PathBuf>,

    /// Continue with zero rows when OCR finds no table.
    #[arg(long, env = "PDF2JSON_LENIENT_TABLES")]
    lenient_tables: bool,

    /// LLM model ID (e.g. gpt-4.1-nano, gpt-4.1, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF2JSON_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "PDF2JSON_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// AWS region for Textract.
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// AWS access key id; used together with --aws-secret-access-key.
    #[arg(long, env = "AWS_ACCESS_KEY_ID", hide_env_values = true)]
    aws_access_key_id: Option<String>,

    /// AWS secret access key.
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    aws_secret_access_key: Option<String>,

    /// AWS session token for temporary credentials.
    #[arg(long, env = "AWS_SESSION_TOKEN", hide_env_values = true)]
    aws_session_token: Option<String>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "PDF2JSON_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Accept inputs that do not start with %PDF (PNG, JPEG, TIFF).
    #[arg(long)]
    no_pdf_check: bool,

    /// Textract call timeout in seconds.
    #[arg(long, env = "PDF2JSON_OCR_TIMEOUT", default_value_t = 120)]
    ocr_timeout: u64,

    /// LLM call timeout in seconds.
    #[arg(long, env = "PDF2JSON_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2JSON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2JSON_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so clap's env fallbacks and REGION see `.env` values.
    load_env_file(None);
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; verbose mode always wins.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.stdout && !cli.rows_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Rows-only mode ───────────────────────────────────────────────────
    if cli.rows_only {
        let rows = match config.analyzer {
            Some(ref analyzer) => {
                let nodes = analyzer.analyze(&[]).await.context("Failed to load blocks")?;
                reduce_blocks(&nodes, config.strict_tables).context("Block reduction failed")?
            }
            None => extract_rows(&cli.input, &config)
                .await
                .context("Table extraction failed")?,
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&rows).context("Failed to serialise rows")?
        );
        return Ok(());
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let output = if cli.blocks.is_some() {
        extract_from_bytes(&[], &config).await
    } else {
        extract(&cli.input, &config).await
    }
    .context("Extraction failed")?;

    if cli.stdout {
        let json = serde_json::to_string_pretty(&output.document)
            .context("Failed to serialise document")?;
        println!("{json}");
    } else {
        write_document(&output, &cli.output)
            .await
            .context("Failed to write output")?;
    }

    if !cli.quiet {
        print_summary(&cli, &output);
    }

    Ok(())
}

fn print_summary(cli: &Cli, output: &ExtractionOutput) {
    let stats = &output.stats;
    let target = if cli.stdout {
        "stdout".to_string()
    } else {
        cli.output.display().to_string()
    };

    match output.validation_error {
        None => eprintln!(
            "{}  {} items from {} rows  {}ms  →  {}",
            green("✔"),
            stats.items,
            stats.rows,
            stats.total_duration_ms,
            bold(&target),
        ),
        Some(ref err) => {
            eprintln!(
                "{}  fallback document (validation_error)  →  {}",
                yellow("⚠"),
                bold(&target)
            );
            eprintln!("   {}", dim(&err.to_string()));
        }
    }
    if stats.repaired {
        eprintln!("   {}", dim("model output needed JSON repair"));
    }
    eprintln!(
        "   {} tokens in  /  {} tokens out",
        dim(&stats.input_tokens.to_string()),
        dim(&stats.output_tokens.to_string()),
    );
}

/// Load `KEY=value` pairs from a `.env` file into the process environment.
///
/// With no path, searches the current directory and its parents. Variables
/// that are already set are not overwritten. Returns the file that was loaded.
fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let region = cli
        .region
        .clone()
        .or_else(|| std::env::var("REGION").ok().filter(|r| !r.is_empty()));

    let mut builder = ExtractionConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .strict_tables(!cli.lenient_tables)
        .require_pdf_magic(!cli.no_pdf_check && cli.blocks.is_none())
        .ocr_timeout_secs(cli.ocr_timeout)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(region) = region {
        builder = builder.region(region);
    }
    if let (Some(id), Some(secret)) = (&cli.aws_access_key_id, &cli.aws_secret_access_key) {
        builder = builder.credentials(AwsCredentials {
            access_key_id: id.clone(),
            secret_access_key: secret.clone(),
            session_token: cli.aws_session_token.clone(),
        });
    }
    if let Some(ref path) = cli.blocks {
        let json = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read blocks from {:?}", path))?;
        let nodes = parse_blocks_json(&json)
            .with_context(|| format!("Invalid Textract blocks JSON in {:?}", path))?;
        builder = builder.analyzer(Arc::new(StaticBlocks::new(nodes)));
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(prompt) = system_prompt {
        builder = builder.system_prompt(prompt);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
