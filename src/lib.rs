//! # edgequake-pdf2json
//!
//! Extract tables from PDF documents and normalise them into validated JSON.
//!
//! A price list, menu or invoice arrives as a PDF. AWS Textract finds the
//! tables and returns them as a graph of TABLE → CELL → WORD blocks; this
//! crate rebuilds the rows from that graph, asks an LLM to map them onto a
//! fixed `VendorDoc` schema, and validates what comes back before writing it.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    read local file (or download URL) into memory
//!  ├─ 2. OCR      one Textract AnalyzeDocument call, TABLES feature
//!  ├─ 3. Reduce   TABLE → CELL → WORD links → rows, ascending row index
//!  ├─ 4. Map      rows → prompt → one LLM call at temperature 0
//!  ├─ 5. Parse    strict JSON, then a single brace-span repair
//!  ├─ 6. Validate VendorDoc schema; failures degrade to a flagged fallback
//!  └─ 7. Output   pretty-printed JSON, written once
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2json::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Textract region/credentials from the AWS default chain,
//!     // LLM provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let output = extract("sample_menu.pdf", &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&output.document)?);
//!     if let Some(err) = output.validation_error {
//!         eprintln!("degraded: {err}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2json` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod blocks;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod schema;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use blocks::{parse_blocks_json, BlockType, OcrNode, Relationship, RelationshipKind, Row};
pub use config::{AwsCredentials, ExtractionConfig, ExtractionConfigBuilder};
pub use convert::{
    extract, extract_from_bytes, extract_rows, extract_sync, extract_to_file, write_document,
};
pub use error::{Pdf2JsonError, ValidationError, Violation};
pub use output::{ExtractionOutput, ExtractionStats, MapOutcome};
pub use pipeline::llm::{Generation, ProviderGenerator, TextGenerator};
pub use pipeline::ocr::{DocumentAnalyzer, StaticBlocks, TextractAnalyzer};
pub use pipeline::reduce::reduce_blocks;
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use schema::{validate_document, Flag, Item, VendorDoc};
