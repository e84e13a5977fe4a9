//! Pipeline stages for PDF-to-JSON extraction.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ocr ──▶ reduce ──▶ mapper ( llm ──▶ parse ──▶ schema )
//! (bytes)  (blocks)  (rows)             (text)   (JSON)   (VendorDoc)
//! ```
//!
//! 1. [`input`]  — load the local file or URL into memory
//! 2. [`ocr`]    — one Textract `AnalyzeDocument` call → flat block graph
//! 3. [`reduce`] — walk TABLE → CELL → WORD links into text rows
//! 4. [`mapper`] — render rows into a prompt, call the model once via
//!    [`llm`], parse with [`parse`] and validate against
//!    [`crate::schema`]

pub mod input;
pub mod llm;
pub mod mapper;
pub mod ocr;
pub mod parse;
pub mod reduce;
