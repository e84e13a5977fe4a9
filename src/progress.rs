//! Progress-callback trait for extraction stage events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its two network-bound stages (OCR,
//! then the LLM mapping call).
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2json::{ExtractionProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct RowCounter {
//!     rows: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for RowCounter {
//!     fn on_ocr_complete(&self, rows: usize) {
//!         self.rows.store(rows, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(RowCounter { rows: AtomicUsize::new(0) });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline as it moves between stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events fire strictly in order; the pipeline is
/// sequential.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once the input has been read, before the OCR request.
    ///
    /// # Arguments
    /// * `input_bytes` — size of the document sent to OCR
    fn on_extraction_start(&self, input_bytes: usize) {
        let _ = input_bytes;
    }

    /// Called just before the OCR request is sent.
    fn on_ocr_start(&self) {}

    /// Called after the block graph has been reduced to rows.
    fn on_ocr_complete(&self, rows: usize) {
        let _ = rows;
    }

    /// Called just before the LLM request is sent.
    fn on_mapping_start(&self, rows: usize) {
        let _ = rows;
    }

    /// Called after the model output has been parsed and validated.
    ///
    /// # Arguments
    /// * `items`    — number of items in the resulting document
    /// * `degraded` — true when validation failed and the fallback was used
    fn on_mapping_complete(&self, items: usize, degraded: bool) {
        let _ = (items, degraded);
    }

    /// Called when a stage fails fatally. No further events follow.
    fn on_error(&self, error: &str) {
        let _ = error;
    }

    /// Called once after a successful run.
    fn on_extraction_complete(&self, total_duration_ms: u64) {
        let _ = total_duration_ms;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
