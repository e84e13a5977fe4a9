//! Result types returned by the extraction pipeline.

use crate::blocks::Row;
use crate::error::ValidationError;
use crate::schema::VendorDoc;
use serde::{Deserialize, Serialize};

/// Outcome of the schema mapping stage.
///
/// Schema violations are not errors at this boundary: they produce
/// `Degraded`, carrying the fallback document and the diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum MapOutcome {
    /// Model output satisfied the schema.
    Valid(VendorDoc),
    /// Model output failed validation; `document` is the flagged fallback.
    Degraded {
        document: VendorDoc,
        diagnostic: ValidationError,
    },
}

impl MapOutcome {
    pub fn document(&self) -> &VendorDoc {
        match self {
            MapOutcome::Valid(doc) => doc,
            MapOutcome::Degraded { document, .. } => document,
        }
    }

    pub fn into_document(self) -> VendorDoc {
        match self {
            MapOutcome::Valid(doc) => doc,
            MapOutcome::Degraded { document, .. } => document,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, MapOutcome::Degraded { .. })
    }

    pub fn diagnostic(&self) -> Option<&ValidationError> {
        match self {
            MapOutcome::Valid(_) => None,
            MapOutcome::Degraded { diagnostic, .. } => Some(diagnostic),
        }
    }
}

/// Complete result of one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// The validated document, or the flagged fallback.
    pub document: VendorDoc,
    /// Rows recovered from the OCR block graph, as sent to the model.
    pub rows: Vec<Row>,
    /// Present when validation failed and `document` is the fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error: Option<ValidationError>,
    pub stats: ExtractionStats,
}

impl ExtractionOutput {
    pub fn is_degraded(&self) -> bool {
        self.validation_error.is_some()
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub input_bytes: usize,
    pub ocr_blocks: usize,
    pub rows: usize,
    pub items: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// True when the model output needed the brace-span repair to parse.
    pub repaired: bool,
    pub ocr_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}
