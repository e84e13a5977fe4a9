//! Two-stage parsing of raw model text into JSON.
//!
//! Stage 1 parses the text strictly. Stage 2 runs only if stage 1 fails: it
//! takes the span from the first `{` to the last `}` (inclusive) and parses
//! that. There is no stage 3. Models that wrap their JSON in prose or code
//! fences are handled by stage 2; anything else is reported as
//! [`Pdf2JsonError::MalformedModelOutput`].

use crate::error::Pdf2JsonError;
use serde_json::Value;
use tracing::debug;

const PREVIEW_CHARS: usize = 80;

/// Which stage produced the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    Strict,
    BraceSpan,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOutput {
    pub value: Value,
    pub stage: ParseStage,
}

impl ParsedOutput {
    pub fn repaired(&self) -> bool {
        self.stage == ParseStage::BraceSpan
    }
}

/// Stage 1: the whole text must be one JSON value.
pub fn parse_strict(raw: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(raw)
}

/// The substring from the first `{` to the last `}`, inclusive.
///
/// `None` when either brace is missing or the last `}` precedes the first `{`.
pub fn extract_brace_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// Run both stages.
pub fn parse_model_output(raw: &str) -> Result<ParsedOutput, Pdf2JsonError> {
    let strict_err = match parse_strict(raw) {
        Ok(value) => {
            return Ok(ParsedOutput {
                value,
                stage: ParseStage::Strict,
            })
        }
        Err(e) => e,
    };
    debug!("Strict JSON parse failed ({strict_err}); trying brace span");

    let Some(span) = extract_brace_span(raw) else {
        return Err(malformed(raw, format!("{strict_err}; no '{{…}}' span to repair")));
    };

    parse_strict(span)
        .map(|value| ParsedOutput {
            value,
            stage: ParseStage::BraceSpan,
        })
        .map_err(|e| malformed(raw, e.to_string()))
}

fn malformed(raw: &str, detail: String) -> Pdf2JsonError {
    Pdf2JsonError::MalformedModelOutput {
        detail,
        preview: raw.chars().take(PREVIEW_CHARS).collect(),
    }
}
