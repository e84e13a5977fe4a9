//! Schema mapping: rows → one LLM call → parsed, validated `VendorDoc`.
//!
//! Failure policy at this boundary:
//!
//! | What went wrong                  | Result                                 |
//! |----------------------------------|----------------------------------------|
//! | LLM call failed / timed out      | `Err` (fatal)                          |
//! | Output not JSON even after repair| `Err(MalformedModelOutput)` (fatal)    |
//! | JSON does not match the schema   | `Ok(MapOutcome::Degraded { .. })`      |
//!
//! Schema failures degrade instead of aborting so a run always persists
//! something inspectable once the model has answered.

use crate::blocks::Row;
use crate::config::ExtractionConfig;
use crate::error::Pdf2JsonError;
use crate::output::MapOutcome;
use crate::pipeline::llm::{Generation, TextGenerator};
use crate::pipeline::parse::parse_model_output;
use crate::prompts::{rows_message, DEFAULT_SYSTEM_PROMPT};
use crate::schema::{validate_document, VendorDoc};
use tracing::{debug, warn};

/// Everything the mapping stage produced.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub outcome: MapOutcome,
    pub generation: Generation,
    /// True when the brace-span repair stage was needed.
    pub repaired: bool,
}

/// Map reduced rows to a `VendorDoc` through a single generation call.
pub async fn map_rows(
    generator: &dyn TextGenerator,
    rows: &[Row],
    config: &ExtractionConfig,
) -> Result<Mapping, Pdf2JsonError> {
    let system = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);
    let user = rows_message(rows);
    debug!("Mapping {} rows ({} prompt chars)", rows.len(), user.len());

    let generation = generator.generate(system, &user).await?;
    let parsed = parse_model_output(&generation.content)?;
    if parsed.repaired() {
        debug!("Model output needed brace-span repair");
    }

    let outcome = match validate_document(&parsed.value) {
        Ok(doc) => MapOutcome::Valid(doc),
        Err(diagnostic) => {
            warn!("Model output failed schema validation: {}", diagnostic);
            let vendor = parsed
                .value
                .get("vendor")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            MapOutcome::Degraded {
                document: VendorDoc::degraded(vendor),
                diagnostic,
            }
        }
    };

    Ok(Mapping {
        outcome,
        generation,
        repaired: parsed.repaired(),
    })
}
