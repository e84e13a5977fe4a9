//! Prompts for LLM-based row normalisation.
//!
//! Callers can override the system prompt via
//! [`crate::config::ExtractionConfig::system_prompt`]; the constant here is
//! used only when no override is provided. The normalisation rules are
//! applied by the model, not locally: the library only parses and validates
//! what comes back.

use crate::blocks::Row;

/// Default system prompt: target schema plus normalisation rules.
///
/// Rows with a missing or unreadable price are dropped from `items` and
/// recorded as a flag, so every item that does appear carries a real price.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You convert raw table rows into strict JSON matching this schema:

Item:
  name: string
  price: number
  currency: string (default "USD")
  confidence: number between 0 and 1

VendorDoc:
  vendor: string
  items: list of Item
  flags: list of objects, each {"row_id": integer, "reason": string}

Rows are given one per line as JSON arrays of cell strings. row_id is the
1-based position of the row in that list.

Rules:
1. If a row's price is missing or unreadable, do NOT include it in items.
   Add a flag {"row_id": <row>, "reason": "missing price"} instead.
2. If a row has no currency, set currency to "USD" and add a flag
   {"row_id": <row>, "reason": "missing currency"}.
3. Set confidence to exactly one of:
   - 0.9 if the row parsed perfectly
   - 0.7 if there was a small issue
   - 0.5 if you had to guess
4. Header rows, totals and blank rows are not items; skip them silently.
5. vendor is the business name if it appears in the rows, otherwise "".

Return only the JSON object. No commentary, no code fences."#;

/// Render rows one per line, each as a JSON array literal.
///
/// The rendering is deterministic: the same rows always produce the same
/// text, in reducer order.
pub fn render_rows(rows: &[Row]) -> String {
    rows.iter()
        .map(|row| serde_json::to_string(row).unwrap_or_else(|_| "[]".to_string()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the user message carrying the table rows.
pub fn rows_message(rows: &[Row]) -> String {
    format!("Table rows:\n{}", render_rows(rows))
}
