//! Article summarization prompt and structured-output schema.

use serde::Deserialize;
use serde_json::{json, Value};

/// Instruction placed before the article text
pub const SUMMARY_INSTRUCTION: &str =
    "Summarize the following research article in 2-3 paragraphs, focusing on key findings and methodology.";

/// Description attached to the `summary` field of the response schema
const SUMMARY_FIELD_DESCRIPTION: &str =
    "Summary of provided article in 2-3 paragraphs, focusing on key findings and methodology";

/// Build the summarization prompt for already-truncated article text
pub fn build_summary_prompt(content: &str) -> String {
    format!("{}\n\n{}", SUMMARY_INSTRUCTION, content)
}

/// Response schema: an object with a single required string field `summary`
pub fn summary_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": SUMMARY_FIELD_DESCRIPTION
            }
        },
        "required": ["summary"]
    })
}

/// Payload the model must return
#[derive(Debug, Deserialize)]
pub struct SummaryPayload {
    pub summary: String,
}
