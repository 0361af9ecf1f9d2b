//! Strict JSON parsing of extracted model output, with one repair attempt.

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use super::extract::extract_json;
use crate::llm::{BackendError, PlanBackend};

/// Maximum number of characters of extracted text carried by [`SchemaError`].
pub const SNIPPET_CHARS: usize = 1000;

/// The extracted text is not a JSON object.
#[derive(Debug, Error)]
pub enum ParseFailure {
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Model output could not be turned into a JSON object, even after repair.
#[derive(Debug, Clone, Error)]
#[error("model output is not valid JSON after repair: {parse_error}; repaired output: {repair_error}")]
pub struct SchemaError {
    /// Why the original output failed to parse.
    pub parse_error: String,
    /// Why the repaired output failed to parse.
    pub repair_error: String,
    /// The first [`SNIPPET_CHARS`] characters of the extracted text.
    pub snippet: String,
}

/// Why [`parse_with_repair`] produced no draft.
#[derive(Debug, Error)]
pub enum DraftError {
    /// Both the original and the repaired output failed to parse.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The repair call itself failed; no repaired text exists.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Parse extracted text into a draft. Only JSON objects are accepted.
pub fn parse_draft(text: &str) -> Result<Value, ParseFailure> {
    let value: Value = serde_json::from_str(text)?;
    match value {
        Value::Object(_) => Ok(value),
        Value::Array(_) => Err(ParseFailure::NotAnObject("an array")),
        Value::String(_) => Err(ParseFailure::NotAnObject("a string")),
        Value::Number(_) => Err(ParseFailure::NotAnObject("a number")),
        Value::Bool(_) => Err(ParseFailure::NotAnObject("a boolean")),
        Value::Null => Err(ParseFailure::NotAnObject("null")),
    }
}

/// Extract and parse raw model output, asking `backend` to repair it once if
/// the first parse fails.
///
/// The repaired reply goes through extraction again before parsing. There is
/// no second repair and no placeholder fallback. A repaired reply that still
/// does not parse yields [`DraftError::Schema`]; a failed repair call (timeout,
/// transport, HTTP) yields [`DraftError::Backend`] unchanged.
pub async fn parse_with_repair(
    raw: &str,
    backend: &dyn PlanBackend,
    schema: &Value,
) -> Result<Value, DraftError> {
    let extracted = extract_json(raw);
    let first_error = match parse_draft(&extracted) {
        Ok(draft) => return Ok(draft),
        Err(e) => e,
    };

    warn!(
        error = %first_error,
        backend = backend.name(),
        "model output did not parse; requesting repair"
    );

    let repaired = backend.repair(&extracted, schema).await?;
    let repair_error = match parse_draft(&extract_json(&repaired)) {
        Ok(draft) => {
            info!("repaired model output parsed");
            return Ok(draft);
        }
        Err(e) => e,
    };

    Err(SchemaError {
        parse_error: first_error.to_string(),
        repair_error: repair_error.to_string(),
        snippet: extracted.chars().take(SNIPPET_CHARS).collect(),
    }
    .into())
}
