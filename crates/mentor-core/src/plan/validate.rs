//! Strict validation of the normalized plan against the output contract.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use uuid::Uuid;

use super::schema;
use super::types::GeneratedStudyPlan;

static RESPONSE_VALIDATOR: LazyLock<jsonschema::Validator> = LazyLock::new(|| {
    jsonschema::validator_for(&schema::response_schema()).expect("response schema is valid")
});

/// One schema violation, located by JSON pointer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldViolation {
    /// JSON pointer to the offending value (`/` for the document root).
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// The normalized plan did not satisfy the strict output schema.
#[derive(Debug, Clone, thiserror::Error)]
#[error("generated plan failed validation: {}", summarize(.violations))]
pub struct PlanValidationError {
    pub violations: Vec<FieldViolation>,
}

impl PlanValidationError {
    fn at_root(message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation {
                path: "/".to_owned(),
                message: message.into(),
            }],
        }
    }
}

fn summarize(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Attach served metadata to a normalized plan and validate the result.
///
/// Every violation is collected, not just the first. On success the typed
/// plan is returned.
pub fn validate_plan(
    normalized: Value,
    generated_at: DateTime<Utc>,
    tokens_used: i64,
    saved_plan_id: Option<Uuid>,
) -> Result<GeneratedStudyPlan, PlanValidationError> {
    let Value::Object(mut doc) = normalized else {
        return Err(PlanValidationError::at_root(
            "normalized plan is not a JSON object",
        ));
    };
    doc.insert("generated_at".to_owned(), json!(generated_at));
    doc.insert("tokens_used".to_owned(), json!(tokens_used));
    doc.insert("saved_plan_id".to_owned(), json!(saved_plan_id));
    let doc = Value::Object(doc);

    let violations: Vec<FieldViolation> = RESPONSE_VALIDATOR
        .iter_errors(&doc)
        .map(|e| {
            let path = e.instance_path.to_string();
            FieldViolation {
                path: if path.is_empty() { "/".to_owned() } else { path },
                message: e.to_string(),
            }
        })
        .collect();
    if !violations.is_empty() {
        return Err(PlanValidationError { violations });
    }

    serde_json::from_value(doc).map_err(|e| PlanValidationError::at_root(e.to_string()))
}
