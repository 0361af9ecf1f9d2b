//! JSON Schemas for study plans.
//!
//! [`draft_schema`] is sent to the model as a response constraint and
//! describes only the plan fields. [`response_schema`] is the strict output
//! contract enforced by the validator: every field required, no extra
//! properties, and the served metadata (`generated_at`, `tokens_used`,
//! `saved_plan_id`) included.

use serde_json::{Map, Value, json};

use mentor_db::models::TaskPriority;

/// Response constraint passed to the AI backend for generation and repair.
pub fn draft_schema() -> Value {
    plan_object(false)
}

/// Strict schema for a validated, served plan.
pub fn response_schema() -> Value {
    let mut schema = plan_object(true);
    if let Some(props) = schema["properties"].as_object_mut() {
        props.insert(
            "generated_at".to_owned(),
            json!({"type": "string", "format": "date-time"}),
        );
        props.insert(
            "tokens_used".to_owned(),
            json!({"type": "integer", "minimum": 0}),
        );
        props.insert(
            "saved_plan_id".to_owned(),
            json!({"type": ["string", "null"], "format": "uuid"}),
        );
    }
    if let Some(required) = schema["required"].as_array_mut() {
        required.extend(
            ["generated_at", "tokens_used", "saved_plan_id"]
                .into_iter()
                .map(Value::from),
        );
    }
    schema
}

fn plan_object(strict: bool) -> Value {
    let string_list = json!({"type": "array", "items": {"type": "string"}});

    let task = object(
        json!({
            "title": {"type": "string"},
            "description": {"type": "string"},
            "estimated_hours": {"type": "integer", "minimum": 0},
            "priority": {"type": "string", "enum": TaskPriority::NAMES},
            "resources": string_list,
        }),
        strict,
    );

    let week = object(
        json!({
            "week": {"type": "integer"},
            "focus": {"type": "string"},
            "tasks": {"type": "array", "items": task},
        }),
        strict,
    );

    let milestone = object(
        json!({
            "week": {"type": "integer"},
            "milestone": {"type": "string"},
            "assessment": {"type": "string"},
        }),
        strict,
    );

    object(
        json!({
            "plan_title": {"type": "string"},
            "overview": {"type": "string"},
            "learning_objectives": string_list,
            "weekly_schedule": {"type": "array", "items": week},
            "milestones": {"type": "array", "items": milestone},
            "resources": string_list,
            "tips": string_list,
        }),
        strict,
    )
}

/// Build an object schema requiring every listed property.
fn object(properties: Value, strict: bool) -> Value {
    let required: Vec<Value> = properties
        .as_object()
        .map(|p| p.keys().cloned().map(Value::from).collect())
        .unwrap_or_default();

    let mut schema = Map::new();
    schema.insert("type".to_owned(), json!("object"));
    schema.insert("properties".to_owned(), properties);
    schema.insert("required".to_owned(), Value::Array(required));
    if strict {
        schema.insert("additionalProperties".to_owned(), Value::Bool(false));
    }
    Value::Object(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_schema_is_not_strict() {
        let schema = draft_schema();
        assert!(schema.get("additionalProperties").is_none());
        assert!(schema["properties"].get("generated_at").is_none());
    }

    #[test]
    fn response_schema_requires_metadata() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        for field in ["plan_title", "weekly_schedule", "generated_at", "saved_plan_id"] {
            assert!(required.contains(&field), "{field} must be required");
        }
        assert_eq!(schema["additionalProperties"], json!(false));
    }

    #[test]
    fn priority_enum_matches_task_priority() {
        let schema = response_schema();
        let priority =
            &schema["properties"]["weekly_schedule"]["items"]["properties"]["tasks"]["items"]
                ["properties"]["priority"];
        assert_eq!(priority["enum"], json!(["low", "medium", "high"]));
    }

    #[test]
    fn schemas_compile() {
        assert!(jsonschema::validator_for(&draft_schema()).is_ok());
        assert!(jsonschema::validator_for(&response_schema()).is_ok());
    }
}
