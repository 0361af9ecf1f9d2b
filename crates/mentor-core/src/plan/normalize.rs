//! Coerce a loosely-typed draft into the canonical plan shape.
//!
//! The normalizer never fails. Each top-level field is handled on its own:
//! missing or `null` values get a placeholder, scalars are stringified where
//! a string is expected, and integers are coerced. Malformed entries inside
//! `weekly_schedule` and `milestones` (anything that is not an object) are
//! dropped rather than defaulted.
//!
//! Task `priority` is the one field passed through untouched when present;
//! an out-of-range value is left for the validator to reject.

use serde_json::{Map, Value};

use mentor_db::models::TaskPriority;

pub const DEFAULT_PLAN_TITLE: &str = "Untitled Study Plan";
pub const DEFAULT_OVERVIEW: &str = "No overview provided";
pub const DEFAULT_FOCUS: &str = "General review";
pub const DEFAULT_TASK_TITLE: &str = "Untitled task";
pub const DEFAULT_TASK_DESCRIPTION: &str = "No description provided";
pub const DEFAULT_MILESTONE: &str = "Milestone";
pub const DEFAULT_ASSESSMENT: &str = "Self-assessment";
pub const DEFAULT_WEEK: i64 = 1;
pub const DEFAULT_TASK_HOURS: i64 = 1;

/// Normalize a parsed draft into the canonical plan object.
///
/// A non-object draft is treated as an empty object.
pub fn normalize_plan(draft: &Value) -> Value {
    let empty = Map::new();
    let draft = draft.as_object().unwrap_or(&empty);

    let mut plan = Map::new();
    plan.insert(
        "plan_title".into(),
        string_field(draft, "plan_title", DEFAULT_PLAN_TITLE),
    );
    plan.insert(
        "overview".into(),
        string_field(draft, "overview", DEFAULT_OVERVIEW),
    );
    plan.insert(
        "learning_objectives".into(),
        Value::Array(wrapped_string_list(present(draft, "learning_objectives"))),
    );
    plan.insert(
        "weekly_schedule".into(),
        Value::Array(
            objects(present(draft, "weekly_schedule"))
                .map(normalize_week)
                .collect(),
        ),
    );
    plan.insert(
        "milestones".into(),
        Value::Array(
            objects(present(draft, "milestones"))
                .map(normalize_milestone)
                .collect(),
        ),
    );
    plan.insert(
        "resources".into(),
        Value::Array(string_list(present(draft, "resources"))),
    );
    plan.insert(
        "tips".into(),
        Value::Array(string_list(present(draft, "tips"))),
    );

    Value::Object(plan)
}

fn normalize_week(week: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    out.insert("week".into(), int_field(week, "week", DEFAULT_WEEK).into());
    out.insert("focus".into(), string_field(week, "focus", DEFAULT_FOCUS));
    out.insert(
        "tasks".into(),
        Value::Array(
            objects(present(week, "tasks"))
                .map(normalize_task)
                .collect(),
        ),
    );
    Value::Object(out)
}

fn normalize_task(task: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    out.insert(
        "title".into(),
        string_field(task, "title", DEFAULT_TASK_TITLE),
    );
    out.insert(
        "description".into(),
        string_field(task, "description", DEFAULT_TASK_DESCRIPTION),
    );
    let hours = int_field(task, "estimated_hours", DEFAULT_TASK_HOURS).max(0);
    out.insert("estimated_hours".into(), hours.into());
    let priority = match present(task, "priority") {
        Some(value) => value.clone(),
        None => Value::String(TaskPriority::default().to_string()),
    };
    out.insert("priority".into(), priority);
    out.insert(
        "resources".into(),
        Value::Array(string_list(present(task, "resources"))),
    );
    Value::Object(out)
}

fn normalize_milestone(milestone: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    out.insert(
        "week".into(),
        int_field(milestone, "week", DEFAULT_WEEK).into(),
    );
    out.insert(
        "milestone".into(),
        string_field(milestone, "milestone", DEFAULT_MILESTONE),
    );
    out.insert(
        "assessment".into(),
        string_field(milestone, "assessment", DEFAULT_ASSESSMENT),
    );
    Value::Object(out)
}

// ---------------------------------------------------------------------------
// Coercion helpers
// ---------------------------------------------------------------------------

/// Look up a key, treating an explicit `null` as missing.
fn present<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

/// String representation used wherever a string is required.
fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_field(map: &Map<String, Value>, key: &str, default: &str) -> Value {
    Value::String(present(map, key).map_or_else(|| default.to_owned(), text_of))
}

fn int_field(map: &Map<String, Value>, key: &str, default: i64) -> i64 {
    present(map, key).and_then(coerce_int).unwrap_or(default)
}

/// Integers as-is, floats truncated toward zero, numeric strings parsed.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

/// Sequence elements stringified; anything else becomes an empty list.
fn string_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(items)) => items.iter().map(|v| Value::String(text_of(v))).collect(),
        _ => Vec::new(),
    }
}

/// Like [`string_list`], but a present non-sequence becomes a single element.
fn wrapped_string_list(value: Option<&Value>) -> Vec<Value> {
    match value {
        Some(Value::Array(_)) => string_list(value),
        Some(other) => vec![Value::String(text_of(other))],
        None => Vec::new(),
    }
}

/// Object entries of a sequence; non-objects are dropped.
fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}
