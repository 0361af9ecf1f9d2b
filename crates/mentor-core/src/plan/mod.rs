//! Study plans: request validation, prompts, the parse/normalize/validate
//! stages, fingerprinting, and the Postgres store.

pub mod extract;
pub mod fingerprint;
pub mod normalize;
pub mod parser;
pub mod prompt;
pub mod request;
pub mod schema;
pub mod service;
pub mod types;
pub mod validate;

pub use extract::extract_json;
pub use fingerprint::{cache_key, fingerprint};
pub use normalize::normalize_plan;
pub use parser::{DraftError, ParseFailure, SchemaError, parse_draft, parse_with_repair};
pub use request::{CurrentLevel, GenerateStudyPlanRequest, RequestError};
pub use service::{PgPlanStore, PlanStore, create_study_plan, get_plan_with_tasks};
pub use types::{GeneratedStudyPlan, Milestone, NormalizedStudyPlan, TaskEntry, WeekEntry};
pub use validate::{FieldViolation, PlanValidationError, validate_plan};
