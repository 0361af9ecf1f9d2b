//! The `PlanBackend` trait: the seam between the pipeline and an AI model.

use async_trait::async_trait;
use serde_json::Value;

use super::errors::BackendError;

/// One generation call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Instruction placed ahead of the user content.
    pub system_prompt: String,
    pub prompt: String,
    /// JSON Schema the model's output should follow, if the backend
    /// supports constrained output.
    pub response_schema: Option<Value>,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// Raw model output and the tokens it cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub tokens_used: i64,
}

/// An AI model that can write study plans.
///
/// Implementations are shared across requests as `Arc<dyn PlanBackend>`.
#[async_trait]
pub trait PlanBackend: Send + Sync {
    /// Human-readable name for logs (e.g. `gemini-2.5-flash`).
    fn name(&self) -> &str;

    /// Run a generation call.
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, BackendError>;

    /// Ask the model to turn `malformed` into a JSON document matching
    /// `schema`. Returns the raw reply text; the caller re-extracts and
    /// re-parses it.
    async fn repair(&self, malformed: &str, schema: &Value) -> Result<String, BackendError>;
}

// Compile-time assertion: PlanBackend must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn PlanBackend) {}
};
