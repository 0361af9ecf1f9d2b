//! AI backend abstraction and the Gemini implementation.

pub mod backend;
pub mod errors;
pub mod gemini;

pub use backend::{Generation, GenerationRequest, PlanBackend};
pub use errors::BackendError;
pub use gemini::{GeminiBackend, GeminiConfig};
