//! The study-plan generation pipeline.
//!
//! ```text
//! request ─ validate ─ cache? ──hit──────────────────────────────▶ plan
//!                        │ miss
//!                        ▼
//!            generate ─ extract/parse (≤1 repair) ─ normalize ─ validate
//!                        │
//!                        ▼
//!            persist (best-effort) ─ cache put (best-effort) ──▶ plan
//! ```
//!
//! There is one success exit and three error exits: an invalid request, an
//! upstream AI failure (on the generation or the repair call), and a parse or
//! validation failure.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::cache::{CachedPlan, PlanCache};
use crate::llm::{BackendError, Generation, GenerationRequest, PlanBackend};
use crate::plan::types::GeneratedStudyPlan;
use crate::plan::{
    DraftError, GenerateStudyPlanRequest, PlanStore, PlanValidationError, RequestError, SchemaError,
    fingerprint, normalize, parser, prompt, schema, validate,
};

/// Tunables for generation and caching.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// How long a generated plan stays cached.
    pub cache_ttl: Duration,
    /// Send the plan schema as a response constraint on the first call, not
    /// just on repair.
    pub constrain_output: bool,
}

impl PipelineConfig {
    pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: Self::DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: Self::DEFAULT_TEMPERATURE,
            cache_ttl: Self::DEFAULT_CACHE_TTL,
            constrain_output: true,
        }
    }
}

/// Terminal pipeline failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    InvalidRequest(#[from] RequestError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Validation(#[from] PlanValidationError),
}

impl From<DraftError> for PipelineError {
    fn from(err: DraftError) -> Self {
        match err {
            DraftError::Schema(e) => Self::Schema(e),
            DraftError::Backend(e) => Self::Backend(e),
        }
    }
}

/// A served plan and whether it came from the cache.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: GeneratedStudyPlan,
    pub from_cache: bool,
}

/// Generates, validates, persists and caches study plans.
///
/// Cheap to clone; every dependency is behind an `Arc`.
#[derive(Clone)]
pub struct StudyPlanPipeline {
    backend: Arc<dyn PlanBackend>,
    cache: Arc<dyn PlanCache>,
    store: Option<Arc<dyn PlanStore>>,
    config: PipelineConfig,
}

impl StudyPlanPipeline {
    pub fn new(
        backend: Arc<dyn PlanBackend>,
        cache: Arc<dyn PlanCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            backend,
            cache,
            store: None,
            config,
        }
    }

    /// Persist every freshly generated plan through `store`.
    pub fn with_store(mut self, store: Arc<dyn PlanStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Produce a study plan for `user_id`, serving from cache when an
    /// equivalent request was answered within the TTL.
    pub async fn generate(
        &self,
        user_id: Uuid,
        request: &GenerateStudyPlanRequest,
    ) -> Result<PlanOutcome, PipelineError> {
        request.validate()?;

        let key = fingerprint::cache_key(user_id, request);

        match self.cache.get(&key).await {
            Ok(Some(cached)) => {
                tracing::info!(%user_id, cache_key = %key, "serving study plan from cache");
                return Ok(PlanOutcome {
                    plan: cached.into_generated(Utc::now()),
                    from_cache: true,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%user_id, cache_key = %key, error = %e, "cache read failed; treating as miss");
            }
        }

        let draft_schema = schema::draft_schema();
        let generation = self
            .backend
            .generate(&GenerationRequest {
                system_prompt: prompt::build_system_prompt(),
                prompt: prompt::build_user_prompt(request),
                response_schema: self.config.constrain_output.then(|| draft_schema.clone()),
                max_output_tokens: self.config.max_output_tokens,
                temperature: self.config.temperature,
            })
            .await?;

        let draft =
            parser::parse_with_repair(&generation.text, self.backend.as_ref(), &draft_schema)
                .await?;
        let normalized = normalize::normalize_plan(&draft);
        let mut plan =
            validate::validate_plan(normalized, Utc::now(), generation.tokens_used, None)?;

        if let Some(store) = &self.store {
            match store.persist_plan(user_id, request, &plan.plan).await {
                Ok(plan_id) => {
                    tracing::info!(%user_id, %plan_id, "study plan persisted");
                    plan.saved_plan_id = Some(plan_id);
                }
                Err(e) => {
                    tracing::warn!(%user_id, error = %format!("{e:#}"), "failed to persist study plan");
                }
            }
        }

        if let Err(e) = self
            .cache
            .put(&key, CachedPlan::from_generated(&plan), self.config.cache_ttl)
            .await
        {
            tracing::warn!(%user_id, cache_key = %key, error = %e, "failed to cache study plan");
        }

        tracing::info!(
            %user_id,
            tokens_used = plan.tokens_used,
            weeks = plan.plan.weekly_schedule.len(),
            "study plan generated"
        );

        Ok(PlanOutcome {
            plan,
            from_cache: false,
        })
    }

    /// One tiny generation call to check that the backend is reachable and
    /// the credentials work.
    pub async fn ping(&self) -> Result<Generation, BackendError> {
        self.backend
            .generate(&GenerationRequest {
                system_prompt: "You are a connectivity check.".to_owned(),
                prompt: "Reply with the single word: pong".to_owned(),
                response_schema: None,
                max_output_tokens: 64,
                temperature: 0.0,
            })
            .await
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}
