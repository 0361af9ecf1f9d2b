//! Plan cache: the seam and an in-process implementation.
//!
//! The pipeline treats the cache as best-effort. A read error is a miss and
//! a write error is logged; neither reaches the caller.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::plan::types::{GeneratedStudyPlan, NormalizedStudyPlan};

pub use memory::MemoryPlanCache;

/// What is stored under a cache key. `generated_at` is deliberately absent;
/// it is stamped when the entry is served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPlan {
    pub plan: NormalizedStudyPlan,
    pub tokens_used: i64,
    pub saved_plan_id: Option<Uuid>,
}

impl CachedPlan {
    pub fn from_generated(generated: &GeneratedStudyPlan) -> Self {
        Self {
            plan: generated.plan.clone(),
            tokens_used: generated.tokens_used,
            saved_plan_id: generated.saved_plan_id,
        }
    }

    pub fn into_generated(self, generated_at: DateTime<Utc>) -> GeneratedStudyPlan {
        GeneratedStudyPlan {
            plan: self.plan,
            generated_at,
            tokens_used: self.tokens_used,
            saved_plan_id: self.saved_plan_id,
        }
    }
}

/// The cache backend was unreachable or rejected the operation.
#[derive(Debug, thiserror::Error)]
#[error("plan cache unavailable: {0}")]
pub struct CacheError(pub String);

/// Keyed storage for generated plans with a per-entry time to live.
#[async_trait]
pub trait PlanCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CachedPlan>, CacheError>;

    async fn put(&self, key: &str, plan: CachedPlan, ttl: Duration) -> Result<(), CacheError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanCache) {}
};
