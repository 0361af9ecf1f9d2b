//! Test doubles for the pipeline seams: a scripted AI backend, caches and
//! plan stores that fail on demand.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use mentor_core::cache::{CacheError, CachedPlan, PlanCache};
use mentor_core::llm::{BackendError, Generation, GenerationRequest, PlanBackend};
use mentor_core::plan::{GenerateStudyPlanRequest, PlanStore};
use mentor_core::plan::types::NormalizedStudyPlan;

// ---------------------------------------------------------------------------
// ScriptedBackend
// ---------------------------------------------------------------------------

/// A [`PlanBackend`] that replays queued replies in order.
///
/// Once a queue runs dry further calls fail with [`BackendError::Api`].
#[derive(Default)]
pub struct ScriptedBackend {
    generations: Mutex<VecDeque<Result<String, BackendError>>>,
    repairs: Mutex<VecDeque<Result<String, BackendError>>>,
    tokens_per_call: i64,
    generate_calls: AtomicUsize,
    repair_calls: AtomicUsize,
    requests: Mutex<Vec<GenerationRequest>>,
    repair_inputs: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            tokens_per_call: 100,
            ..Self::default()
        }
    }

    pub fn with_generation(self, text: impl Into<String>) -> Self {
        push(&self.generations, Ok(text.into()));
        self
    }

    pub fn with_generation_error(self, error: BackendError) -> Self {
        push(&self.generations, Err(error));
        self
    }

    pub fn with_repair(self, text: impl Into<String>) -> Self {
        push(&self.repairs, Ok(text.into()));
        self
    }

    pub fn with_repair_error(self, error: BackendError) -> Self {
        push(&self.repairs, Err(error));
        self
    }

    pub fn with_tokens_per_call(mut self, tokens: i64) -> Self {
        self.tokens_per_call = tokens;
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn repair_calls(&self) -> usize {
        self.repair_calls.load(Ordering::SeqCst)
    }

    /// Every generation request received, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        lock(&self.requests).clone()
    }

    /// The malformed text passed to each repair call, in order.
    pub fn repair_inputs(&self) -> Vec<String> {
        lock(&self.repair_inputs).clone()
    }
}

#[async_trait]
impl PlanBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, BackendError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(request.clone());
        let text = pop(&self.generations, "generation")?;
        Ok(Generation {
            text,
            tokens_used: self.tokens_per_call,
        })
    }

    async fn repair(&self, malformed: &str, _schema: &Value) -> Result<String, BackendError> {
        self.repair_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.repair_inputs).push(malformed.to_owned());
        pop(&self.repairs, "repair")
    }
}

fn push(queue: &Mutex<VecDeque<Result<String, BackendError>>>, item: Result<String, BackendError>) {
    lock(queue).push_back(item);
}

fn pop(
    queue: &Mutex<VecDeque<Result<String, BackendError>>>,
    what: &str,
) -> Result<String, BackendError> {
    lock(queue).pop_front().unwrap_or_else(|| {
        Err(BackendError::Api {
            message: format!("no scripted {what} left"),
        })
    })
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// ---------------------------------------------------------------------------
// Caches
// ---------------------------------------------------------------------------

/// A [`PlanCache`] whose every operation fails, as during a cache outage.
#[derive(Default)]
pub struct FailingCache {
    puts: AtomicUsize,
}

impl FailingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of write attempts seen.
    pub fn put_attempts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlanCache for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<CachedPlan>, CacheError> {
        Err(CacheError("connection refused".into()))
    }

    async fn put(&self, _key: &str, _plan: CachedPlan, _ttl: Duration) -> Result<(), CacheError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Err(CacheError("connection refused".into()))
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// A [`PlanStore`] that keeps plans in memory.
#[derive(Default)]
pub struct MemoryPlanStore {
    plans: Mutex<Vec<StoredPlan>>,
}

/// One plan saved by [`MemoryPlanStore`].
#[derive(Debug, Clone)]
pub struct StoredPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub subject: String,
    pub plan: NormalizedStudyPlan,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plans(&self) -> Vec<StoredPlan> {
        lock(&self.plans).clone()
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn persist_plan(
        &self,
        user_id: Uuid,
        request: &GenerateStudyPlanRequest,
        plan: &NormalizedStudyPlan,
    ) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        lock(&self.plans).push(StoredPlan {
            id,
            user_id,
            subject: request.subject.clone(),
            plan: plan.clone(),
        });
        Ok(id)
    }
}

/// A [`PlanStore`] that always fails.
#[derive(Default)]
pub struct FailingPlanStore;

#[async_trait]
impl PlanStore for FailingPlanStore {
    async fn persist_plan(
        &self,
        _user_id: Uuid,
        _request: &GenerateStudyPlanRequest,
        _plan: &NormalizedStudyPlan,
    ) -> anyhow::Result<Uuid> {
        anyhow::bail!("database unavailable")
    }
}
