//! In-process [`PlanCache`] on top of `moka`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;

use super::{CacheError, CachedPlan, PlanCache};

#[derive(Debug, Clone)]
struct Entry {
    plan: Arc<CachedPlan>,
    ttl: Duration,
}

/// Expires each entry after the TTL it was inserted with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Bounded, concurrent, TTL-aware plan cache living in the server process.
#[derive(Clone)]
pub struct MemoryPlanCache {
    inner: Cache<String, Entry>,
}

impl MemoryPlanCache {
    pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

    pub fn new(max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }
}

impl Default for MemoryPlanCache {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ENTRIES)
    }
}

#[async_trait]
impl PlanCache for MemoryPlanCache {
    async fn get(&self, key: &str) -> Result<Option<CachedPlan>, CacheError> {
        Ok(self
            .inner
            .get(key)
            .await
            .map(|entry| CachedPlan::clone(&entry.plan)))
    }

    async fn put(&self, key: &str, plan: CachedPlan, ttl: Duration) -> Result<(), CacheError> {
        let entry = Entry {
            plan: Arc::new(plan),
            ttl,
        };
        self.inner.insert(key.to_owned(), entry).await;
        Ok(())
    }
}
