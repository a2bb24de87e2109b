//! Process-local cache over a `CentroidStore` (component B). Mirrors the
//! teacher's rate-limiter shape: a `DashMap` keyed by a composite string,
//! entries aged out by comparing a captured timestamp against now, with a
//! per-key guard preventing a thundering herd of fills for the same key.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use retrieval_types::{Centroid, CentroidStore, Result};
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_MAX_ENTRIES: usize = 10_000;

fn cache_key(tenant: &str, tag: &str) -> String {
    format!("{tenant}:{tag}")
}

struct CacheEntry {
    centroid: Centroid,
    fetched_at: DateTime<Utc>,
}

/// In-process, TTL-bounded, LRU-capped cache fronting a `CentroidStore`.
pub struct CentroidCache {
    entries: DashMap<String, CacheEntry>,
    fill_guards: DashMap<String, Arc<AsyncMutex<()>>>,
    ttl: chrono::Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CentroidCache {
    pub fn new(ttl: StdDuration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            fill_guards: DashMap::new(),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::seconds(
                DEFAULT_TTL_SECS as i64,
            )),
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            StdDuration::from_secs(DEFAULT_TTL_SECS),
            DEFAULT_MAX_ENTRIES,
        )
    }

    /// Returns the cached centroid if fresh; otherwise performs (at most)
    /// one store read for this key, even under concurrent callers, and
    /// populates the cache with the result before returning it.
    pub async fn get_or_fetch(
        &self,
        store: &dyn CentroidStore,
        tenant: &str,
        tag: &str,
    ) -> Result<Option<Centroid>> {
        let key = cache_key(tenant, tag);

        if let Some(hit) = self.fresh_hit(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(hit));
        }

        let guard_lock = self
            .fill_guards
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _permit = guard_lock.lock().await;

        // Re-check: another caller may have filled the entry while we
        // waited for the guard.
        if let Some(hit) = self.fresh_hit(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(hit));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(tenant, tag, "centroid cache miss, reading through to store");
        let fetched = store.get(tenant, tag).await?;
        if let Some(centroid) = &fetched {
            self.insert(key, centroid.clone());
        }
        Ok(fetched)
    }

    fn fresh_hit(&self, key: &str) -> Option<Centroid> {
        let entry = self.entries.get(key)?;
        if Utc::now() - entry.fetched_at < self.ttl {
            Some(entry.centroid.clone())
        } else {
            None
        }
    }

    fn insert(&self, key: String, centroid: Centroid) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                centroid,
                fetched_at: Utc::now(),
            },
        );
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|e| e.value().fetched_at)
            .map(|e| e.key().clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }

    pub fn invalidate(&self, tenant: &str, tag: &str) {
        self.entries.remove(&cache_key(tenant, tag));
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hit_count(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn cached_tags_for(&self, tenant: &str) -> Vec<String> {
        let prefix = format!("{tenant}:");
        self.entries
            .iter()
            .filter_map(|e| e.key().strip_prefix(&prefix).map(|t| t.to_string()))
            .collect()
    }
}
