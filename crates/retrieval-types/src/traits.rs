use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::centroid::Centroid;
use crate::embedding::Embedding;
use crate::error::Result;
use crate::hit::InternalHit;

/// Turns text into a unit-norm embedding. Implementations are expected to be
/// deterministic for the same input under a fixed model version; the engine
/// treats embedding failures as request-level and surfaces them.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Embedding>;
}

/// The internal semantic (vector) index. `search` is assumed to return
/// results already ranked descending by similarity, `rank_in_source`
/// 1-indexed; `scan` streams raw embeddings for the centroid builder and is
/// never called from the search path.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn search(
        &self,
        tenant: &str,
        query: &Embedding,
        limit: usize,
        filters: &HashMap<String, JsonValue>,
    ) -> Result<Vec<InternalHit>>;

    /// Streams embeddings for `(tenant, tag)` in pages of at most `batch`,
    /// returning the page plus a cursor for the next call (`None` once
    /// exhausted).
    async fn scan(
        &self,
        tenant: &str,
        tag: &str,
        cursor: Option<String>,
        batch: usize,
    ) -> Result<(Vec<Embedding>, Option<String>)>;
}

/// The internal lexical (keyword/BM25-style) index.
#[async_trait]
pub trait LexicalIndex: Send + Sync {
    async fn search(&self, tenant: &str, text: &str, limit: usize) -> Result<Vec<InternalHit>>;
}

/// Keyed persistent store of centroids with per-entry TTL. Reads are
/// linearizable per key against writes to the same key; cross-key
/// consistency is not required. `CentroidCache` sits in front of this.
#[async_trait]
pub trait CentroidStore: Send + Sync {
    async fn get(&self, tenant: &str, tag: &str) -> Result<Option<Centroid>>;

    /// Idempotent replace of `(tenant, tag)`'s stored centroid.
    async fn put(&self, centroid: Centroid, ttl: Duration) -> Result<()>;

    /// Lists tags with a live centroid for `tenant`, for diagnostics.
    async fn scan_tags(&self, tenant: &str) -> Result<Vec<String>>;
}
