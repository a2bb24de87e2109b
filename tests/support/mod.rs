//! Shared in-memory fakes for the engine's collaborator traits, used across
//! the integration tests in this directory.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use fedretrieve::{
    Centroid, CentroidMetadata, CentroidStore, Embedder, Embedding, InternalHit, InternalSource,
    LexicalIndex, Result, RetrievalError, VectorIndex,
};
use serde_json::Value as JsonValue;

/// Deterministic two-dimensional toy embedder: maps a handful of known
/// strings to fixed vectors, anything else to a neutral vector. Optionally
/// sleeps before returning, to drive deadline tests, and can be told to
/// fail for a specific input.
pub struct FakeEmbedder {
    pub latency: Duration,
    pub fail_on: Option<String>,
}

impl FakeEmbedder {
    pub fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            fail_on: None,
        }
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            fail_on: None,
        }
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_on.as_deref() == Some(text) {
            return Err(RetrievalError::unavailable("embedding service down"));
        }
        let vec = match text {
            "contract breach" => vec![1.0, 0.0],
            _ => vec![0.5, 0.5],
        };
        Embedding::new(vec)
    }
}

/// A fixed list of hits returned regardless of the query vector, or a
/// forced failure.
pub struct FakeVectorIndex {
    pub hits: Vec<InternalHit>,
    pub fail: bool,
}

impl FakeVectorIndex {
    pub fn with_hits(hits: Vec<InternalHit>) -> Self {
        Self { hits, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            hits: Vec::new(),
            fail: true,
        }
    }

    pub fn empty() -> Self {
        Self::with_hits(Vec::new())
    }
}

#[async_trait]
impl VectorIndex for FakeVectorIndex {
    async fn search(
        &self,
        _tenant: &str,
        _query: &Embedding,
        limit: usize,
        _filters: &HashMap<String, JsonValue>,
    ) -> Result<Vec<InternalHit>> {
        if self.fail {
            return Err(RetrievalError::unavailable("vector backend unreachable"));
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }

    async fn scan(
        &self,
        _tenant: &str,
        _tag: &str,
        _cursor: Option<String>,
        _batch: usize,
    ) -> Result<(Vec<Embedding>, Option<String>)> {
        Ok((Vec::new(), None))
    }
}

pub struct FakeLexicalIndex {
    pub hits: Vec<InternalHit>,
    pub fail: bool,
}

impl FakeLexicalIndex {
    pub fn with_hits(hits: Vec<InternalHit>) -> Self {
        Self { hits, fail: false }
    }

    pub fn empty() -> Self {
        Self::with_hits(Vec::new())
    }
}

#[async_trait]
impl LexicalIndex for FakeLexicalIndex {
    async fn search(&self, _tenant: &str, _text: &str, limit: usize) -> Result<Vec<InternalHit>> {
        if self.fail {
            return Err(RetrievalError::unavailable("lexical backend unreachable"));
        }
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

/// A centroid store that always reports no centroid on file, counting how
/// many times it was asked.
#[derive(Default)]
pub struct EmptyCentroidStore {
    pub reads: AtomicUsize,
}

#[async_trait]
impl CentroidStore for EmptyCentroidStore {
    async fn get(&self, _tenant: &str, _tag: &str) -> Result<Option<Centroid>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
    async fn put(&self, _centroid: Centroid, _ttl: Duration) -> Result<()> {
        Ok(())
    }
    async fn scan_tags(&self, _tenant: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// A centroid store holding one fixed centroid for every `(tenant, tag)`,
/// counting how many times `get` was actually called (i.e. cache misses).
pub struct FixedCentroidStore {
    pub vector: Embedding,
    pub reads: AtomicUsize,
}

impl FixedCentroidStore {
    pub fn new(vector: Embedding) -> Self {
        Self {
            vector,
            reads: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CentroidStore for FixedCentroidStore {
    async fn get(&self, tenant: &str, tag: &str) -> Result<Option<Centroid>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Centroid {
            vector: self.vector.clone(),
            metadata: CentroidMetadata {
                tenant: tenant.to_string(),
                tag: tag.to_string(),
                updated_at: Utc::now(),
                source_count: 50,
                dimension: self.vector.dimension(),
            },
        }))
    }
    async fn put(&self, _centroid: Centroid, _ttl: Duration) -> Result<()> {
        Ok(())
    }
    async fn scan_tags(&self, _tenant: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

pub fn internal_hit(doc_id: &str, source: InternalSource, rank: u32) -> InternalHit {
    InternalHit {
        doc_id: doc_id.to_string(),
        score: 1.0 / rank as f32,
        source,
        rank_in_source: rank,
        payload: HashMap::new(),
    }
}
