use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use retrieval_cache::CentroidCache;
use retrieval_fuse::Fuser;
use retrieval_personalize::{AlphaConfig, Personalizer, TagInferencer};
use retrieval_score::EphemeralScorer;
use retrieval_types::{
    CentroidStore, Embedder, LexicalIndex, QueryRequest, Result, RetrievalError, ScoredHit,
    SearchTrace, StatsReport, VectorIndex,
};
use tokio::sync::Semaphore;
use tracing::{info_span, warn, Instrument};

use crate::config::EngineConfig;

/// Upper bound on a single fan-out source's result count, independent of
/// `k_total` so a large request doesn't force every source to return an
/// unbounded list.
const MAX_SOURCE_SEARCH_LIMIT: usize = 50;

/// Drives components A-F concurrently under a per-request deadline and
/// returns the fused hits plus a trace (component G). A single value is
/// constructed at startup and shared across requests; it owns no mutable
/// state beyond the cache and the semaphore, both of which are internally
/// concurrency-safe.
pub struct Engine {
    config: EngineConfig,
    embedder: Arc<dyn Embedder>,
    vector_index: Arc<dyn VectorIndex>,
    lexical_index: Arc<dyn LexicalIndex>,
    store: Arc<dyn CentroidStore>,
    cache: CentroidCache,
    personalizer: Personalizer,
    scorer: EphemeralScorer,
    fuser: Fuser,
    semaphore: Arc<Semaphore>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        embedder: Arc<dyn Embedder>,
        vector_index: Arc<dyn VectorIndex>,
        lexical_index: Arc<dyn LexicalIndex>,
        store: Arc<dyn CentroidStore>,
    ) -> Self {
        let cache = CentroidCache::new(
            config.centroid_cache_ttl(),
            config.centroid_cache_max_entries,
        );
        let personalizer = Personalizer::new(
            TagInferencer::default_legal_table(),
            AlphaConfig {
                default_alpha: config.default_alpha,
                min_alpha: config.min_alpha,
                max_alpha: config.max_alpha,
            },
        );
        let fuser = Fuser::new(config.rrf_k_parameter, config.external_boost);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_source_calls));

        Self {
            config,
            embedder,
            vector_index,
            lexical_index,
            store,
            cache,
            personalizer,
            scorer: EphemeralScorer::new(),
            fuser,
            semaphore,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn CentroidStore> {
        &self.store
    }

    pub fn vector_index(&self) -> &Arc<dyn VectorIndex> {
        &self.vector_index
    }

    /// Entry point: validates the request, enforces the per-request
    /// deadline over everything that follows, and returns either a complete
    /// ranked list plus trace, or an error. Never returns a partially-formed
    /// result.
    pub async fn search(&self, mut req: QueryRequest) -> Result<(Vec<ScoredHit>, SearchTrace)> {
        req.validate()?;

        let mut k_total_clamped = false;
        if req.k_total > self.config.max_k_total {
            req.k_total = self.config.max_k_total;
            k_total_clamped = true;
        }

        let start = Instant::now();
        let deadline = self.config.request_deadline();
        let outcome = tokio::time::timeout(deadline, self.search_inner(&req))
            .await
            .map_err(|_| RetrievalError::cancelled("request deadline exceeded"))??;

        let (hits, mut trace) = outcome;
        trace.duration_ms = start.elapsed().as_millis() as u64;
        trace.k_total_clamped = k_total_clamped;
        Ok((hits, trace))
    }

    pub fn invalidate_centroid(&self, tenant: &str, tag: &str) -> Result<()> {
        self.cache.invalidate(tenant, tag);
        Ok(())
    }

    pub fn stats(&self, tenant: &str) -> StatsReport {
        StatsReport {
            tenant: tenant.to_string(),
            cached_tags: self.cache.cached_tags_for(tenant),
            cache_hits: self.cache.hit_count(),
            cache_misses: self.cache.miss_count(),
        }
    }

    async fn search_inner(&self, req: &QueryRequest) -> Result<(Vec<ScoredHit>, SearchTrace)> {
        let mut trace = SearchTrace::default();

        // Only `use_internal` requests compute a query embedding: vector
        // search and personalization both depend on it, but an
        // external-only request is scored on priority and lexical overlap
        // alone, never on similarity to a query vector.
        let need_embedding = req.use_internal;
        let q_vec = if need_embedding {
            let embedded = self.embedder.embed(&req.query_text).await?;
            if embedded.dimension() != self.config.embedding_dimension {
                return Err(RetrievalError::invalid_argument(format!(
                    "embedder returned dimension {} but embedding_dimension is configured as {}",
                    embedded.dimension(),
                    self.config.embedding_dimension
                )));
            }
            Some(embedded)
        } else {
            None
        };

        let mut vector_query = q_vec.clone();
        if req.personalize {
            if let Some(q) = &q_vec {
                let outcome = self
                    .personalizer
                    .personalize(
                        &req.query_text,
                        q,
                        &req.tenant,
                        req.tag.as_deref(),
                        req.alpha,
                        &self.cache,
                        self.store.as_ref(),
                    )
                    .await?;
                trace.personalization_applied = outcome.applied;
                trace.alpha_used = Some(outcome.alpha_used);
                trace.similarity_query_to_centroid = outcome.similarity;
                if outcome.degraded {
                    trace.degraded_sources.push("centroid_store".to_string());
                }
                vector_query = Some(outcome.embedding);
            }
        }

        let k_search = (2 * req.k_total).min(MAX_SOURCE_SEARCH_LIMIT);
        let filters: HashMap<String, serde_json::Value> = HashMap::new();

        let vector_attempted = req.use_internal;
        let lexical_attempted = req.use_internal;
        let external_attempted = !req.external.is_empty();

        let vector_fut = async {
            if !vector_attempted {
                return Ok(Vec::new());
            }
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| RetrievalError::internal("source semaphore closed"))?;
            let vq = vector_query
                .clone()
                .expect("vector search requires an embedding when use_internal is set");
            self.vector_index
                .search(&req.tenant, &vq, k_search, &filters)
                .await
        }
        .instrument(info_span!("vector_search"));

        let lexical_fut = async {
            if !lexical_attempted {
                return Ok(Vec::new());
            }
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| RetrievalError::internal("source semaphore closed"))?;
            self.lexical_index
                .search(&req.tenant, &req.query_text, k_search)
                .await
        }
        .instrument(info_span!("lexical_search"));

        let external_fut = async {
            if !external_attempted {
                return Ok(Vec::new());
            }
            let _permit = self
                .semaphore
                .acquire()
                .await
                .map_err(|_| RetrievalError::internal("source semaphore closed"))?;
            self.scorer
                .score(&req.query_text, q_vec.as_ref(), &req.external, self.embedder.as_ref())
                .await
        }
        .instrument(info_span!("external_scoring"));

        let (vector_res, lexical_res, external_res) =
            tokio::join!(vector_fut, lexical_fut, external_fut);

        let (vector_hits, vector_failed) = degrade(vector_res, "vector", &mut trace);
        let (lexical_hits, lexical_failed) = degrade(lexical_res, "lexical", &mut trace);
        let (external_hits, external_failed) = degrade(external_res, "external", &mut trace);

        let attempted_count = [vector_attempted, lexical_attempted, external_attempted]
            .iter()
            .filter(|a| **a)
            .count();
        let failed_count = [
            vector_attempted && vector_failed,
            lexical_attempted && lexical_failed,
            external_attempted && external_failed,
        ]
        .iter()
        .filter(|f| **f)
        .count();
        if attempted_count > 0 && failed_count == attempted_count {
            return Err(RetrievalError::unavailable(
                "every source failed for this request",
            ));
        }

        let fused = self
            .fuser
            .fuse(&vector_hits, &lexical_hits, &external_hits, req.k_total);

        let mut internal_ids: HashSet<&str> = HashSet::new();
        for hit in vector_hits.iter().chain(lexical_hits.iter()) {
            internal_ids.insert(hit.doc_id.as_str());
        }
        trace.internal_count = internal_ids.len();
        trace.external_count = external_hits.len();
        trace.total = fused.len();

        Ok((fused, trace))
    }
}

/// Folds a source's result into the trace: `Ok` passes results through
/// unchanged, `Err` is recorded as a degradation and downgraded to an empty
/// list rather than aborting the request.
fn degrade<T>(
    result: Result<Vec<T>>,
    name: &str,
    trace: &mut SearchTrace,
) -> (Vec<T>, bool) {
    match result {
        Ok(items) => (items, false),
        Err(err) => {
            warn!(source = name, error = %err, "source failed, degrading to empty list");
            trace.degraded_sources.push(name.to_string());
            (Vec::new(), true)
        }
    }
}
