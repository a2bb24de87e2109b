//! Periodic/triggered centroid recomputation (component H).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use retrieval_types::{
    BuildOutcome, BuildReport, Centroid, CentroidMetadata, CentroidStore, Embedding,
    RetrievalError, VectorIndex,
};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{info, warn};

/// Cooperative cancellation for a build run, checked between batches. A
/// partial build never publishes: cancellation mid-scan simply stops
/// accumulating and the pair is reported as failed, never written.
#[derive(Clone, Default)]
pub struct BuildCancellation(Arc<AtomicBool>);

impl BuildCancellation {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BuilderConfig {
    pub batch_size: usize,
    pub min_vectors_for_centroid: u64,
    pub max_vectors_for_centroid: u64,
    pub centroid_ttl: Duration,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            batch_size: 1_000,
            min_vectors_for_centroid: 10,
            max_vectors_for_centroid: 10_000,
            centroid_ttl: Duration::from_secs(60 * 60 * 24 * 7),
        }
    }
}

/// Drives the per-`(tenant, tag)` centroid recomputation state machine:
/// `Idle -> Scanning -> Aggregating -> Writing -> Idle`, with a terminal
/// `Degenerate` or `Failed` outcome from any stage. Runs are idempotent;
/// concurrent runs for the same key serialize via a per-key advisory lock.
/// A failed pair never aborts its siblings — the job reports per-key status.
pub struct CentroidBuilder {
    config: BuilderConfig,
    locks: DashMap<String, Arc<AsyncMutex<()>>>,
}

impl CentroidBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            config,
            locks: DashMap::new(),
        }
    }

    /// Runs the build for `tenant`, over `tags` if given, or else every tag
    /// the store already has a live centroid for (a refresh-only run — a
    /// deployment wanting to seed brand-new tags must name them explicitly).
    pub async fn run(
        &self,
        tenant: &str,
        tags: Option<&[String]>,
        index: &dyn VectorIndex,
        store: &dyn CentroidStore,
        cancellation: Option<&BuildCancellation>,
    ) -> BuildReport {
        let tags_owned;
        let tags: &[String] = match tags {
            Some(t) => t,
            None => {
                tags_owned = store.scan_tags(tenant).await.unwrap_or_default();
                &tags_owned
            }
        };

        let mut report = BuildReport::default();
        for tag in tags {
            if cancellation.is_some_and(|c| c.is_cancelled()) {
                report.record(
                    tenant,
                    tag,
                    BuildOutcome::Failed {
                        reason: "build cancelled before this pair started".into(),
                    },
                );
                continue;
            }
            let outcome = self
                .process_one(tenant, tag, index, store, cancellation)
                .await;
            report.record(tenant, tag, outcome);
        }
        report
    }

    async fn process_one(
        &self,
        tenant: &str,
        tag: &str,
        index: &dyn VectorIndex,
        store: &dyn CentroidStore,
        cancellation: Option<&BuildCancellation>,
    ) -> BuildOutcome {
        let key = format!("{tenant}:{tag}");
        let lock = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        match self.scan_and_aggregate(tenant, tag, index, cancellation).await {
            Ok(Some((mean, norm, total_seen, dimension))) => {
                let normalized: Vec<f32> = mean.into_iter().map(|v| (v / norm) as f32).collect();
                let centroid = Centroid {
                    vector: Embedding::from_unit_norm_unchecked(normalized),
                    metadata: CentroidMetadata {
                        tenant: tenant.to_string(),
                        tag: tag.to_string(),
                        updated_at: Utc::now(),
                        source_count: total_seen,
                        dimension,
                    },
                };
                match store.put(centroid, self.config.centroid_ttl).await {
                    Ok(()) => {
                        info!(tenant, tag, total_seen, "centroid updated");
                        BuildOutcome::Updated {
                            source_count: total_seen,
                        }
                    }
                    Err(err) => {
                        warn!(tenant, tag, error = %err, "failed to persist centroid");
                        BuildOutcome::Failed {
                            reason: err.to_string(),
                        }
                    }
                }
            }
            Ok(None) => BuildOutcome::Degenerate {
                reason: "mean vector norm below epsilon".into(),
            },
            Err(RetrievalError::Degenerate(reason)) => BuildOutcome::Degenerate { reason },
            Err(err) => BuildOutcome::Failed {
                reason: err.to_string(),
            },
        }
    }

    /// Streams embeddings in batches, maintaining a running sum and a
    /// bounded reservoir sample (Algorithm R) so that aggregation never
    /// holds more than `max_vectors_for_centroid` embeddings in memory
    /// regardless of how large the underlying tag population is. Returns
    /// `None` if the aggregate mean's norm is sub-epsilon (a degenerate
    /// pair, nothing written) or an error if scanning failed or the pair
    /// has too few vectors.
    async fn scan_and_aggregate(
        &self,
        tenant: &str,
        tag: &str,
        index: &dyn VectorIndex,
        cancellation: Option<&BuildCancellation>,
    ) -> retrieval_types::Result<Option<(Vec<f64>, f64, u64, usize)>> {
        let mut reservoir: Vec<Embedding> = Vec::new();
        let mut total_seen: u64 = 0;
        let mut cursor: Option<String> = None;
        let mut dimension: Option<usize> = None;

        loop {
            if cancellation.is_some_and(|c| c.is_cancelled()) {
                return Err(RetrievalError::cancelled("centroid build cancelled mid-scan"));
            }

            let (batch, next_cursor) = index
                .scan(tenant, tag, cursor.clone(), self.config.batch_size)
                .await?;
            if batch.is_empty() && next_cursor.is_none() {
                break;
            }

            for embedding in batch {
                if dimension.is_none() {
                    dimension = Some(embedding.dimension());
                }
                total_seen += 1;
                reservoir_insert(
                    &mut reservoir,
                    embedding,
                    total_seen,
                    self.config.max_vectors_for_centroid,
                );
            }

            if next_cursor.is_none() {
                break;
            }
            cursor = next_cursor;
        }

        if total_seen < self.config.min_vectors_for_centroid {
            return Err(RetrievalError::degenerate(format!(
                "only {total_seen} vectors found, need at least {}",
                self.config.min_vectors_for_centroid
            )));
        }

        let dimension = dimension.unwrap_or(0);
        let mut sum = vec![0.0_f64; dimension];
        for embedding in &reservoir {
            for (acc, v) in sum.iter_mut().zip(embedding.as_slice()) {
                *acc += *v as f64;
            }
        }
        let n = reservoir.len() as f64;
        let mean: Vec<f64> = sum.into_iter().map(|s| s / n).collect();
        let norm: f64 = mean.iter().map(|v| v * v).sum::<f64>().sqrt();

        if norm < retrieval_types::NORM_EPSILON as f64 {
            return Ok(None);
        }
        Ok(Some((mean, norm, total_seen, dimension)))
    }
}

/// Algorithm R reservoir sampling: after seeing `seen_count` items (1-based,
/// counting the just-inserted one), each item has probability
/// `capacity / seen_count` of being in the final sample, uniformly over the
/// whole stream, without knowing its length in advance.
fn reservoir_insert(reservoir: &mut Vec<Embedding>, item: Embedding, seen_count: u64, capacity: u64) {
    if capacity == 0 {
        return;
    }
    if (reservoir.len() as u64) < capacity {
        reservoir.push(item);
        return;
    }
    let j = fastrand::u64(0..seen_count);
    if j < capacity {
        reservoir[j as usize] = item;
    }
}
