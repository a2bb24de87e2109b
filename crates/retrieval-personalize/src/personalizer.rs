use retrieval_cache::CentroidCache;
use retrieval_types::{CentroidStore, Embedding, Result, RetrievalError};
use tracing::{debug, warn};

use crate::tag_inferencer::TagInferencer;

/// Bounds and default for the personalization mixing weight.
#[derive(Debug, Clone, Copy)]
pub struct AlphaConfig {
    pub default_alpha: f32,
    pub min_alpha: f32,
    pub max_alpha: f32,
}

impl Default for AlphaConfig {
    fn default() -> Self {
        Self {
            default_alpha: 0.25,
            min_alpha: 0.0,
            max_alpha: 1.0,
        }
    }
}

/// Result of attempting to personalize a query embedding.
#[derive(Debug, Clone)]
pub struct PersonalizationOutcome {
    pub embedding: Embedding,
    pub applied: bool,
    pub similarity: Option<f32>,
    pub alpha_used: f32,
    pub tag_used: String,
    pub degraded: bool,
}

/// Combines a query embedding with a tenant-and-tag centroid (component D).
/// Resolves the tag via `TagInferencer` when the caller omits one, resolves
/// alpha against the configured clamp range, and blends:
/// `q' = q + alpha * C`, renormalized, with an epsilon fallback to the
/// original query on a sub-epsilon blended norm.
pub struct Personalizer {
    inferencer: TagInferencer,
    alpha: AlphaConfig,
}

impl Personalizer {
    pub fn new(inferencer: TagInferencer, alpha: AlphaConfig) -> Self {
        Self { inferencer, alpha }
    }

    pub async fn personalize(
        &self,
        query_text: &str,
        q: &Embedding,
        tenant: &str,
        tag: Option<&str>,
        alpha: Option<f32>,
        cache: &CentroidCache,
        store: &dyn CentroidStore,
    ) -> Result<PersonalizationOutcome> {
        let tag_used = tag
            .map(|t| t.to_string())
            .unwrap_or_else(|| self.inferencer.infer(query_text));
        let alpha_used = alpha
            .map(|a| a.clamp(self.alpha.min_alpha, self.alpha.max_alpha))
            .unwrap_or(self.alpha.default_alpha);

        let centroid = match cache.get_or_fetch(store, tenant, &tag_used).await {
            Ok(centroid) => centroid,
            Err(err) if err.is_recoverable() => {
                warn!(tenant, tag = %tag_used, error = %err, "centroid lookup degraded, proceeding unpersonalized");
                return Ok(PersonalizationOutcome {
                    embedding: q.clone(),
                    applied: false,
                    similarity: None,
                    alpha_used,
                    tag_used,
                    degraded: true,
                });
            }
            Err(err) => return Err(err),
        };

        let Some(centroid) = centroid else {
            debug!(tenant, tag = %tag_used, "no centroid on file, proceeding unpersonalized");
            return Ok(PersonalizationOutcome {
                embedding: q.clone(),
                applied: false,
                similarity: None,
                alpha_used,
                tag_used,
                degraded: false,
            });
        };

        if q.dimension() != centroid.vector.dimension() {
            return Err(RetrievalError::invalid_argument(format!(
                "query embedding has dimension {} but the {tag_used} centroid has dimension {}",
                q.dimension(),
                centroid.vector.dimension()
            )));
        }

        let similarity = q.cosine(&centroid.vector);
        let (blended, norm) = q.blend_raw(alpha_used, &centroid.vector);
        if norm < retrieval_types::NORM_EPSILON {
            warn!(tenant, tag = %tag_used, "personalized blend collapsed to near-zero norm");
            return Ok(PersonalizationOutcome {
                embedding: q.clone(),
                applied: false,
                similarity: Some(similarity),
                alpha_used,
                tag_used,
                degraded: false,
            });
        }

        let normalized: Vec<f32> = blended.into_iter().map(|v| v / norm).collect();
        Ok(PersonalizationOutcome {
            embedding: Embedding::from_unit_norm_unchecked(normalized),
            applied: true,
            similarity: Some(similarity),
            alpha_used,
            tag_used,
            degraded: false,
        })
    }
}
