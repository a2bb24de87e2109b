use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use retrieval_types::{Centroid, CentroidMetadata, Embedding, RetrievalError, Result};
use tracing::{debug, warn};

use crate::backend::StoreBackend;
use crate::wire::{centroid_key, centroid_meta_key, decode_vector, encode_vector, StoredMetadata};

/// `CentroidStore` implementation layering the `(tenant, tag)` key scheme,
/// TTL expiry, and the error taxonomy on top of a byte-oriented
/// [`StoreBackend`]. Backend failures surface as `Unavailable`; callers
/// (the personalizer, the cache) are expected to degrade gracefully rather
/// than propagate them.
pub struct CentroidStoreImpl {
    backend: Arc<dyn StoreBackend>,
}

impl CentroidStoreImpl {
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl retrieval_types::CentroidStore for CentroidStoreImpl {
    async fn get(&self, tenant: &str, tag: &str) -> Result<Option<Centroid>> {
        let meta_bytes = self
            .backend
            .get(&centroid_meta_key(tenant, tag))
            .map_err(|e| RetrievalError::unavailable(e.to_string()))?;
        let Some(meta_bytes) = meta_bytes else {
            return Ok(None);
        };
        let meta: StoredMetadata = serde_json::from_slice(&meta_bytes)
            .map_err(|e| RetrievalError::internal(format!("corrupt centroid metadata: {e}")))?;

        if meta.expires_at <= Utc::now() {
            debug!(tenant, tag, "centroid expired at store TTL");
            return Ok(None);
        }

        let vec_bytes = self
            .backend
            .get(&centroid_key(tenant, tag))
            .map_err(|e| RetrievalError::unavailable(e.to_string()))?;
        let Some(vec_bytes) = vec_bytes else {
            warn!(tenant, tag, "metadata present but vector bytes missing");
            return Ok(None);
        };
        let values = decode_vector(&vec_bytes)
            .ok_or_else(|| RetrievalError::internal("corrupt centroid vector bytes"))?;
        if values.len() != meta.dimension {
            return Err(RetrievalError::internal(
                "stored vector length does not match stored dimension",
            ));
        }

        let vector = Embedding::from_unit_norm_unchecked(values);
        Ok(Some(Centroid {
            vector,
            metadata: CentroidMetadata {
                tenant: meta.tenant,
                tag: meta.tag,
                updated_at: meta.updated_at,
                source_count: meta.source_count,
                dimension: meta.dimension,
            },
        }))
    }

    async fn put(&self, centroid: Centroid, ttl: Duration) -> Result<()> {
        let tenant = centroid.metadata.tenant.clone();
        let tag = centroid.metadata.tag.clone();
        let expires_at = centroid.metadata.updated_at
            + chrono::Duration::from_std(ttl)
                .map_err(|e| RetrievalError::invalid_argument(format!("invalid ttl: {e}")))?;

        let meta = StoredMetadata {
            tenant: tenant.clone(),
            tag: tag.clone(),
            updated_at: centroid.metadata.updated_at,
            source_count: centroid.metadata.source_count,
            dimension: centroid.metadata.dimension,
            expires_at,
        };
        let meta_bytes = serde_json::to_vec(&meta)
            .map_err(|e| RetrievalError::internal(format!("failed to encode metadata: {e}")))?;
        let vec_bytes = encode_vector(centroid.vector.as_slice());

        self.backend
            .put(&centroid_key(&tenant, &tag), &vec_bytes)
            .map_err(|e| RetrievalError::unavailable(e.to_string()))?;
        self.backend
            .put(&centroid_meta_key(&tenant, &tag), &meta_bytes)
            .map_err(|e| RetrievalError::unavailable(e.to_string()))?;
        Ok(())
    }

    async fn scan_tags(&self, tenant: &str) -> Result<Vec<String>> {
        let prefix = format!("centroid_meta:{tenant}:");
        let keys = self
            .backend
            .keys_with_prefix(&prefix)
            .map_err(|e| RetrievalError::unavailable(e.to_string()))?;

        let mut tags = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(tag) = key.strip_prefix(&prefix) else {
                continue;
            };
            if let Ok(Some(bytes)) = self.backend.get(&key) {
                if let Ok(meta) = serde_json::from_slice::<StoredMetadata>(&bytes) {
                    if meta.expires_at > Utc::now() {
                        tags.push(tag.to_string());
                    }
                }
            }
        }
        tags.sort();
        Ok(tags)
    }
}
