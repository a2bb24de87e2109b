//! Thin facade wiring `CentroidBuilder` (component H) to the same
//! `VectorIndex`/`CentroidStore` pair the `Engine` searches against, so a
//! caller holds one handle for both the read and the build path.

use std::sync::Arc;

use retrieval_builder::{BuildCancellation, BuilderConfig, CentroidBuilder};
use retrieval_types::{BuildReport, CentroidStore, VectorIndex};

use crate::config::EngineConfig;

pub struct Builder {
    builder: CentroidBuilder,
    vector_index: Arc<dyn VectorIndex>,
    store: Arc<dyn CentroidStore>,
}

impl Builder {
    pub fn new(
        config: &EngineConfig,
        vector_index: Arc<dyn VectorIndex>,
        store: Arc<dyn CentroidStore>,
    ) -> Self {
        let builder_config = BuilderConfig {
            batch_size: config.centroid_build_batch_size,
            min_vectors_for_centroid: config.min_vectors_for_centroid,
            max_vectors_for_centroid: config.max_vectors_for_centroid,
            centroid_ttl: config.centroid_ttl(),
        };
        Self {
            builder: CentroidBuilder::new(builder_config),
            vector_index,
            store,
        }
    }

    /// Recomputes centroids for `tenant`, over `tags` if given, or else
    /// every tag the store currently has a live centroid for.
    pub async fn run(
        &self,
        tenant: &str,
        tags: Option<&[String]>,
        cancellation: Option<&BuildCancellation>,
    ) -> BuildReport {
        self.builder
            .run(
                tenant,
                tags,
                self.vector_index.as_ref(),
                self.store.as_ref(),
                cancellation,
            )
            .await
    }
}
