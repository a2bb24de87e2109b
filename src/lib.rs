//! Federated retrieval and personalization engine.
//!
//! Fans a query out across an internal vector index, an internal lexical
//! index, and caller-supplied ephemeral documents, blends in a tenant's
//! interest centroid when asked, and fuses everything into one ranked list
//! via Reciprocal Rank Fusion. This crate is a library: it owns no network
//! listener, CLI, or RPC surface, and embeds into a host process that
//! supplies the `Embedder`, `VectorIndex`, `LexicalIndex`, and
//! `CentroidStore` collaborators.
//!
//! ```ignore
//! let engine = Engine::new(config, embedder, vector_index, lexical_index, store);
//! let (hits, trace) = engine.search(request).await?;
//! ```

pub use retrieval_builder::BuildCancellation;
pub use retrieval_engine::{Builder, ConfigError, Engine, EngineConfig};
pub use retrieval_store::{BackendConfig, CentroidStoreImpl};
pub use retrieval_types::{
    BuildOutcome, BuildReport, Centroid, CentroidMetadata, CentroidStore, Contribution, Embedder,
    Embedding, ExternalDoc, ExternalHit, InternalHit, InternalSource, LexicalIndex, Origin,
    QueryRequest, Result, RetrievalError, ScoredHit, SearchTrace, StatsReport, VectorIndex,
};
