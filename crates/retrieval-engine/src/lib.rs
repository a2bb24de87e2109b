//! Wires components A through H into the two public entry points a caller
//! embeds: `Engine` for search, `Builder` for centroid recomputation.

mod builder_facade;
mod config;
mod engine;

pub use builder_facade::Builder;
pub use config::{ConfigError, EngineConfig};
pub use engine::Engine;

pub use retrieval_builder::BuildCancellation;
pub use retrieval_types::{
    Centroid, CentroidMetadata, CentroidStore, Embedder, Embedding, ExternalDoc, LexicalIndex,
    QueryRequest, Result, RetrievalError, ScoredHit, SearchTrace, StatsReport, VectorIndex,
};
