//! Shared data model, collaborator traits, and error taxonomy for the
//! federated retrieval and personalization engine. Every other crate in the
//! workspace depends on this one and none of its types depend on a concrete
//! backend.

mod centroid;
mod embedding;
mod error;
mod hit;
mod request;
mod traits;

pub use centroid::{Centroid, CentroidMetadata};
pub use embedding::{Embedding, NORM_EPSILON};
pub use error::{RetrievalError, Result};
pub use hit::{
    BuildOutcome, BuildReport, Contribution, ExternalHit, InternalHit, InternalSource, Origin,
    ScoredHit, SearchTrace, StatsReport,
};
pub use request::{
    ExternalDoc, QueryRequest, MAX_EXTERNAL_AGGREGATE_CHARS, MAX_EXTERNAL_DOCS,
    MAX_EXTERNAL_DOC_CHARS,
};
pub use traits::{CentroidStore, Embedder, LexicalIndex, VectorIndex};
