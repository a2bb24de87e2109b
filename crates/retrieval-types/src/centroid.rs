use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;

/// Metadata stored alongside a centroid's raw vector bytes.
///
/// `tag`/`tenant` duplicate the store key but are carried in the value too,
/// mirroring what a `Stats`/`Scan` response needs without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CentroidMetadata {
    pub tenant: String,
    pub tag: String,
    pub updated_at: DateTime<Utc>,
    pub source_count: u64,
    pub dimension: usize,
}

/// A tenant-and-topic interest centroid: a unit-norm embedding plus the
/// metadata describing how it was derived.
#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    pub vector: Embedding,
    pub metadata: CentroidMetadata,
}

impl Centroid {
    pub fn new(vector: Embedding, tenant: impl Into<String>, tag: impl Into<String>, source_count: u64, updated_at: DateTime<Utc>) -> Self {
        let dimension = vector.dimension();
        Self {
            vector,
            metadata: CentroidMetadata {
                tenant: tenant.into(),
                tag: tag.into(),
                updated_at,
                source_count,
                dimension,
            },
        }
    }
}
