use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one stored centroid, persisted as UTF-8 JSON under
/// `centroid_meta:{tenant}:{tag}`. `expires_at` is local to this crate: it
/// is how TTL is layered on top of a backend (redb or in-memory) that has
/// no native per-key expiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredMetadata {
    pub tenant: String,
    pub tag: String,
    pub updated_at: DateTime<Utc>,
    pub source_count: u64,
    pub dimension: usize,
    pub expires_at: DateTime<Utc>,
}

pub fn centroid_key(tenant: &str, tag: &str) -> String {
    format!("centroid:{tenant}:{tag}")
}

pub fn centroid_meta_key(tenant: &str, tag: &str) -> String {
    format!("centroid_meta:{tenant}:{tag}")
}

/// Encodes unit-norm vector components as little-endian float32 bytes, per
/// the store-agnostic persisted layout.
pub fn encode_vector(values: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decodes little-endian float32 bytes back into vector components. Returns
/// `None` if `bytes.len()` isn't a multiple of 4.
pub fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("chunk is exactly 4 bytes")))
            .collect(),
    )
}
