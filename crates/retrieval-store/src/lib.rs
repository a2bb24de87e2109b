//! Keyed persistent storage of centroids (component A). Provides an
//! in-memory backend for tests and embedded callers, and a `redb`-backed
//! durable implementation, both behind the shared `CentroidStore` trait.

mod backend;
mod redb;
mod store;
mod wire;

pub use backend::{BackendConfig, BackendError, InMemoryBackend, StoreBackend};
pub use store::CentroidStoreImpl;
pub use wire::{centroid_key, centroid_meta_key, decode_vector, encode_vector, StoredMetadata};
