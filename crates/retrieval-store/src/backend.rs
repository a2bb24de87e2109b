use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Low-level storage error, local to this crate. Converted to
/// `RetrievalError::Unavailable` at the `CentroidStore` boundary, mirroring
/// how a backend-local error type is folded into the shared taxonomy at the
/// edge of a crate rather than leaking storage internals upward.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend error: {0}")]
    Backend(String),
}

impl BackendError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// A byte-oriented key-value backend. `CentroidStoreImpl` layers the
/// `(tenant, tag)` key scheme and TTL semantics on top of this.
pub trait StoreBackend: Send + Sync {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError>;
    fn delete(&self, key: &str) -> Result<(), BackendError>;
    /// Keys with the given prefix, for diagnostics (`Scan`).
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BackendError>;
}

/// Selects and builds a backend. Mirrors the source's store-agnostic key
/// layout: `InMemory` is for tests, `Redb` is the production default.
#[derive(Clone, Debug, Default)]
pub enum BackendConfig {
    #[default]
    InMemory,
    Redb {
        path: String,
    },
}

impl BackendConfig {
    pub fn in_memory() -> Self {
        BackendConfig::InMemory
    }

    pub fn redb(path: impl Into<String>) -> Self {
        BackendConfig::Redb { path: path.into() }
    }

    pub fn build(&self) -> Result<Arc<dyn StoreBackend>, BackendError> {
        match self {
            BackendConfig::InMemory => Ok(Arc::new(InMemoryBackend::new())),
            BackendConfig::Redb { path } => Ok(Arc::new(crate::redb::RedbBackend::open(path)?)),
        }
    }
}

/// A `RwLock<HashMap>` backend, used for tests and embedded callers that
/// don't need durability.
#[derive(Default)]
pub struct InMemoryBackend {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl StoreBackend for InMemoryBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        self.records
            .write()
            .map_err(|_| BackendError::backend("poisoned lock"))?
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let guard = self
            .records
            .read()
            .map_err(|_| BackendError::backend("poisoned lock"))?;
        Ok(guard.get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<(), BackendError> {
        self.records
            .write()
            .map_err(|_| BackendError::backend("poisoned lock"))?
            .remove(key);
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let guard = self
            .records
            .read()
            .map_err(|_| BackendError::backend("poisoned lock"))?;
        Ok(guard
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
