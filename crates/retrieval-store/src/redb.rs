use redb::{Database, ReadableTable, TableDefinition};

use crate::backend::{BackendError, StoreBackend};

const CENTROID_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("centroids");

/// Pure-Rust embedded ACID storage for centroids, the production default.
pub struct RedbBackend {
    db: Database,
}

impl RedbBackend {
    pub fn open(path: &str) -> Result<Self, BackendError> {
        let db = Database::create(path)
            .map_err(|e| BackendError::backend(format!("failed to open redb database: {e}")))?;
        // Ensure the table exists before any reader tries to open it.
        let write_txn = db
            .begin_write()
            .map_err(|e| BackendError::backend(format!("failed to begin write txn: {e}")))?;
        {
            let _ = write_txn
                .open_table(CENTROID_TABLE)
                .map_err(|e| BackendError::backend(format!("failed to open table: {e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| BackendError::backend(format!("failed to commit txn: {e}")))?;
        Ok(Self { db })
    }
}

impl StoreBackend for RedbBackend {
    fn put(&self, key: &str, value: &[u8]) -> Result<(), BackendError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| BackendError::backend(format!("failed to begin write txn: {e}")))?;
        {
            let mut table = write_txn
                .open_table(CENTROID_TABLE)
                .map_err(|e| BackendError::backend(format!("failed to open table: {e}")))?;
            table
                .insert(key, value)
                .map_err(|e| BackendError::backend(format!("failed to insert: {e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| BackendError::backend(format!("failed to commit txn: {e}")))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, BackendError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| BackendError::backend(format!("failed to begin read txn: {e}")))?;
        let table = read_txn
            .open_table(CENTROID_TABLE)
            .map_err(|e| BackendError::backend(format!("failed to open table: {e}")))?;
        let value = table
            .get(key)
            .map_err(|e| BackendError::backend(format!("failed to read: {e}")))?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    fn delete(&self, key: &str) -> Result<(), BackendError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| BackendError::backend(format!("failed to begin write txn: {e}")))?;
        {
            let mut table = write_txn
                .open_table(CENTROID_TABLE)
                .map_err(|e| BackendError::backend(format!("failed to open table: {e}")))?;
            table
                .remove(key)
                .map_err(|e| BackendError::backend(format!("failed to remove: {e}")))?;
        }
        write_txn
            .commit()
            .map_err(|e| BackendError::backend(format!("failed to commit txn: {e}")))?;
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, BackendError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| BackendError::backend(format!("failed to begin read txn: {e}")))?;
        let table = read_txn
            .open_table(CENTROID_TABLE)
            .map_err(|e| BackendError::backend(format!("failed to open table: {e}")))?;
        let mut keys = Vec::new();
        let mut range = table
            .range::<&str>(..)
            .map_err(|e| BackendError::backend(format!("failed to scan: {e}")))?;
        while let Some(entry) = range.next() {
            let (k, _v) = entry.map_err(|e| BackendError::backend(format!("scan error: {e}")))?;
            if k.value().starts_with(prefix) {
                keys.push(k.value().to_string());
            }
        }
        Ok(keys)
    }
}
