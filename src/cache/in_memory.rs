use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::{BlobStore, CacheError};

/// In-memory blob store backed by `Arc<RwLock<HashMap>>`.
///
/// Clone-friendly (cloning shares the same underlying storage). An optional
/// byte quota rejects writes the way browser storage does when full.
#[derive(Clone, Default)]
pub struct InMemoryBlobStore {
    storage: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total stored bytes (keys excluded).
    pub fn with_quota(mut self, bytes: usize) -> Self {
        self.quota = Some(bytes);
        self
    }

    /// Store a value without any quota check, e.g. to plant corrupted data.
    pub fn raw_set(&self, key: &str, value: impl Into<String>) {
        if let Ok(mut storage) = self.storage.write() {
            storage.insert(key.to_string(), value.into());
        }
    }

    /// Raw value stored under `key`.
    pub fn raw_get(&self, key: &str) -> Option<String> {
        self.storage.read().ok()?.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .storage
            .read()
            .map(|storage| storage.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.storage.read().map(|s| s.is_empty()).unwrap_or(true)
    }
}

impl BlobStore for InMemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| CacheError::LockPoisoned("blob read"))?;
        Ok(storage.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<(), CacheError> {
        let mut storage = self
            .storage
            .write()
            .map_err(|_| CacheError::LockPoisoned("blob write"))?;

        if let Some(limit) = self.quota {
            let others: usize = storage
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            let needed = others + value.len();
            if needed > limit {
                return Err(CacheError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    limit,
                });
            }
        }

        storage.insert(key.to_string(), value);
        Ok(())
    }
}
