use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{error, warn};

use crate::config::SyncConfig;
use crate::record::{Collection, Record};

use super::{BlobStore, CacheError};

/// Never-failing JSON view over a [`BlobStore`].
///
/// Every failure is logged and swallowed: `load` degrades to `None` and
/// `save` to a no-op. Nothing is retried. Clone-friendly via `Arc`.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn BlobStore>,
    config: Arc<SyncConfig>,
}

impl Cache {
    pub fn new(store: Arc<dyn BlobStore>, config: Arc<SyncConfig>) -> Self {
        Self { store, config }
    }

    /// Load and decode the value under `key`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                error!(key, error = %e, "failed to read from cache");
                return None;
            }
        };

        match decode(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "discarding unreadable cache entry");
                None
            }
        }
    }

    /// Encode and store `value` under `key`.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let raw = match encode(value) {
            Ok(raw) => raw,
            Err(e) => {
                error!(key, error = %e, "failed to serialize cache entry");
                return;
            }
        };

        if let Err(e) = self.store.set(key, raw) {
            error!(key, error = %e, "failed to write to cache");
        }
    }

    pub fn load_collection(&self, collection: Collection) -> Option<Vec<Record>> {
        self.load(&self.config.collection_key(collection))
    }

    pub fn save_collection(&self, collection: Collection, records: &[Record]) {
        self.save(&self.config.collection_key(collection), records);
    }

    pub fn load_last_sync(&self) -> Option<DateTime<Utc>> {
        self.load(&self.config.last_sync_key())
    }

    pub fn save_last_sync(&self, at: DateTime<Utc>) {
        self.save(&self.config.last_sync_key(), &at);
    }
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CacheError> {
    Ok(serde_json::from_str(raw)?)
}

fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String, CacheError> {
    Ok(serde_json::to_string(value)?)
}
