//! Persistent cache - durable string-keyed storage for collection snapshots.
//!
//! The replica writes one JSON blob per collection plus the last sync time so
//! that a restarted process can show data before the network answers.
//!
//! ```text
//!   Cache (never fails, logs)  ──►  BlobStore (get/set, may fail)
//!                                      ├── InMemoryBlobStore
//!                                      └── FileBlobStore   (feature "fs")
//! ```

mod adapter;
#[cfg(feature = "fs")]
mod file;
mod in_memory;
mod store;

use std::fmt;

pub use adapter::Cache;
#[cfg(feature = "fs")]
pub use file::FileBlobStore;
pub use in_memory::InMemoryBlobStore;
pub use store::BlobStore;

/// Error type for blob store operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Serialization/deserialization error.
    Serde(String),
    /// Storage-level error (I/O, backend failure).
    Storage(String),
    /// The write would exceed the store's capacity.
    QuotaExceeded { key: String, needed: usize, limit: usize },
    /// A lock guarding the store was poisoned.
    LockPoisoned(&'static str),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Serde(msg) => write!(f, "cache serialization error: {}", msg),
            CacheError::Storage(msg) => write!(f, "cache storage error: {}", msg),
            CacheError::QuotaExceeded { key, needed, limit } => write!(
                f,
                "cache quota exceeded writing {} ({} bytes needed, limit {})",
                key, needed, limit
            ),
            CacheError::LockPoisoned(operation) => {
                write!(f, "cache lock poisoned during {}", operation)
            }
        }
    }
}

impl std::error::Error for CacheError {}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serde(err.to_string())
    }
}
