use super::CacheError;

/// Trait for durable blob persistence. One value per key (latest wins).
///
/// Values are JSON text. Implementations report failures; the [`Cache`]
/// adapter decides how to degrade.
///
/// [`Cache`]: super::Cache
pub trait BlobStore: Send + Sync {
    /// Load the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Save (or overwrite) the value stored under `key`.
    fn set(&self, key: &str, value: String) -> Result<(), CacheError>;
}
