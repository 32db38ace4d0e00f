use crate::record::Collection;

/// Default number of records requested per collection on bulk load.
///
/// Records beyond the first page are not fetched, so this is a capacity limit
/// of the replica rather than a correctness guarantee.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

pub const DEFAULT_KEY_PREFIX: &str = "np_";

/// Topic subscribed on every collection feed.
pub const DEFAULT_TOPIC: &str = "*";

/// Settings shared by the loader, the reconciler and the cache keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncConfig {
    page_size: u32,
    key_prefix: String,
    topic: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
        }
    }

    /// Set the bulk-load page size. Zero is bumped to one.
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = size.max(1);
        self
    }

    /// Set the prefix used for every cache key.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the subscription topic.
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Cache key holding a collection snapshot, e.g. `np_orders`.
    pub fn collection_key(&self, collection: Collection) -> String {
        format!("{}{}", self.key_prefix, collection.name())
    }

    /// Cache key holding the last successful sync time.
    pub fn last_sync_key(&self) -> String {
        format!("{}last_sync", self.key_prefix)
    }
}
