//! Lifecycle Controller - wires cache, store, loader and reconciler together.
//!
//! ## Example
//!
//! ```
//! use replica_rust::{Collection, InMemoryBlobStore, InMemoryRemote, Record, SyncEngine};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let remote = InMemoryRemote::new().with_records(
//!     Collection::Products,
//!     vec![Record::from_value(json!({ "id": "p1", "name": "Tea" })).unwrap()],
//! );
//! let engine = SyncEngine::new(remote, InMemoryBlobStore::new());
//!
//! // Cached data (if any) is available immediately...
//! let init = engine.initialize();
//! assert!(!init.has_cached_data);
//!
//! // ...and the authoritative snapshot arrives in the background.
//! assert!(init.startup.wait().await);
//! assert_eq!(engine.products().len(), 1);
//!
//! engine.shutdown().await;
//! # }
//! ```

mod subscriptions;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::cache::{BlobStore, Cache};
use crate::config::SyncConfig;
use crate::loader::BulkLoader;
use crate::reconciler::{EventReconciler, ReconcilerStats};
use crate::record::{Collection, Record};
use crate::remote::RemoteService;
use crate::store::{CollectionStore, Snapshot, SyncPhase, SyncState};
use crate::view::JoinedView;

use subscriptions::SubscriptionSlot;

/// Result of [`SyncEngine::initialize`].
pub struct Initialized {
    /// Whether any cached collection held records.
    pub has_cached_data: bool,
    /// The background bulk load and subscription setup.
    pub startup: StartupHandle,
}

/// Handle to the background startup task.
///
/// Dropping it does not cancel the task.
pub struct StartupHandle {
    task: JoinHandle<bool>,
}

impl StartupHandle {
    /// Wait for the bulk load and subscription setup to finish.
    ///
    /// Returns the bulk load result.
    pub async fn wait(self) -> bool {
        match self.task.await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(error = %e, "startup task failed");
                false
            }
        }
    }
}

/// A local-first replica of the remote collections.
///
/// Clone-friendly: clones share the same store, cache and subscriptions.
#[derive(Clone)]
pub struct SyncEngine {
    store: CollectionStore,
    cache: Cache,
    loader: BulkLoader,
    reconciler: EventReconciler,
    subscriptions: SubscriptionSlot,
}

impl SyncEngine {
    /// Create an engine with the default configuration.
    pub fn new<R, B>(remote: R, blobs: B) -> Self
    where
        R: RemoteService + 'static,
        B: BlobStore + 'static,
    {
        Self::with_config(remote, blobs, SyncConfig::default())
    }

    pub fn with_config<R, B>(remote: R, blobs: B, config: SyncConfig) -> Self
    where
        R: RemoteService + 'static,
        B: BlobStore + 'static,
    {
        Self::from_parts(Arc::new(remote), Arc::new(blobs), config)
    }

    /// Create an engine over shared trait objects.
    pub fn from_parts(
        remote: Arc<dyn RemoteService>,
        blobs: Arc<dyn BlobStore>,
        config: SyncConfig,
    ) -> Self {
        let config = Arc::new(config);
        let store = CollectionStore::new();
        let cache = Cache::new(blobs, Arc::clone(&config));
        let loader = BulkLoader::new(Arc::clone(&remote), store.clone(), cache.clone(), &config);
        let reconciler = EventReconciler::new(remote, store.clone(), cache.clone(), &config);

        Self {
            store,
            cache,
            loader,
            reconciler,
            subscriptions: SubscriptionSlot::default(),
        }
    }

    /// Load every cached snapshot into the store.
    ///
    /// Returns whether any cached collection held records.
    pub fn hydrate(&self) -> bool {
        let mut found_any = false;

        for collection in Collection::ALL {
            let cached = self.cache.load_collection(collection);
            let found = cached.as_ref().map_or(false, |records| !records.is_empty());
            if let Some(records) = cached {
                self.store.replace(collection, records);
            }
            let phase = self.store.phase(collection).hydrated(found);
            self.store.set_phase(collection, phase);
            found_any |= found;
        }

        if let Some(last_sync) = self.cache.load_last_sync() {
            self.store.set_last_sync(Some(last_sync));
        }

        info!(has_cached_data = found_any, "hydrated from cache");
        found_any
    }

    /// Hydrate from cache, then load and subscribe in the background.
    ///
    /// Returns as soon as the cache has been read. Subscriptions are set up
    /// once the bulk load settles, whether or not it succeeded. Must be called
    /// from within a Tokio runtime.
    pub fn initialize(&self) -> Initialized {
        let has_cached_data = self.hydrate();
        let (generation, previous) = self.subscriptions.begin();

        let loader = self.loader.clone();
        let reconciler = self.reconciler.clone();
        let slot = self.subscriptions.clone();
        let task = tokio::spawn(async move {
            let loaded = loader.fetch_all().await;

            if let Some(previous) = previous {
                previous.close().await;
            }
            let set = reconciler.subscribe_all().await;
            if let Some(stale) = slot.install(generation, set) {
                info!("shut down during startup, dropping new subscriptions");
                stale.close().await;
            }
            loaded
        });

        Initialized {
            has_cached_data,
            startup: StartupHandle { task },
        }
    }

    /// Re-run the bulk load. Subscriptions are left as they are.
    pub async fn refresh(&self) -> bool {
        self.loader.fetch_all().await
    }

    /// Unsubscribe from every feed. Cached and in-memory data are kept.
    pub async fn shutdown(&self) -> ReconcilerStats {
        match self.subscriptions.take() {
            Some(set) => set.close().await,
            None => ReconcilerStats::default(),
        }
    }

    /// Whether live subscriptions are currently installed.
    pub fn is_subscribed(&self) -> bool {
        self.subscriptions.is_active()
    }

    pub fn read(&self, collection: Collection) -> Snapshot {
        self.store.read(collection)
    }

    pub fn watch(&self, collection: Collection) -> watch::Receiver<Snapshot> {
        self.store.watch(collection)
    }

    pub fn orders(&self) -> Snapshot {
        self.store.read(Collection::Orders)
    }

    pub fn order_items(&self) -> Snapshot {
        self.store.read(Collection::OrderItems)
    }

    pub fn customers(&self) -> Snapshot {
        self.store.read(Collection::Customers)
    }

    pub fn products(&self) -> Snapshot {
        self.store.read(Collection::Products)
    }

    /// Live view of orders with `expand.customer` attached.
    pub fn orders_with_customers(&self) -> JoinedView {
        JoinedView::between(&self.store, Collection::Orders, Collection::Customers, "customer")
    }

    /// Live view of order items with `expand.product` attached.
    pub fn order_items_with_products(&self) -> JoinedView {
        JoinedView::between(
            &self.store,
            Collection::OrderItems,
            Collection::Products,
            "product",
        )
    }

    /// The current order items belonging to `order_id`.
    pub fn order_items_for_order(&self, order_id: &str) -> Vec<Record> {
        self.store
            .read(Collection::OrderItems)
            .iter()
            .filter(|item| item.str_field("order") == Some(order_id))
            .cloned()
            .collect()
    }

    pub fn sync_state(&self) -> SyncState {
        self.store.sync_state()
    }

    pub fn watch_sync_state(&self) -> watch::Receiver<SyncState> {
        self.store.watch_sync_state()
    }

    pub fn phase(&self, collection: Collection) -> SyncPhase {
        self.store.phase(collection)
    }

    /// The underlying store, for observers that need more than the helpers.
    pub fn store(&self) -> &CollectionStore {
        &self.store
    }
}
