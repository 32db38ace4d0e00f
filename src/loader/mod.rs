//! Bulk Loader - replaces every collection with a fresh remote snapshot.
//!
//! The four list requests run concurrently and are applied all-or-nothing:
//! either every collection (and its cache snapshot) is replaced, or none is.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::cache::Cache;
use crate::config::SyncConfig;
use crate::record::{Collection, Record};
use crate::remote::{ListOptions, ListPage, RemoteError, RemoteService};
use crate::store::{CollectionStore, SyncPhase};

/// Bookkeeping shared by overlapping loads.
///
/// The loading flag and the `Syncing` phases are owned by the whole group of
/// in-flight loads: raised by the first to start, settled by the last to end.
#[derive(Default)]
struct InFlight {
    count: usize,
    /// Phases to fall back to if no load in the group succeeds.
    fallback: [SyncPhase; 4],
}

/// Fetches full snapshots of every collection.
#[derive(Clone)]
pub struct BulkLoader {
    remote: Arc<dyn RemoteService>,
    store: CollectionStore,
    cache: Cache,
    page_size: u32,
    in_flight: Arc<Mutex<InFlight>>,
}

impl BulkLoader {
    pub fn new(
        remote: Arc<dyn RemoteService>,
        store: CollectionStore,
        cache: Cache,
        config: &SyncConfig,
    ) -> Self {
        Self {
            remote,
            store,
            cache,
            page_size: config.page_size(),
            in_flight: Arc::default(),
        }
    }

    /// Fetch and apply all collections. Returns whether the load succeeded.
    ///
    /// `is_loading` is raised while any load is in flight and lowered when
    /// the last one returns. Overlapping loads never leave a phase stuck at
    /// `Syncing`.
    pub async fn fetch_all(&self) -> bool {
        self.begin();

        let ok = match self.fetch_pages().await {
            Ok(pages) => {
                let mut in_flight = self.lock();
                self.apply(pages);
                in_flight.fallback = [SyncPhase::Synced; 4];
                true
            }
            Err(e) => {
                error!(error = %e, "bulk load failed, keeping last known data");
                false
            }
        };

        self.end();
        ok
    }

    fn lock(&self) -> MutexGuard<'_, InFlight> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) {
        let mut in_flight = self.lock();
        if in_flight.count == 0 {
            in_flight.fallback = self.store.phases();
            for collection in Collection::ALL {
                self.store.set_phase(collection, SyncPhase::Syncing);
            }
            self.store.set_loading(true);
        }
        in_flight.count += 1;
    }

    fn end(&self) {
        let mut in_flight = self.lock();
        in_flight.count -= 1;
        if in_flight.count > 0 {
            return;
        }
        for collection in Collection::ALL {
            if self.store.phase(collection) == SyncPhase::Syncing {
                self.store
                    .set_phase(collection, in_flight.fallback[collection.index()]);
            }
        }
        self.store.set_loading(false);
    }

    async fn fetch_pages(&self) -> Result<[(Collection, Vec<Record>); 4], RemoteError> {
        let (orders, order_items, customers, products) = tokio::try_join!(
            self.fetch_page(Collection::Orders),
            self.fetch_page(Collection::OrderItems),
            self.fetch_page(Collection::Customers),
            self.fetch_page(Collection::Products),
        )?;

        Ok([
            (Collection::Orders, orders),
            (Collection::OrderItems, order_items),
            (Collection::Customers, customers),
            (Collection::Products, products),
        ])
    }

    async fn fetch_page(&self, collection: Collection) -> Result<Vec<Record>, RemoteError> {
        let options = ListOptions::for_collection(collection);
        let ListPage {
            items, total_items, ..
        } = self
            .remote
            .list(collection, 1, self.page_size, &options)
            .await?;

        if let Some(total) = total_items {
            if total > items.len() as u64 {
                warn!(
                    %collection,
                    total,
                    kept = items.len(),
                    "collection exceeds one page, extra records are not mirrored"
                );
            }
        }
        Ok(items)
    }

    fn apply(&self, pages: [(Collection, Vec<Record>); 4]) {
        let synced_at = Utc::now();

        for (collection, records) in pages {
            self.store.replace(collection, records);
            self.cache
                .save_collection(collection, &self.store.read(collection));
            self.store.set_phase(collection, SyncPhase::Synced);
        }
        self.cache.save_last_sync(synced_at);
        self.store.set_last_sync(Some(synced_at));

        info!(
            orders = self.store.read(Collection::Orders).len(),
            order_items = self.store.read(Collection::OrderItems).len(),
            customers = self.store.read(Collection::Customers).len(),
            products = self.store.read(Collection::Products).len(),
            "bulk load complete"
        );
    }
}
