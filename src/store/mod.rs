//! Collection Store - reactive in-memory containers for the replica.
//!
//! Each collection lives in a `tokio::sync::watch` channel holding an
//! immutable [`Snapshot`]. `replace` swaps the whole snapshot, so observers
//! never see a half-applied change; every higher-level edit is a
//! read-copy-modify-replace.

mod phase;

pub use phase::SyncPhase;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::record::{Collection, Record};

/// An immutable view of one collection at a point in time.
pub type Snapshot = Arc<Vec<Record>>;

/// Process-wide state of the most recent bulk load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncState {
    pub is_loading: bool,
    pub last_sync: Option<DateTime<Utc>>,
}

struct StoreInner {
    collections: [watch::Sender<Snapshot>; 4],
    phases: watch::Sender<[SyncPhase; 4]>,
    state: watch::Sender<SyncState>,
}

/// Reactive containers for every [`Collection`] plus the sync state.
///
/// Clone-friendly: clones share the same containers.
#[derive(Clone)]
pub struct CollectionStore {
    inner: Arc<StoreInner>,
}

impl Default for CollectionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectionStore {
    /// Create a store with every collection empty.
    pub fn new() -> Self {
        let empty = || watch::Sender::new(Snapshot::default());
        Self {
            inner: Arc::new(StoreInner {
                collections: [empty(), empty(), empty(), empty()],
                phases: watch::Sender::new([SyncPhase::Empty; 4]),
                state: watch::Sender::new(SyncState::default()),
            }),
        }
    }

    fn sender(&self, collection: Collection) -> &watch::Sender<Snapshot> {
        &self.inner.collections[collection.index()]
    }

    /// Current snapshot of a collection.
    pub fn read(&self, collection: Collection) -> Snapshot {
        self.sender(collection).borrow().clone()
    }

    /// Overwrite a collection and notify observers.
    pub fn replace(&self, collection: Collection, records: Vec<Record>) {
        self.sender(collection).send_replace(Arc::new(records));
    }

    /// Observe a collection. The receiver starts at the current snapshot.
    pub fn watch(&self, collection: Collection) -> watch::Receiver<Snapshot> {
        self.sender(collection).subscribe()
    }

    pub fn sync_state(&self) -> SyncState {
        *self.inner.state.borrow()
    }

    pub fn set_loading(&self, is_loading: bool) {
        self.inner.state.send_modify(|state| state.is_loading = is_loading);
    }

    pub fn set_last_sync(&self, last_sync: Option<DateTime<Utc>>) {
        self.inner.state.send_modify(|state| state.last_sync = last_sync);
    }

    pub fn watch_sync_state(&self) -> watch::Receiver<SyncState> {
        self.inner.state.subscribe()
    }

    pub fn phase(&self, collection: Collection) -> SyncPhase {
        self.inner.phases.borrow()[collection.index()]
    }

    pub fn set_phase(&self, collection: Collection, phase: SyncPhase) {
        self.inner
            .phases
            .send_modify(|phases| phases[collection.index()] = phase);
    }

    /// Phases of every collection, in [`Collection::ALL`] order.
    pub fn phases(&self) -> [SyncPhase; 4] {
        *self.inner.phases.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(id: &str) -> Record {
        Record::from_value(json!({ "id": id })).unwrap()
    }

    #[test]
    fn starts_empty() {
        let store = CollectionStore::new();
        for c in Collection::ALL {
            assert!(store.read(c).is_empty());
            assert_eq!(store.phase(c), SyncPhase::Empty);
        }
        assert_eq!(store.sync_state(), SyncState::default());
    }

    #[test]
    fn replace_is_a_full_overwrite() {
        let store = CollectionStore::new();
        store.replace(Collection::Orders, vec![rec("o1"), rec("o2")]);
        store.replace(Collection::Orders, vec![rec("o3")]);

        let orders = store.read(Collection::Orders);
        let ids: Vec<&str> = orders.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["o3"]);
        assert!(store.read(Collection::OrderItems).is_empty());
    }

    #[test]
    fn old_snapshots_are_not_mutated() {
        let store = CollectionStore::new();
        store.replace(Collection::Products, vec![rec("p1")]);
        let before = store.read(Collection::Products);

        store.replace(Collection::Products, vec![rec("p2"), rec("p1")]);

        assert_eq!(before.len(), 1);
        assert_eq!(store.read(Collection::Products).len(), 2);
    }

    #[tokio::test]
    async fn watchers_see_replacements() {
        let store = CollectionStore::new();
        let mut rx = store.watch(Collection::Customers);

        store.replace(Collection::Customers, vec![rec("c1")]);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update()[0].id(), "c1");
    }

    #[test]
    fn sync_state_fields_update_independently() {
        let store = CollectionStore::new();
        let at = Utc::now();
        store.set_loading(true);
        store.set_last_sync(Some(at));
        store.set_loading(false);

        assert_eq!(
            store.sync_state(),
            SyncState {
                is_loading: false,
                last_sync: Some(at)
            }
        );
    }

    #[test]
    fn clone_shares_containers() {
        let store = CollectionStore::new();
        let clone = store.clone();
        store.replace(Collection::Orders, vec![rec("o1")]);
        store.set_phase(Collection::Orders, SyncPhase::Synced);

        assert_eq!(clone.read(Collection::Orders).len(), 1);
        assert_eq!(clone.phase(Collection::Orders), SyncPhase::Synced);
    }
}
