//! A local-first replica of four remote record collections.
//!
//! ```text
//!                 ┌──────────── SyncEngine ────────────┐
//!   cache ──hydrate──► CollectionStore ◄── BulkLoader ◄──── remote list
//!     ▲                     │   ▲                            │
//!     └──── persist ────────┘   └──── EventReconciler ◄──── remote feed
//!                           │
//!                           └──► JoinedView (expand.customer / expand.product)
//! ```

mod cache;
mod config;
mod engine;
mod loader;
mod reconciler;
mod record;
mod remote;
mod store;
mod view;

#[cfg(feature = "fs")]
pub use cache::FileBlobStore;
pub use cache::{BlobStore, Cache, CacheError, InMemoryBlobStore};
pub use config::{SyncConfig, DEFAULT_KEY_PREFIX, DEFAULT_PAGE_SIZE, DEFAULT_TOPIC};
pub use engine::{Initialized, StartupHandle, SyncEngine};
pub use loader::BulkLoader;
pub use reconciler::delta;
pub use reconciler::{ApplyOutcome, EventReconciler, ReconcilerStats, SubscriptionSet};
pub use record::{Collection, Record, RecordError, Relation, EXPAND_FIELD};
pub use remote::{
    EventAction, EventHandler, GetOptions, InMemoryRemote, ListOptions, ListPage, RemoteError,
    RemoteEvent, RemoteOp, RemoteService, Subscription,
};
pub use store::{CollectionStore, Snapshot, SyncPhase, SyncState};
pub use view::{join_related, order_items_with_products, orders_with_customers, JoinedView};
