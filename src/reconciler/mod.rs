//! Event Reconciler - applies remote change events to the replica.
//!
//! Each collection gets one subscription and one worker task. The
//! subscription handler only enqueues; the worker drains the queue one event
//! at a time, so all writes for a collection go through a single writer and
//! no update is lost to an interleaved read-modify-write.
//!
//! ```text
//!  remote feed ──handler──► mpsc queue ──► worker ──► store.replace ──► cache
//!   (per collection)                      (one task)   (in memory)     (after)
//! ```

pub mod delta;

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::Cache;
use crate::config::SyncConfig;
use crate::record::{Collection, Record};
use crate::remote::{
    EventAction, EventHandler, GetOptions, RemoteEvent, RemoteService, Subscription,
};
use crate::store::CollectionStore;

/// What applying one event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The collection was changed and persisted.
    Applied,
    /// Nothing to do (delete of a record the replica does not hold).
    Ignored,
    /// The event was dropped because the full record could not be fetched.
    Dropped,
}

/// Counters reported when a subscription set is closed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerStats {
    pub applied: usize,
    pub ignored: usize,
    pub dropped: usize,
}

impl ReconcilerStats {
    fn record(&mut self, outcome: ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied => self.applied += 1,
            ApplyOutcome::Ignored => self.ignored += 1,
            ApplyOutcome::Dropped => self.dropped += 1,
        }
    }

    pub fn merge(&mut self, other: ReconcilerStats) {
        self.applied += other.applied;
        self.ignored += other.ignored;
        self.dropped += other.dropped;
    }
}

/// Applies create/update/delete events to the store and the cache.
#[derive(Clone)]
pub struct EventReconciler {
    remote: Arc<dyn RemoteService>,
    store: CollectionStore,
    cache: Cache,
    topic: String,
}

impl EventReconciler {
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
            topic: config.topic().to_string(),
        }
    }

    /// Apply one event to `collection`.
    ///
    /// Callers must not apply events for the same collection concurrently;
    /// [`subscribe_all`](Self::subscribe_all) guarantees this by giving each
    /// collection a single worker.
    pub async fn apply(&self, collection: Collection, event: RemoteEvent) -> ApplyOutcome {
        let next = match event.action {
            EventAction::Delete => {
                let current = self.store.read(collection);
                match delta::remove(&current, event.record.id()) {
                    Some(next) => next,
                    None => {
                        debug!(%collection, id = event.record.id(), "delete for unknown record");
                        return ApplyOutcome::Ignored;
                    }
                }
            }
            action => {
                let Some(record) = self.resolve(collection, event.record).await else {
                    return ApplyOutcome::Dropped;
                };
                let current = self.store.read(collection);
                if action == EventAction::Create {
                    delta::insert_front(&current, record)
                } else {
                    delta::upsert(&current, record)
                }
            }
        };

        self.store.replace(collection, next);
        self.cache
            .save_collection(collection, &self.store.read(collection));
        ApplyOutcome::Applied
    }

    /// The record to store for a create/update event.
    ///
    /// Collections with a relation are re-fetched with the relation expanded,
    /// since event payloads carry only the bare record.
    async fn resolve(&self, collection: Collection, record: Record) -> Option<Record> {
        if collection.relation().is_none() {
            return Some(record);
        }

        let options = GetOptions::for_collection(collection);
        match self.remote.get_one(collection, record.id(), &options).await {
            Ok(full) => Some(full),
            Err(e) => {
                warn!(%collection, id = record.id(), error = %e, "dropping event, fetch failed");
                None
            }
        }
    }

    /// Subscribe to every collection feed and start one worker per feed.
    ///
    /// A collection whose subscribe call fails is logged and skipped.
    pub async fn subscribe_all(&self) -> SubscriptionSet {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut set = SubscriptionSet {
            feeds: Vec::new(),
            workers: Vec::new(),
            stop_tx,
        };

        for collection in Collection::ALL {
            let (tx, rx) = mpsc::unbounded_channel();
            let handler: EventHandler = Arc::new(move |event: RemoteEvent| {
                // Closed only after the worker stopped; late events are moot.
                let _ = tx.send(event);
            });

            match self.remote.subscribe(collection, &self.topic, handler).await {
                Ok(feed) => {
                    let worker = self.clone().run_worker(collection, rx, stop_rx.clone());
                    set.feeds.push((collection, feed));
                    set.workers.push(tokio::spawn(worker));
                }
                Err(e) => error!(%collection, error = %e, "failed to subscribe"),
            }
        }

        info!(feeds = set.feeds.len(), "subscribed to remote changes");
        set
    }

    async fn run_worker(
        self,
        collection: Collection,
        mut events: mpsc::UnboundedReceiver<RemoteEvent>,
        mut stop: watch::Receiver<bool>,
    ) -> ReconcilerStats {
        let mut stats = ReconcilerStats::default();

        loop {
            // Queued events are drained before a stop is honoured.
            let event = tokio::select! {
                biased;
                event = events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = stop.changed() => break,
            };

            debug!(%collection, action = ?event.action, id = event.record.id(), "remote event");
            stats.record(self.apply(collection, event).await);
        }

        stats
    }
}

/// The live subscriptions of one replica, with their workers.
///
/// Owned by the engine; closing it stops future events without touching any
/// data. Dropping it unsubscribes as well but does not wait for workers.
pub struct SubscriptionSet {
    feeds: Vec<(Collection, Box<dyn Subscription>)>,
    workers: Vec<JoinHandle<ReconcilerStats>>,
    stop_tx: watch::Sender<bool>,
}

impl SubscriptionSet {
    /// Collections with a live feed.
    pub fn collections(&self) -> Vec<Collection> {
        self.feeds.iter().map(|(c, _)| *c).collect()
    }

    pub fn len(&self) -> usize {
        self.feeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    /// Unsubscribe every feed, let workers finish queued events, and report.
    pub async fn close(mut self) -> ReconcilerStats {
        self.unsubscribe_all();
        let _ = self.stop_tx.send(true);

        let mut stats = ReconcilerStats::default();
        for worker in std::mem::take(&mut self.workers) {
            match worker.await {
                Ok(worker_stats) => stats.merge(worker_stats),
                Err(e) => error!(error = %e, "reconciler worker failed"),
            }
        }

        info!(
            applied = stats.applied,
            ignored = stats.ignored,
            dropped = stats.dropped,
            "unsubscribed from remote changes"
        );
        stats
    }

    fn unsubscribe_all(&mut self) {
        for (collection, mut feed) in self.feeds.drain(..) {
            if let Err(e) = feed.unsubscribe() {
                error!(%collection, error = %e, "failed to unsubscribe");
            }
        }
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.unsubscribe_all();
        let _ = self.stop_tx.send(true);
    }
}
