//! In-memory remote service for testing and single-process scenarios.
//!
//! Emulates the parts of a collection server the replica relies on:
//! - server-side sort (`"-created"`, `"name"`) and pagination
//! - relation expansion (`expand=customer`)
//! - change feeds with `*` or per-record topics
//! - scripted failures per operation and collection

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{
    EventHandler, GetOptions, ListOptions, ListPage, RemoteError, RemoteEvent, RemoteService,
    Subscription,
};
use crate::record::{Collection, Record};

/// Operations that can be scripted to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    List,
    GetOne,
    Subscribe,
    Unsubscribe,
}

struct Subscriber {
    id: u64,
    topic: String,
    handler: EventHandler,
}

#[derive(Default)]
struct RemoteState {
    records: HashMap<Collection, Vec<Record>>,
    subscribers: HashMap<Collection, Vec<Subscriber>>,
    failures: HashSet<(RemoteOp, Collection)>,
    calls: HashMap<RemoteOp, usize>,
    next_subscription: u64,
}

/// In-memory remote collection service.
///
/// Thread-safe and clone-friendly: clones share records and subscribers, so
/// a test can keep a handle to mutate the "server" while the replica holds
/// another.
///
/// ## Example
///
/// ```
/// use replica_rust::{Collection, InMemoryRemote, Record};
/// use serde_json::json;
///
/// let remote = InMemoryRemote::new().with_records(
///     Collection::Customers,
///     vec![Record::from_value(json!({ "id": "c1", "name": "Ada" })).unwrap()],
/// );
/// assert_eq!(remote.records(Collection::Customers).len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryRemote {
    state: Arc<RwLock<RemoteState>>,
    get_latency: Option<Duration>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection (no events are emitted).
    pub fn with_records(self, collection: Collection, records: Vec<Record>) -> Self {
        self.seed(collection, records);
        self
    }

    /// Delay every `get_one` response, to widen race windows in tests.
    pub fn with_get_latency(mut self, latency: Duration) -> Self {
        self.get_latency = Some(latency);
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, RemoteState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RemoteState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace a collection's records without emitting events.
    pub fn seed(&self, collection: Collection, records: Vec<Record>) {
        self.write().records.insert(collection, records);
    }

    /// Records currently held by the service, in insertion order.
    pub fn records(&self, collection: Collection) -> Vec<Record> {
        self.read()
            .records
            .get(&collection)
            .cloned()
            .unwrap_or_default()
    }

    /// Add a record and notify subscribers with a `create` event.
    pub fn create(&self, collection: Collection, record: Record) {
        self.write()
            .records
            .entry(collection)
            .or_default()
            .push(record.clone());
        self.emit(collection, RemoteEvent::create(record));
    }

    /// Replace (or add) a record and notify subscribers with an `update` event.
    pub fn update(&self, collection: Collection, record: Record) {
        {
            let mut state = self.write();
            let records = state.records.entry(collection).or_default();
            match records.iter().position(|r| r.id() == record.id()) {
                Some(index) => records[index] = record.clone(),
                None => records.push(record.clone()),
            }
        }
        self.emit(collection, RemoteEvent::update(record));
    }

    /// Remove a record and notify subscribers with a `delete` event.
    ///
    /// Returns false (and emits nothing) if the record did not exist.
    pub fn delete(&self, collection: Collection, id: &str) -> bool {
        let removed = {
            let mut state = self.write();
            let records = state.records.entry(collection).or_default();
            records
                .iter()
                .position(|r| r.id() == id)
                .map(|index| records.remove(index))
        };
        match removed {
            Some(record) => {
                self.emit(collection, RemoteEvent::delete(record));
                true
            }
            None => false,
        }
    }

    /// Deliver an event to matching subscribers without touching the data.
    ///
    /// Handlers run on the caller's thread, outside the state lock.
    pub fn emit(&self, collection: Collection, event: RemoteEvent) {
        let handlers: Vec<EventHandler> = self
            .read()
            .subscribers
            .get(&collection)
            .map(|subs| {
                subs.iter()
                    .filter(|s| s.topic == "*" || s.topic == event.record.id())
                    .map(|s| Arc::clone(&s.handler))
                    .collect()
            })
            .unwrap_or_default();

        for handler in handlers {
            handler(event.clone());
        }
    }

    /// Make `op` on `collection` fail until [`recover`](Self::recover) is called.
    pub fn fail(&self, op: RemoteOp, collection: Collection) {
        self.write().failures.insert((op, collection));
    }

    pub fn recover(&self, op: RemoteOp, collection: Collection) {
        self.write().failures.remove(&(op, collection));
    }

    /// Number of live subscriptions on a collection.
    pub fn subscriber_count(&self, collection: Collection) -> usize {
        self.read()
            .subscribers
            .get(&collection)
            .map_or(0, Vec::len)
    }

    /// Number of times `op` has been called.
    pub fn call_count(&self, op: RemoteOp) -> usize {
        self.read().calls.get(&op).copied().unwrap_or(0)
    }

    fn begin(&self, op: RemoteOp, collection: Collection) -> Result<(), RemoteError> {
        let mut state = self.write();
        *state.calls.entry(op).or_insert(0) += 1;
        if state.failures.contains(&(op, collection)) {
            return Err(RemoteError::ConnectionFailed(format!(
                "{:?} {} unavailable",
                op, collection
            )));
        }
        Ok(())
    }

    fn expand(state: &RemoteState, collection: Collection, record: &Record, expand: &str) -> Record {
        let Some(relation) = collection.relation() else {
            return record.clone();
        };
        if !expand.split(',').any(|f| f.trim() == relation.field) {
            return record.clone();
        }
        let related = record.str_field(relation.field).and_then(|key| {
            state
                .records
                .get(&relation.target)
                .and_then(|targets| targets.iter().find(|t| t.id() == key))
        });
        match related {
            Some(related) => record.with_expanded(relation.field, Some(related)),
            None => record.clone(),
        }
    }
}

/// Order two records by a sort expression like `"-created,name"`.
fn compare_by(sort: &str, a: &Record, b: &Record) -> Ordering {
    for key in sort.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        let (field, descending) = match key.strip_prefix('-') {
            Some(field) => (field, true),
            None => (key.strip_prefix('+').unwrap_or(key), false),
        };
        let ordering = compare_values(a.get(field), b.get(field));
        let ordering = if descending { ordering.reverse() } else { ordering };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RemoteService for InMemoryRemote {
    async fn list(
        &self,
        collection: Collection,
        page: u32,
        per_page: u32,
        options: &ListOptions,
    ) -> Result<ListPage, RemoteError> {
        self.begin(RemoteOp::List, collection)?;

        let state = self.read();
        let mut records = state.records.get(&collection).cloned().unwrap_or_default();
        if let Some(sort) = &options.sort {
            records.sort_by(|a, b| compare_by(sort, a, b));
        }

        let total = records.len();
        let skip = (page.max(1) as usize - 1) * per_page as usize;
        let items = records
            .iter()
            .skip(skip)
            .take(per_page as usize)
            .map(|r| match &options.expand {
                Some(expand) => Self::expand(&state, collection, r, expand),
                None => r.clone(),
            })
            .collect();

        Ok(ListPage {
            page: page.max(1),
            per_page,
            total_items: Some(total as u64),
            items,
        })
    }

    async fn get_one(
        &self,
        collection: Collection,
        id: &str,
        options: &GetOptions,
    ) -> Result<Record, RemoteError> {
        self.begin(RemoteOp::GetOne, collection)?;
        if let Some(latency) = self.get_latency {
            tokio::time::sleep(latency).await;
        }

        let state = self.read();
        let record = state
            .records
            .get(&collection)
            .and_then(|records| records.iter().find(|r| r.id() == id))
            .ok_or_else(|| RemoteError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        Ok(match &options.expand {
            Some(expand) => Self::expand(&state, collection, record, expand),
            None => record.clone(),
        })
    }

    async fn subscribe(
        &self,
        collection: Collection,
        topic: &str,
        handler: EventHandler,
    ) -> Result<Box<dyn Subscription>, RemoteError> {
        self.begin(RemoteOp::Subscribe, collection)?;

        let mut state = self.write();
        state.next_subscription += 1;
        let id = state.next_subscription;
        state.subscribers.entry(collection).or_default().push(Subscriber {
            id,
            topic: topic.to_string(),
            handler,
        });

        Ok(Box::new(InMemorySubscription {
            remote: Arc::downgrade(&self.state),
            collection,
            id,
        }))
    }
}

struct InMemorySubscription {
    remote: Weak<RwLock<RemoteState>>,
    collection: Collection,
    id: u64,
}

impl Subscription for InMemorySubscription {
    fn unsubscribe(&mut self) -> Result<(), RemoteError> {
        let Some(remote) = self.remote.upgrade() else {
            return Ok(());
        };
        let mut state = remote.write().unwrap_or_else(PoisonError::into_inner);
        *state.calls.entry(RemoteOp::Unsubscribe).or_insert(0) += 1;
        if state
            .failures
            .contains(&(RemoteOp::Unsubscribe, self.collection))
        {
            return Err(RemoteError::ConnectionFailed(format!(
                "Unsubscribe {} unavailable",
                self.collection
            )));
        }
        if let Some(subs) = state.subscribers.get_mut(&self.collection) {
            subs.retain(|s| s.id != self.id);
        }
        Ok(())
    }
}
