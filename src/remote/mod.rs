//! Remote collection service - the authoritative source the replica mirrors.
//!
//! The service is an opaque collaborator exposing three operations:
//!
//! ```text
//!   list(collection, page, per_page, {expand, sort}) -> ListPage
//!   get_one(collection, id, {expand})                -> Record
//!   subscribe(collection, topic, handler)            -> Subscription
//! ```
//!
//! [`InMemoryRemote`] implements it for tests and embedding.

mod error;
mod in_memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::record::{Collection, Record};

pub use error::RemoteError;
pub use in_memory::{InMemoryRemote, RemoteOp};

/// Options for a list request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Comma-separated relations to expand, e.g. `"customer"`.
    pub expand: Option<String>,
    /// Sort expression, e.g. `"-created"` for newest first.
    pub sort: Option<String>,
}

impl ListOptions {
    /// The options the replica uses to bulk load `collection`.
    pub fn for_collection(collection: Collection) -> Self {
        Self {
            expand: collection.relation().map(|r| r.field.to_string()),
            sort: collection.default_sort().map(str::to_string),
        }
    }
}

/// Options for a single-record request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub expand: Option<String>,
}

impl GetOptions {
    /// The options the replica uses to re-fetch a record of `collection`.
    pub fn for_collection(collection: Collection) -> Self {
        Self {
            expand: collection.relation().map(|r| r.field.to_string()),
        }
    }
}

/// One page of a list response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    pub page: u32,
    pub per_page: u32,
    /// Total matching records on the server, when the service reports it.
    #[serde(default)]
    pub total_items: Option<u64>,
    pub items: Vec<Record>,
}

/// What happened to a record on the remote side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    Create,
    Update,
    Delete,
}

/// A change notification from a collection feed.
///
/// The record may be partial (e.g. without expansions).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RemoteEvent {
    pub action: EventAction,
    pub record: Record,
}

impl RemoteEvent {
    pub fn new(action: EventAction, record: Record) -> Self {
        Self { action, record }
    }

    pub fn create(record: Record) -> Self {
        Self::new(EventAction::Create, record)
    }

    pub fn update(record: Record) -> Self {
        Self::new(EventAction::Update, record)
    }

    pub fn delete(record: Record) -> Self {
        Self::new(EventAction::Delete, record)
    }
}

/// Callback invoked by the service for every event on a subscribed feed.
pub type EventHandler = Arc<dyn Fn(RemoteEvent) + Send + Sync>;

/// A live subscription. Dropping it without unsubscribing leaves it up to
/// the service whether events keep flowing.
pub trait Subscription: Send {
    /// Detach the handler from the feed.
    fn unsubscribe(&mut self) -> Result<(), RemoteError>;
}

/// Trait for the remote collection service.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Fetch one page of a collection.
    async fn list(
        &self,
        collection: Collection,
        page: u32,
        per_page: u32,
        options: &ListOptions,
    ) -> Result<ListPage, RemoteError>;

    /// Fetch one record by id.
    async fn get_one(
        &self,
        collection: Collection,
        id: &str,
        options: &GetOptions,
    ) -> Result<Record, RemoteError>;

    /// Register `handler` for change events on `collection`.
    async fn subscribe(
        &self,
        collection: Collection,
        topic: &str,
        handler: EventHandler,
    ) -> Result<Box<dyn Subscription>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bulk_load_options_follow_collection() {
        assert_eq!(
            ListOptions::for_collection(Collection::Orders),
            ListOptions {
                expand: Some("customer".into()),
                sort: Some("-created".into()),
            }
        );
        assert_eq!(
            ListOptions::for_collection(Collection::OrderItems),
            ListOptions {
                expand: Some("product".into()),
                sort: None,
            }
        );
        assert_eq!(
            ListOptions::for_collection(Collection::Customers).expand,
            None
        );
        assert_eq!(
            ListOptions::for_collection(Collection::Products),
            ListOptions::default()
        );
    }

    #[test]
    fn event_decodes_from_feed_json() {
        let event: RemoteEvent = serde_json::from_value(json!({
            "action": "update",
            "record": { "id": "o1", "status": "paid" }
        }))
        .unwrap();
        assert_eq!(event.action, EventAction::Update);
        assert_eq!(event.record.id(), "o1");
    }

    #[test]
    fn event_with_unknown_action_is_rejected() {
        let result: Result<RemoteEvent, _> = serde_json::from_value(json!({
            "action": "archive",
            "record": { "id": "o1" }
        }));
        assert!(result.is_err());
    }
}
