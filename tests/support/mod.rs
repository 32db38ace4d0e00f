//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::time::Duration;

use replica_rust::{Collection, InMemoryBlobStore, InMemoryRemote, Record, SyncEngine};
use serde_json::{json, Value};

pub fn rec(value: Value) -> Record {
    Record::from_value(value).expect("fixture records are objects with ids")
}

pub fn customer(id: &str, name: &str) -> Record {
    rec(json!({ "id": id, "name": name, "created": "2024-01-01 00:00:00" }))
}

pub fn product(id: &str, name: &str) -> Record {
    rec(json!({ "id": id, "name": name }))
}

pub fn order(id: &str, customer: &str, created: &str) -> Record {
    rec(json!({ "id": id, "customer": customer, "created": created }))
}

pub fn order_item(id: &str, order: &str, product: &str, qty: u32) -> Record {
    rec(json!({ "id": id, "order": order, "product": product, "qty": qty }))
}

/// A small shop: three customers, two orders, two products, three items.
pub fn shop() -> InMemoryRemote {
    InMemoryRemote::new()
        .with_records(
            Collection::Customers,
            vec![
                customer("c1", "Ada"),
                customer("c2", "Grace"),
                customer("c3", "Linus"),
            ],
        )
        .with_records(
            Collection::Orders,
            vec![
                order("o1", "c1", "2024-03-01 09:00:00"),
                order("o2", "c2", "2024-03-02 09:00:00"),
            ],
        )
        .with_records(
            Collection::Products,
            vec![product("p1", "Tea"), product("p2", "Cake")],
        )
        .with_records(
            Collection::OrderItems,
            vec![
                order_item("i1", "o1", "p1", 2),
                order_item("i2", "o1", "p2", 1),
                order_item("i3", "o2", "p1", 5),
            ],
        )
}

/// Engine over `remote` with a fresh in-memory cache.
pub fn engine(remote: &InMemoryRemote) -> (SyncEngine, InMemoryBlobStore) {
    let blobs = InMemoryBlobStore::new();
    (SyncEngine::new(remote.clone(), blobs.clone()), blobs)
}

pub fn ids(records: &[Record]) -> Vec<String> {
    records.iter().map(|r| r.id().to_string()).collect()
}

/// Poll `check` until it holds or a second has passed.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
