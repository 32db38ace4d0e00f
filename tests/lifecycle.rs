//! Startup, restart and shutdown of a replica.

mod support;

use replica_rust::{Collection, FileBlobStore, RemoteOp, SyncEngine, SyncPhase};
use support::{customer, engine, ids, order, shop};

#[tokio::test]
async fn cold_start_loads_everything_with_relations() {
    let remote = shop();
    let (engine, _) = engine(&remote);

    let init = engine.initialize();
    assert!(!init.has_cached_data);
    assert!(engine.orders().is_empty());

    assert!(init.startup.wait().await);

    let orders = engine.orders_with_customers().current();
    assert_eq!(ids(&orders), vec!["o2", "o1"]);
    for order in &orders {
        let customer = order.expanded("customer").expect("customer attached");
        assert_eq!(Some(customer.id()), order.str_field("customer"));
    }
    assert_eq!(engine.customers().len(), 3);
    assert!(!engine.sync_state().is_loading);
    assert!(engine.sync_state().last_sync.is_some());

    engine.shutdown().await;
}

#[tokio::test]
async fn restart_hydrates_from_cache_before_network() {
    let remote = shop();
    let (first, blobs) = engine(&remote);
    assert!(first.initialize().startup.wait().await);
    first.shutdown().await;
    let synced_at = first.sync_state().last_sync;

    // The second process starts offline.
    remote.fail(RemoteOp::List, Collection::Orders);
    let second = SyncEngine::new(remote.clone(), blobs);

    let init = second.initialize();
    assert!(init.has_cached_data);
    assert_eq!(second.orders(), first.orders());
    assert_eq!(second.order_items(), first.order_items());
    assert_eq!(second.sync_state().last_sync, synced_at);
    assert_eq!(second.phase(Collection::Orders), SyncPhase::Hydrated);

    assert!(!init.startup.wait().await);
    assert_eq!(second.orders(), first.orders());
    assert_eq!(second.phase(Collection::Orders), SyncPhase::Hydrated);
    second.shutdown().await;
}

#[tokio::test]
async fn shutdown_keeps_data_and_stops_events() {
    let remote = shop();
    let (engine, blobs) = engine(&remote);
    assert!(engine.initialize().startup.wait().await);

    engine.shutdown().await;
    remote.create(Collection::Customers, customer("c4", "Barbara"));

    assert_eq!(engine.customers().len(), 3);
    assert_eq!(engine.orders().len(), 2);
    assert!(blobs.raw_get("np_orders").is_some());
    for collection in Collection::ALL {
        assert_eq!(remote.subscriber_count(collection), 0);
    }
}

#[tokio::test]
async fn refresh_picks_up_changes_missed_while_offline() {
    let remote = shop();
    let (engine, _) = engine(&remote);
    assert!(engine.initialize().startup.wait().await);
    engine.shutdown().await;

    remote.seed(
        Collection::Orders,
        vec![order("o3", "c3", "2024-04-01 09:00:00")],
    );
    assert!(engine.refresh().await);

    assert_eq!(ids(&engine.orders()), vec!["o3"]);
    assert_eq!(
        engine.orders()[0].expanded("customer").unwrap().id(),
        "c3"
    );
}

#[tokio::test]
async fn file_cache_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let remote = shop();

    let first = SyncEngine::new(remote.clone(), FileBlobStore::open(dir.path()).unwrap());
    assert!(first.initialize().startup.wait().await);
    first.shutdown().await;

    let second = SyncEngine::new(remote, FileBlobStore::open(dir.path()).unwrap());
    assert!(second.hydrate());
    assert_eq!(second.products(), first.products());
    assert_eq!(second.sync_state().last_sync, first.sync_state().last_sync);
}
