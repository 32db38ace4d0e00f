//! Joined views - read-only collections with related records attached.
//!
//! A joined view is a pure function of two snapshots: each base record gets
//! `expand.<field>` set to the related record whose id equals the base's
//! foreign key, or `null`. Nothing is stored; [`JoinedView`] recomputes from
//! the latest snapshots whenever either input changes.

use std::collections::HashMap;

use tokio::sync::watch;

use crate::record::{Collection, Record};
use crate::store::{CollectionStore, Snapshot};

/// Attach to every base record the related record named by `field`.
///
/// Ids are assumed unique; if they are not, the first match wins. Base
/// records whose foreign key is missing or not a string get `null`.
pub fn join_related(base: &[Record], related: &[Record], field: &str) -> Vec<Record> {
    let mut by_id: HashMap<&str, &Record> = HashMap::with_capacity(related.len());
    for record in related {
        by_id.entry(record.id()).or_insert(record);
    }

    base.iter()
        .map(|record| {
            let found = record
                .str_field(field)
                .and_then(|key| by_id.get(key).copied());
            record.with_expanded(field, found)
        })
        .collect()
}

/// Orders with `expand.customer` attached.
pub fn orders_with_customers(orders: &[Record], customers: &[Record]) -> Vec<Record> {
    join_related(orders, customers, "customer")
}

/// Order items with `expand.product` attached.
pub fn order_items_with_products(order_items: &[Record], products: &[Record]) -> Vec<Record> {
    join_related(order_items, products, "product")
}

/// A live join of a base collection with its related collection.
pub struct JoinedView {
    field: &'static str,
    base: watch::Receiver<Snapshot>,
    related: watch::Receiver<Snapshot>,
}

impl JoinedView {
    /// Join `base` with the collection its relation points at.
    ///
    /// Returns `None` for collections without a relation.
    pub fn new(store: &CollectionStore, base: Collection) -> Option<Self> {
        let relation = base.relation()?;
        Some(Self::between(store, base, relation.target, relation.field))
    }

    pub(crate) fn between(
        store: &CollectionStore,
        base: Collection,
        related: Collection,
        field: &'static str,
    ) -> Self {
        Self {
            field,
            base: store.watch(base),
            related: store.watch(related),
        }
    }

    /// The view computed from the latest snapshots.
    pub fn current(&mut self) -> Vec<Record> {
        let base = self.base.borrow_and_update().clone();
        let related = self.related.borrow_and_update().clone();
        join_related(&base, &related, self.field)
    }

    /// Wait until either input changes, then return the recomputed view.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Vec<Record>> {
        tokio::select! {
            res = self.base.changed() => res.ok()?,
            res = self.related.changed() => res.ok()?,
        }
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn rec(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    #[test]
    fn attaches_matching_related_record() {
        let customers = vec![
            rec(json!({ "id": "c1", "name": "Ada" })),
            rec(json!({ "id": "c2", "name": "Grace" })),
        ];
        let orders = vec![rec(json!({ "id": "o1", "customer": "c2" }))];

        let joined = orders_with_customers(&orders, &customers);

        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].expanded("customer"), Some(customers[1].clone()));
    }

    #[test]
    fn unmatched_or_missing_key_yields_null() {
        let products = vec![rec(json!({ "id": "p1" }))];
        let items = vec![
            rec(json!({ "id": "i1", "product": "p9" })),
            rec(json!({ "id": "i2" })),
            rec(json!({ "id": "i3", "product": 17 })),
        ];

        let joined = order_items_with_products(&items, &products);

        for item in &joined {
            assert_eq!(item.expand().unwrap().get("product"), Some(&Value::Null));
        }
    }

    #[test]
    fn first_match_wins_on_duplicate_ids() {
        let customers = vec![
            rec(json!({ "id": "c1", "name": "first" })),
            rec(json!({ "id": "c1", "name": "second" })),
        ];
        let orders = vec![rec(json!({ "id": "o1", "customer": "c1" }))];

        let joined = orders_with_customers(&orders, &customers);
        let customer = joined[0].expanded("customer").unwrap();
        assert_eq!(customer.str_field("name"), Some("first"));
    }

    #[test]
    fn keeps_existing_expand_entries_and_order() {
        let orders = vec![
            rec(json!({ "id": "o2", "customer": "c1", "expand": { "shipment": { "id": "s1" } } })),
            rec(json!({ "id": "o1", "customer": "c1" })),
        ];
        let customers = vec![rec(json!({ "id": "c1" }))];

        let joined = orders_with_customers(&orders, &customers);

        let ids: Vec<&str> = joined.iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["o2", "o1"]);
        assert_eq!(joined[0].expanded("shipment").unwrap().id(), "s1");
        assert!(joined[0].expanded("customer").is_some());
    }

    #[test]
    fn no_view_for_collections_without_relation() {
        let store = CollectionStore::new();
        assert!(JoinedView::new(&store, Collection::Customers).is_none());
        assert!(JoinedView::new(&store, Collection::Orders).is_some());
    }

    #[tokio::test]
    async fn recomputes_when_related_collection_changes() {
        let store = CollectionStore::new();
        store.replace(
            Collection::Orders,
            vec![rec(json!({ "id": "o1", "customer": "c1" }))],
        );
        let mut view = JoinedView::new(&store, Collection::Orders).unwrap();
        assert!(view.current()[0].expanded("customer").is_none());

        store.replace(Collection::Customers, vec![rec(json!({ "id": "c1" }))]);

        let updated = view.changed().await.unwrap();
        assert_eq!(updated[0].expanded("customer").unwrap().id(), "c1");
    }
}
