use serde::{Deserialize, Serialize};
use std::fmt;

/// The collections mirrored by the replica.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Orders,
    OrderItems,
    Customers,
    Products,
}

/// A foreign key from one collection into another.
///
/// `field` names both the foreign-key field on the base record and the key
/// under `expand` where the related record is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Relation {
    pub field: &'static str,
    pub target: Collection,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Orders,
        Collection::OrderItems,
        Collection::Customers,
        Collection::Products,
    ];

    /// Name used by the remote service and in cache keys.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Orders => "orders",
            Collection::OrderItems => "order_items",
            Collection::Customers => "customers",
            Collection::Products => "products",
        }
    }

    /// Stable position of the collection, used for fixed-size tables.
    pub(crate) fn index(self) -> usize {
        match self {
            Collection::Orders => 0,
            Collection::OrderItems => 1,
            Collection::Customers => 2,
            Collection::Products => 3,
        }
    }

    /// Sort requested on bulk load. Orders and customers come newest-first.
    pub fn default_sort(self) -> Option<&'static str> {
        match self {
            Collection::Orders | Collection::Customers => Some("-created"),
            Collection::OrderItems | Collection::Products => None,
        }
    }

    /// The relation expanded on fetch, if any.
    pub fn relation(self) -> Option<Relation> {
        match self {
            Collection::Orders => Some(Relation {
                field: "customer",
                target: Collection::Customers,
            }),
            Collection::OrderItems => Some(Relation {
                field: "product",
                target: Collection::Products,
            }),
            Collection::Customers | Collection::Products => None,
        }
    }

    /// Look a collection up by its remote name.
    pub fn from_name(name: &str) -> Option<Collection> {
        Collection::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for c in Collection::ALL {
            assert_eq!(Collection::from_name(c.name()), Some(c));
        }
        assert_eq!(Collection::from_name("invoices"), None);
    }

    #[test]
    fn indexes_are_distinct() {
        let mut seen: Vec<usize> = Collection::ALL.iter().map(|c| c.index()).collect();
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3]);
    }

    #[test]
    fn relations_point_at_lookup_collections() {
        assert_eq!(Collection::Orders.relation().unwrap().target, Collection::Customers);
        assert_eq!(Collection::OrderItems.relation().unwrap().field, "product");
        assert!(Collection::Customers.relation().is_none());
        assert!(Collection::Products.relation().is_none());
    }
}
