//! Pure sequence edits applied for remote events.
//!
//! Every function takes the current snapshot by reference and returns a new
//! sequence; the caller swaps it in with a single `replace`.

use crate::record::Record;

/// Put `record` at index 0, dropping any older copy with the same id.
pub fn insert_front(current: &[Record], record: Record) -> Vec<Record> {
    let mut next = Vec::with_capacity(current.len() + 1);
    next.extend(current.iter().filter(|r| r.id() != record.id()).cloned());
    next.insert(0, record);
    next
}

/// Replace the record with the same id in place, or insert it at the front.
pub fn upsert(current: &[Record], record: Record) -> Vec<Record> {
    match current.iter().position(|r| r.id() == record.id()) {
        Some(index) => {
            let mut next = current.to_vec();
            next[index] = record;
            next
        }
        None => insert_front(current, record),
    }
}

/// Drop the record with `id`. Returns `None` when there was nothing to drop.
pub fn remove(current: &[Record], id: &str) -> Option<Vec<Record>> {
    if !current.iter().any(|r| r.id() == id) {
        return None;
    }
    Some(current.iter().filter(|r| r.id() != id).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(id: &str, status: &str) -> Record {
        Record::from_value(json!({ "id": id, "status": status })).unwrap()
    }

    fn ids(records: &[Record]) -> Vec<&str> {
        records.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn insert_front_puts_record_first() {
        let current = vec![rec("a", "x"), rec("b", "x")];
        let next = insert_front(&current, rec("c", "new"));
        assert_eq!(ids(&next), vec!["c", "a", "b"]);
    }

    #[test]
    fn insert_front_never_duplicates_ids() {
        let current = vec![rec("a", "x"), rec("b", "old")];
        let next = insert_front(&current, rec("b", "new"));
        assert_eq!(ids(&next), vec!["b", "a"]);
        assert_eq!(next[0].str_field("status"), Some("new"));
    }

    #[test]
    fn upsert_preserves_position() {
        let current = vec![rec("a", "x"), rec("b", "old"), rec("c", "x")];
        let next = upsert(&current, rec("b", "new"));
        assert_eq!(ids(&next), vec!["a", "b", "c"]);
        assert_eq!(next[1].str_field("status"), Some("new"));
    }

    #[test]
    fn upsert_unknown_record_inserts_at_front() {
        let current = vec![rec("a", "x")];
        let next = upsert(&current, rec("z", "late"));
        assert_eq!(ids(&next), vec!["z", "a"]);
    }

    #[test]
    fn upsert_is_idempotent() {
        let current = vec![rec("a", "x"), rec("b", "old")];
        let once = upsert(&current, rec("b", "new"));
        let twice = upsert(&once, rec("b", "new"));
        assert_eq!(once, twice);

        let unknown_once = upsert(&current, rec("z", "late"));
        let unknown_twice = upsert(&unknown_once, rec("z", "late"));
        assert_eq!(unknown_once, unknown_twice);
    }

    #[test]
    fn remove_drops_matching_record() {
        let current = vec![rec("a", "x"), rec("b", "x")];
        assert_eq!(ids(&remove(&current, "a").unwrap()), vec!["b"]);
        assert!(remove(&current, "missing").is_none());
    }
}
