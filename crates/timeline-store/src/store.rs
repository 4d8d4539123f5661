use timeline_protocol::{MutationEnvelope, MutationType, TimelineEntry};
use tracing::trace;

use crate::error::{Result, StoreError};

/// Outcome of a successful [`MessageStore::apply`], with the affected index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted { index: usize },
    Replaced { index: usize },
    Deleted { index: usize },
}

/// Ordered, id-unique list of timeline entries.
///
/// Not synchronised; the owner serialises access (the gateway keeps it
/// behind a mutex together with the apply-and-relay step).
#[derive(Debug, Default, Clone)]
pub struct MessageStore {
    entries: Vec<TimelineEntry>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one mutation.
    ///
    /// Deleting an unknown `id` returns [`StoreError::NotFound`] and leaves
    /// the store untouched.
    pub fn apply(&mut self, envelope: &MutationEnvelope) -> Result<Applied> {
        let position = self.position(envelope.id);

        let applied = match (envelope.kind, position) {
            (MutationType::Delete, Some(index)) => {
                self.entries.remove(index);
                Applied::Deleted { index }
            }
            (MutationType::Delete, None) => {
                return Err(StoreError::NotFound { id: envelope.id });
            }
            (MutationType::Upsert, Some(index)) => {
                self.entries[index] = envelope.to_entry();
                Applied::Replaced { index }
            }
            (MutationType::Upsert, None) => {
                self.entries.push(envelope.to_entry());
                Applied::Inserted {
                    index: self.entries.len() - 1,
                }
            }
        };

        trace!(id = envelope.id, ?applied, len = self.entries.len(), "mutation applied");
        Ok(applied)
    }

    pub fn get(&self, id: i64) -> Option<&TimelineEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, title: &str) -> TimelineEntry {
        TimelineEntry {
            id,
            start_date: "2020".into(),
            end_date: "2021".into(),
            title: title.into(),
            description: String::new(),
        }
    }

    fn ids(store: &MessageStore) -> Vec<i64> {
        store.entries().iter().map(|e| e.id).collect()
    }

    #[test]
    fn upsert_appends_new_ids_in_order() {
        let mut store = MessageStore::new();
        for id in [3, 1, 2] {
            store.apply(&MutationEnvelope::upsert(entry(id, "x"))).unwrap();
        }
        assert_eq!(ids(&store), vec![3, 1, 2]);
    }

    #[test]
    fn repeated_id_is_replaced_in_place() {
        let mut store = MessageStore::new();
        store.apply(&MutationEnvelope::upsert(entry(1, "a"))).unwrap();
        store.apply(&MutationEnvelope::upsert(entry(2, "b"))).unwrap();
        store.apply(&MutationEnvelope::upsert(entry(3, "c"))).unwrap();

        let applied = store.apply(&MutationEnvelope::upsert(entry(2, "B"))).unwrap();
        assert_eq!(applied, Applied::Replaced { index: 1 });
        assert_eq!(ids(&store), vec![1, 2, 3]);
        assert_eq!(store.get(2).unwrap().title, "B");
    }

    #[test]
    fn one_entry_per_distinct_id() {
        let mut store = MessageStore::new();
        let seq = [5, 1, 5, 7, 1, 1, 9, 7];
        for (n, id) in seq.iter().enumerate() {
            store
                .apply(&MutationEnvelope::upsert(entry(*id, &n.to_string())))
                .unwrap();
        }
        assert_eq!(ids(&store), vec![5, 1, 7, 9]);
        // last write wins
        assert_eq!(store.get(1).unwrap().title, "5");
        assert_eq!(store.get(7).unwrap().title, "7");
    }

    #[test]
    fn identical_upsert_is_idempotent() {
        let mut store = MessageStore::new();
        let env = MutationEnvelope::upsert(entry(1, "same"));
        store.apply(&env).unwrap();
        let before = store.entries().to_vec();
        store.apply(&env).unwrap();
        assert_eq!(store.entries(), before.as_slice());
    }

    #[test]
    fn delete_preserves_relative_order() {
        let mut store = MessageStore::new();
        for id in 1..=5 {
            store.apply(&MutationEnvelope::upsert(entry(id, "x"))).unwrap();
        }
        let applied = store.apply(&MutationEnvelope::delete(3)).unwrap();
        assert_eq!(applied, Applied::Deleted { index: 2 });
        assert_eq!(ids(&store), vec![1, 2, 4, 5]);
    }

    #[test]
    fn delete_unknown_id_is_not_found_and_noop() {
        let mut store = MessageStore::new();
        store.apply(&MutationEnvelope::upsert(entry(1, "a"))).unwrap();
        store.apply(&MutationEnvelope::upsert(entry(2, "b"))).unwrap();

        let err = store.apply(&MutationEnvelope::delete(99)).unwrap_err();
        assert_eq!(err, StoreError::NotFound { id: 99 });
        assert_eq!(ids(&store), vec![1, 2]);
    }

    #[test]
    fn delete_on_empty_store_is_not_found() {
        let mut store = MessageStore::new();
        assert!(store.apply(&MutationEnvelope::delete(1)).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn reinsert_after_delete_goes_to_the_end() {
        let mut store = MessageStore::new();
        for id in 1..=3 {
            store.apply(&MutationEnvelope::upsert(entry(id, "x"))).unwrap();
        }
        store.apply(&MutationEnvelope::delete(1)).unwrap();
        store.apply(&MutationEnvelope::upsert(entry(1, "back"))).unwrap();
        assert_eq!(ids(&store), vec![2, 3, 1]);
    }

    #[test]
    fn concrete_three_frame_scenario() {
        let mut store = MessageStore::new();
        let frames: [&[u8]; 3] = [
            br#"{"id":1,"title":"t1","start_date":"2020","end_date":"2021","type":"UPSERT"}"#,
            br#"{"id":1,"title":"t2","start_date":"2020","end_date":"2021"}"#,
            br#"{"id":1,"type":"DELETE"}"#,
        ];

        store.apply(&MutationEnvelope::parse(frames[0]).unwrap()).unwrap();
        assert_eq!(store.entries()[0].title, "t1");

        let applied = store.apply(&MutationEnvelope::parse(frames[1]).unwrap()).unwrap();
        assert_eq!(applied, Applied::Replaced { index: 0 });
        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].title, "t2");

        store.apply(&MutationEnvelope::parse(frames[2]).unwrap()).unwrap();
        assert!(store.is_empty());
        assert_eq!(serde_json::to_string(store.entries()).unwrap(), "[]");
    }
}
