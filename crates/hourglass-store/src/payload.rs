use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use hourglass_core::{Payload, PayloadId};
use tracing::{debug, instrument};

/// Repository of payloads keyed by a store-assigned sequence number.
pub trait PayloadStore: Send + Sync {
    /// Store `payload` and return its freshly assigned id.
    fn insert(&self, payload: Payload) -> PayloadId;

    /// Look up a payload; `None` when it was never stored or has been deleted.
    fn get(&self, id: PayloadId) -> Option<Payload>;

    /// Remove a payload. Unknown ids are ignored.
    fn delete(&self, id: PayloadId);

    /// Number of payloads currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`PayloadStore`].
///
/// Ids come from an atomic counter starting at 1, so concurrent inserts never
/// share an id and deleted ids are never handed out again.
#[derive(Debug, Default)]
pub struct InMemoryPayloadStore {
    seq: AtomicU64,
    storage: DashMap<PayloadId, Payload>,
}

impl InMemoryPayloadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PayloadStore for InMemoryPayloadStore {
    #[instrument(skip(self, payload))]
    fn insert(&self, payload: Payload) -> PayloadId {
        let id = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.storage.insert(id, payload);
        debug!(id, "stored payload");
        id
    }

    #[instrument(skip(self))]
    fn get(&self, id: PayloadId) -> Option<Payload> {
        match self.storage.get(&id) {
            Some(entry) => {
                debug!("found payload");
                Some(entry.value().clone())
            }
            None => {
                debug!("no payload under this id");
                None
            }
        }
    }

    #[instrument(skip(self))]
    fn delete(&self, id: PayloadId) {
        if self.storage.remove(&id).is_some() {
            debug!("deleted payload");
        } else {
            debug!("tried to delete missing payload");
        }
    }

    fn len(&self) -> usize {
        self.storage.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn get_returns_inserted_payload() {
        let store = InMemoryPayloadStore::new();
        let id = store.insert(Payload::from("hello"));
        assert_eq!(store.get(id), Some(Payload::from("hello")));
    }

    #[test]
    fn delete_removes_only_target() {
        let store = InMemoryPayloadStore::new();
        store.insert(Payload::from("hello1"));
        let id2 = store.insert(Payload::from("hello2"));
        let id3 = store.insert(Payload::from("hello3"));
        store.delete(id2);
        assert_eq!(store.get(id2), None);
        assert_eq!(store.get(id3), Some(Payload::from("hello3")));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn deleting_missing_id_is_noop() {
        let store = InMemoryPayloadStore::new();
        store.delete(99);
        assert!(store.is_empty());
    }

    #[test]
    fn ids_increase_and_are_not_reused() {
        let store = InMemoryPayloadStore::new();
        let a = store.insert(Payload::from("a"));
        store.delete(a);
        let b = store.insert(Payload::from("b"));
        assert!(b > a);
        assert_eq!(store.get(a), None);
    }

    #[test]
    fn concurrent_inserts_get_distinct_ids() {
        let store = Arc::new(InMemoryPayloadStore::new());
        let ids: Vec<PayloadId> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|t| {
                    let store = Arc::clone(&store);
                    s.spawn(move || {
                        (0..250)
                            .map(|i| {
                                let id = store.insert(Payload::from(format!("{t}-{i}")));
                                // interleave deletes of earlier ids with the inserts
                                if i % 2 == 0 {
                                    store.delete(id.saturating_sub(1));
                                }
                                id
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), 2_000);
        let max = ids.iter().copied().max().unwrap();
        assert_eq!(max, 2_000);
    }
}
