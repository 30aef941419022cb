use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use hourglass_core::{DueTime, PayloadId};
use tracing::{debug, instrument};

/// Maps a due-time to the payload ids due at that second, in append order.
pub trait TimestampIndex: Send + Sync {
    /// Add `id` to the slot for `due`, creating the slot on first use.
    fn append(&self, due: DueTime, id: PayloadId);

    /// Ids recorded for `due`, or `None` if the slot does not exist.
    fn get(&self, due: DueTime) -> Option<Vec<PayloadId>>;

    /// Drop the whole slot for `due`.
    fn delete(&self, due: DueTime);

    /// Remove the slot for `due` and return its ids in one step.
    fn take(&self, due: DueTime) -> Option<Vec<PayloadId>>;
}

/// In-memory [`TimestampIndex`] behind a single read/write lock.
#[derive(Debug, Default)]
pub struct InMemoryTimestampIndex {
    storage: RwLock<HashMap<DueTime, Vec<PayloadId>>>,
}

impl InMemoryTimestampIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimestampIndex for InMemoryTimestampIndex {
    #[instrument(skip(self))]
    fn append(&self, due: DueTime, id: PayloadId) {
        let mut storage = self.storage.write().unwrap_or_else(PoisonError::into_inner);
        let ids = storage.entry(due).or_default();
        ids.push(id);
        debug!(count = ids.len(), "appended id to time slot");
    }

    #[instrument(skip(self))]
    fn get(&self, due: DueTime) -> Option<Vec<PayloadId>> {
        let storage = self.storage.read().unwrap_or_else(PoisonError::into_inner);
        match storage.get(&due) {
            Some(ids) => {
                debug!(count = ids.len(), "found ids for time slot");
                Some(ids.clone())
            }
            None => {
                debug!("no ids for time slot");
                None
            }
        }
    }

    #[instrument(skip(self))]
    fn delete(&self, due: DueTime) {
        if self.take(due).is_none() {
            debug!("tried to delete missing time slot");
        }
    }

    #[instrument(skip(self))]
    fn take(&self, due: DueTime) -> Option<Vec<PayloadId>> {
        let removed = self
            .storage
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&due);
        if let Some(ref ids) = removed {
            debug!(count = ids.len(), "removed time slot");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_order() {
        let index = InMemoryTimestampIndex::new();
        index.append(10, 2);
        index.append(10, 1);
        index.append(11, 3);
        assert_eq!(index.get(10), Some(vec![2, 1]));
        assert_eq!(index.get(11), Some(vec![3]));
    }

    #[test]
    fn delete_removes_slot() {
        let index = InMemoryTimestampIndex::new();
        index.append(10, 1);
        index.delete(10);
        assert_eq!(index.get(10), None);
        // deleting again is harmless
        index.delete(10);
    }

    #[test]
    fn missing_slot_is_none() {
        let index = InMemoryTimestampIndex::new();
        assert_eq!(index.get(5), None);
        assert_eq!(index.take(5), None);
    }

    #[test]
    fn take_empties_slot_and_later_appends_start_fresh() {
        let index = InMemoryTimestampIndex::new();
        index.append(7, 1);
        index.append(7, 2);
        assert_eq!(index.take(7), Some(vec![1, 2]));
        assert_eq!(index.get(7), None);
        index.append(7, 3);
        assert_eq!(index.get(7), Some(vec![3]));
    }
}
