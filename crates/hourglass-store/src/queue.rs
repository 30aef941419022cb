use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use hourglass_core::{DueTime, NEVER};
use tracing::debug;

use crate::error::{QueueError, Result};

/// Ordered set of pending due-times.
///
/// Each distinct due-time is held at most once; events sharing a second are
/// told apart by the [`crate::TimestampIndex`], not here.
pub trait EventQueue: Send + Sync {
    /// Register `due`. Already-present values and [`NEVER`] are ignored.
    fn insert(&self, due: DueTime);

    /// Remove and return the earliest pending due-time.
    fn next(&self) -> Result<DueTime>;

    /// Number of distinct pending due-times.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Min-heap with a membership set kept in lock-step for O(1) duplicate checks.
#[derive(Debug, Default)]
struct UniqueHeap {
    heap: BinaryHeap<Reverse<DueTime>>,
    members: HashSet<DueTime>,
}

impl UniqueHeap {
    fn push(&mut self, due: DueTime) -> bool {
        if !self.members.insert(due) {
            return false;
        }
        self.heap.push(Reverse(due));
        true
    }

    fn pop(&mut self) -> Option<DueTime> {
        let Reverse(due) = self.heap.pop()?;
        self.members.remove(&due);
        Some(due)
    }

    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// In-memory [`EventQueue`] guarded by a single mutex.
#[derive(Debug, Default)]
pub struct HeapQueue {
    inner: Mutex<UniqueHeap>,
}

impl HeapQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a queue from existing due-times, e.g. ones recovered from
    /// another queue. Duplicates collapse and [`NEVER`] is dropped.
    pub fn from_due_times(from: impl IntoIterator<Item = DueTime>) -> Self {
        let mut heap = UniqueHeap::default();
        for due in from.into_iter().filter(|due| *due != NEVER) {
            heap.push(due);
        }
        debug!(len = heap.len(), "initiated heap queue from existing due-times");
        Self {
            inner: Mutex::new(heap),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UniqueHeap> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EventQueue for HeapQueue {
    fn insert(&self, due: DueTime) {
        if due == NEVER {
            debug!("tried to add the never due-time, skip");
            return;
        }
        if self.lock().push(due) {
            debug!(due, "added due-time to queue");
        } else {
            debug!(due, "due-time already queued");
        }
    }

    fn next(&self) -> Result<DueTime> {
        match self.lock().pop() {
            Some(due) => {
                debug!(due, "took next due-time from queue");
                Ok(due)
            }
            None => {
                debug!("queue is empty, nothing to return");
                Err(QueueError::Empty)
            }
        }
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn drain(queue: &HeapQueue) -> Vec<DueTime> {
        std::iter::from_fn(|| queue.next().ok()).collect()
    }

    #[test]
    fn extracts_in_non_decreasing_order() {
        let queue = HeapQueue::new();
        for due in [42, 7, 19, 3, 100, 8, 55, 1] {
            queue.insert(due);
        }
        let out = drain(&queue);
        assert_eq!(out, vec![1, 3, 7, 8, 19, 42, 55, 100]);
        assert!(out.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn duplicate_insert_is_extracted_once() {
        let queue = HeapQueue::new();
        queue.insert(10);
        queue.insert(10);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.next(), Ok(10));
        assert_eq!(queue.next(), Err(QueueError::Empty));
    }

    #[test]
    fn never_is_rejected() {
        let queue = HeapQueue::new();
        queue.insert(NEVER);
        assert!(queue.is_empty());
        queue.insert(5);
        queue.insert(NEVER);
        assert_eq!(drain(&queue), vec![5]);
    }

    #[test]
    fn value_can_be_requeued_after_extraction() {
        let queue = HeapQueue::new();
        queue.insert(4);
        assert_eq!(queue.next(), Ok(4));
        queue.insert(4);
        assert_eq!(queue.next(), Ok(4));
    }

    #[test]
    fn seeded_queue_collapses_duplicates() {
        let queue = HeapQueue::from_due_times([3, 5, 3, NEVER]);
        queue.insert(0);
        queue.insert(6);
        queue.insert(0);
        assert_eq!(drain(&queue), vec![0, 3, 5, 6]);
    }

    #[test]
    fn concurrent_extraction_hands_out_each_value_once() {
        let queue = Arc::new(HeapQueue::from_due_times(1..=200));
        let mut taken: Vec<DueTime> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let queue = Arc::clone(&queue);
                    s.spawn(move || std::iter::from_fn(|| queue.next().ok()).collect::<Vec<_>>())
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap())
                .collect()
        });
        taken.sort_unstable();
        assert_eq!(taken, (1..=200).collect::<Vec<_>>());
    }
}
