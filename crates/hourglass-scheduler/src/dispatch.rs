use std::sync::Arc;

use hourglass_core::{DueTime, Payload, PayloadId};
use hourglass_store::PayloadStore;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Payload ids whose due-time has been reached, in index order.
#[derive(Debug)]
pub(crate) struct Batch {
    pub due: DueTime,
    pub ids: Vec<PayloadId>,
}

/// Fetch and deliver batches in the order the control loop produced them.
///
/// This task owns the only delivery sender: returning closes the delivery
/// handle, and nothing can be written to it afterwards.
pub(crate) async fn run(
    payloads: Arc<dyn PayloadStore>,
    mut batches: mpsc::UnboundedReceiver<Batch>,
    outbound: mpsc::Sender<Payload>,
) {
    while let Some(Batch { due, ids }) = batches.recv().await {
        for id in ids {
            let Some(payload) = payloads.get(id) else {
                debug!(due, id, "payload deleted before dispatch, skip");
                continue;
            };
            if outbound.send(payload).await.is_err() {
                warn!(due, id, "delivery handle dropped, stopping dispatch");
                return;
            }
        }
        debug!(due, "time slot dispatched");
    }
    debug!("no more batches, closing delivery handle");
}

#[cfg(test)]
mod tests {
    use super::*;
    use hourglass_store::InMemoryPayloadStore;

    #[tokio::test]
    async fn delivers_batches_in_order_and_skips_deleted() {
        let store = Arc::new(InMemoryPayloadStore::new());
        let a = store.insert(Payload::from("a"));
        let b = store.insert(Payload::from("b"));
        let c = store.insert(Payload::from("c"));
        store.delete(b);

        let (batch_tx, batch_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::channel(8);
        batch_tx.send(Batch { due: 1, ids: vec![c, b] }).unwrap();
        batch_tx.send(Batch { due: 2, ids: vec![a] }).unwrap();
        drop(batch_tx);

        run(store, batch_rx, out_tx).await;

        assert_eq!(out_rx.recv().await, Some(Payload::from("c")));
        assert_eq!(out_rx.recv().await, Some(Payload::from("a")));
        assert_eq!(out_rx.recv().await, None);
    }

    #[tokio::test]
    async fn stops_when_consumer_is_gone() {
        let store = Arc::new(InMemoryPayloadStore::new());
        let id = store.insert(Payload::from("x"));
        let (batch_tx, batch_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::channel(1);
        drop(out_rx);
        batch_tx.send(Batch { due: 1, ids: vec![id] }).unwrap();

        // Returns even though the batch sender is still alive.
        run(store, batch_rx, out_tx).await;
        assert!(batch_tx.is_closed());
    }
}
