use std::sync::{Arc, Mutex, PoisonError};

use hourglass_core::{clock, DueTime, EngineState, Event, Payload, SchedulerConfig};
use hourglass_store::{
    EventQueue, HeapQueue, InMemoryPayloadStore, InMemoryTimestampIndex, PayloadStore,
    TimestampIndex,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use crate::{
    control::ControlLoop,
    dispatch,
    error::{Result, SchedulerError},
};

/// A due-time handed to the control loop, acknowledged once the loop has
/// re-evaluated its timer against it.
pub(crate) struct Notification {
    pub due: DueTime,
    pub ack: oneshot::Sender<()>,
}

/// State shared by the public handle, the ingestion routine and the control
/// loop.
pub(crate) struct Core {
    pub queue: Arc<dyn EventQueue>,
    pub payloads: Arc<dyn PayloadStore>,
    pub index: Arc<dyn TimestampIndex>,
    /// Written only by the serving session.
    pub state: watch::Sender<EngineState>,
    /// Capacity 1: a submitter waits for its acknowledgement, so at most one
    /// notification is ever outstanding.
    pub notify_tx: mpsc::Sender<Notification>,
    pub shutdown: CancellationToken,
}

impl Core {
    /// Store the payload, index it and queue its due-time.
    pub fn register(&self, event: Event) -> Result<()> {
        let now = clock::now_secs();
        if event.due < now {
            return Err(SchedulerError::PastDue {
                due: event.due,
                now,
            });
        }
        let id = self.payloads.insert(event.payload);
        self.index.append(event.due, id);
        self.queue.insert(event.due);
        Ok(())
    }

    pub async fn submit(&self, event: Event) {
        let due = event.due;
        if let Err(e) = self.register(event) {
            error!("{e}, skip");
            return;
        }

        let serving = self.state.borrow().is_serving();
        if !serving {
            debug!(due, "not serving, event stays queued");
            return;
        }

        let (ack, acked) = oneshot::channel();
        if self.notify_tx.send(Notification { due, ack }).await.is_err() {
            debug!(due, "control loop stopped before notification, event stays queued");
            return;
        }
        // An error here means the loop shut down with our notification
        // unread; the due-time is still in the queue either way.
        let _ = acked.await;
    }
}

/// Receivers and senders consumed by the one serving session.
struct Session {
    inbound: mpsc::Receiver<Event>,
    outbound: mpsc::Sender<Payload>,
    notifications: mpsc::Receiver<Notification>,
}

/// Time-ordered event scheduler.
///
/// Events go in through the submission handle returned by [`Scheduler::new`]
/// and come out on the delivery handle once their second arrives. The three
/// stores are shared collaborators: a new scheduler built over the same
/// instances picks up whatever a cancelled one left behind.
pub struct Scheduler {
    core: Arc<Core>,
    session: Mutex<Option<Session>>,
}

impl Scheduler {
    /// Wire a scheduler to its stores.
    ///
    /// Returns the engine, the submission handle and the delivery handle.
    /// The delivery handle yields `None` once the engine has been cancelled.
    pub fn new(
        queue: Arc<dyn EventQueue>,
        payloads: Arc<dyn PayloadStore>,
        index: Arc<dyn TimestampIndex>,
        config: &SchedulerConfig,
    ) -> (Self, mpsc::Sender<Event>, mpsc::Receiver<Payload>) {
        let (in_tx, in_rx) = mpsc::channel(config.inbound_capacity.max(1));
        let (out_tx, out_rx) = mpsc::channel(config.outbound_capacity.max(1));
        let (notify_tx, notify_rx) = mpsc::channel(1);
        let (state, _) = watch::channel(EngineState::Idle);

        let core = Arc::new(Core {
            queue,
            payloads,
            index,
            state,
            notify_tx,
            shutdown: CancellationToken::new(),
        });
        let session = Session {
            inbound: in_rx,
            outbound: out_tx,
            notifications: notify_rx,
        };
        let scheduler = Self {
            core,
            session: Mutex::new(Some(session)),
        };
        (scheduler, in_tx, out_rx)
    }

    /// Scheduler backed by fresh in-memory stores.
    pub fn in_memory(
        config: &SchedulerConfig,
    ) -> (Self, mpsc::Sender<Event>, mpsc::Receiver<Payload>) {
        Self::new(
            Arc::new(HeapQueue::new()),
            Arc::new(InMemoryPayloadStore::new()),
            Arc::new(InMemoryTimestampIndex::new()),
            config,
        )
    }

    /// Register an event directly, bypassing the submission handle.
    ///
    /// Past-due events are logged and dropped. While serving, this waits until
    /// the control loop has taken the new due-time into account.
    pub async fn submit(&self, event: Event) {
        self.core.submit(event).await;
    }

    /// Start the serving session on the current Tokio runtime.
    ///
    /// Spawns the ingestion routine, the dispatcher and the control loop, and
    /// returns the control loop's handle. It completes after [`cancel`] once
    /// the delivery handle has been closed.
    ///
    /// Closing waits for the dispatcher to hand over batches already fired,
    /// so completion depends on the consumer draining the delivery handle. A
    /// consumer that stops reading while the delivery buffer is full keeps
    /// the handle pending; dropping the delivery receiver releases it.
    ///
    /// [`cancel`]: Scheduler::cancel
    pub fn serve(&self) -> Result<JoinHandle<()>> {
        let session = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(SchedulerError::AlreadyStarted)?;

        // Flip state before the control loop scans the queue: any submission
        // that misses the scan is guaranteed to see a serving engine and notify.
        self.core.state.send_replace(EngineState::Initializing);

        let span = info_span!("scheduler", session_id = %Uuid::now_v7());
        let _entered = span.enter();
        info!("scheduler starting");

        let ingestion = tokio::spawn(
            ingest(Arc::clone(&self.core), session.inbound).instrument(span.clone()),
        );
        let (batch_tx, batch_rx) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(
            dispatch::run(Arc::clone(&self.core.payloads), batch_rx, session.outbound)
                .instrument(span.clone()),
        );
        let control = ControlLoop {
            core: Arc::clone(&self.core),
            notifications: session.notifications,
            batches: batch_tx,
            dispatcher,
            ingestion,
        };
        Ok(tokio::spawn(control.run().instrument(span.clone())))
    }

    /// Ask the serving session to stop. Does nothing when not serving.
    pub fn cancel(&self) {
        let state = *self.core.state.borrow();
        if state.is_serving() {
            info!("cancel requested");
            self.core.shutdown.cancel();
        } else {
            debug!(%state, "not serving, cancel ignored");
        }
    }

    pub fn state(&self) -> EngineState {
        *self.core.state.borrow()
    }

    /// Watch engine state transitions.
    pub fn subscribe(&self) -> watch::Receiver<EngineState> {
        self.core.state.subscribe()
    }
}

/// Drain the submission handle into the engine.
///
/// On cancellation the handle is closed and anything already buffered is
/// registered without notifying, so it waits in the stores for a restart.
async fn ingest(core: Arc<Core>, mut inbound: mpsc::Receiver<Event>) {
    loop {
        tokio::select! {
            biased;
            () = core.shutdown.cancelled() => break,
            event = inbound.recv() => match event {
                Some(event) => core.submit(event).await,
                None => {
                    debug!("submission handle closed, ingestion finished");
                    return;
                }
            },
        }
    }

    inbound.close();
    let mut kept = 0usize;
    while let Some(event) = inbound.recv().await {
        match core.register(event) {
            Ok(()) => kept += 1,
            Err(e) => error!("{e}, skip"),
        }
    }
    info!(kept, "ingestion stopped");
}
