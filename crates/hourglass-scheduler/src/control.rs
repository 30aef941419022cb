//! The control loop: tracks the nearest due-time and reacts to timer expiry,
//! new submissions and cancellation.

use std::sync::Arc;

use hourglass_core::{clock, DueTime, EngineState, NEVER};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, warn};

use crate::dispatch::Batch;
use crate::engine::{Core, Notification};

pub(crate) struct ControlLoop {
    pub core: Arc<Core>,
    pub notifications: mpsc::Receiver<Notification>,
    pub batches: mpsc::UnboundedSender<Batch>,
    pub dispatcher: JoinHandle<()>,
    pub ingestion: JoinHandle<()>,
}

impl ControlLoop {
    pub async fn run(self) {
        let ControlLoop {
            core,
            mut notifications,
            batches,
            dispatcher,
            ingestion,
        } = self;

        let mut next_due = first_due(&core);
        core.state.send_replace(EngineState::Active);
        info!(next_due, "serving");

        let timer = sleep_until(deadline(next_due));
        tokio::pin!(timer);

        loop {
            tokio::select! {
                // Disarmed while idling on the sentinel.
                () = &mut timer, if next_due != NEVER => {
                    fire(&core, &batches, next_due);
                    next_due = core.queue.next().unwrap_or_else(|_| {
                        warn!("queue is empty, now serving with no events in queue");
                        NEVER
                    });
                    timer.as_mut().reset(deadline(next_due));
                }
                Some(Notification { due, ack }) = notifications.recv() => {
                    if due <= next_due {
                        core.queue.insert(next_due);
                        next_due = core.queue.next().unwrap_or(NEVER);
                        // Resetting replaces the old deadline, so a stale
                        // expiry can never be observed afterwards.
                        timer.as_mut().reset(deadline(next_due));
                        info!(due, next_due, "new event moved the next due-time");
                    } else {
                        info!(due, next_due, "new event added without changing next due-time");
                    }
                    let _ = ack.send(());
                }
                () = core.shutdown.cancelled() => break,
            }
        }

        info!(next_due, "cancel serving");
        core.state.send_replace(EngineState::Terminating);
        if next_due != NEVER {
            core.queue.insert(next_due);
        }

        // Unread notifications refer to due-times that are already queued.
        drop(notifications);
        // The dispatcher finishes the batches it was given, then drops the
        // only delivery sender, which closes the delivery handle.
        drop(batches);
        if let Err(e) = dispatcher.await {
            error!("dispatcher task failed: {e}");
        }
        if let Err(e) = ingestion.await {
            error!("ingestion task failed: {e}");
        }

        core.state.send_replace(EngineState::Idle);
        info!("scheduler stopped");
    }
}

/// Pull due-times until one is not in the past. Past ones are discarded.
fn first_due(core: &Core) -> DueTime {
    loop {
        match core.queue.next() {
            Err(_) => {
                info!("start serving with no events in queue");
                return NEVER;
            }
            Ok(due) if clock::is_past(due) => {
                warn!(due, "due-time is in the past, trying next");
            }
            Ok(due) => return due,
        }
    }
}

/// Hand the ids indexed under `due` to the dispatcher.
fn fire(core: &Core, batches: &mpsc::UnboundedSender<Batch>, due: DueTime) {
    let Some(ids) = core.index.take(due) else {
        warn!(due, "due-time reached with nothing indexed under it");
        return;
    };
    info!(due, count = ids.len(), "due-time reached");
    if batches.send(Batch { due, ids }).is_err() {
        warn!(due, "dispatcher stopped, time slot not delivered");
    }
}

fn deadline(due: DueTime) -> Instant {
    Instant::now() + clock::delay_until(due)
}
