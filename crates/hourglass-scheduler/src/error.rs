use hourglass_core::DueTime;
use thiserror::Error;

/// Errors that can occur within the scheduling engine.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A submitted event was due before the current second. Such events are
    /// dropped and only ever reported through the log.
    #[error("event due at {due} is in the past (now {now})")]
    PastDue { due: DueTime, now: DueTime },

    /// `serve` was called on an engine whose session has already been used.
    #[error("scheduler has already been started")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
