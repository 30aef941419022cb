use thiserror::Error;

/// Conditions reported by an [`crate::EventQueue`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// No due-times are pending. Expected whenever the scheduler is idle.
    #[error("the queue is empty")]
    Empty,
}

pub type Result<T> = std::result::Result<T, QueueError>;
