//! `hourglass-store` — the three collaborators behind the scheduler.
//!
//! | Trait              | In-memory implementation   | Holds                              |
//! |--------------------|----------------------------|------------------------------------|
//! | [`EventQueue`]     | [`HeapQueue`]              | distinct pending due-times         |
//! | [`PayloadStore`]   | [`InMemoryPayloadStore`]   | payloads by sequence id            |
//! | [`TimestampIndex`] | [`InMemoryTimestampIndex`] | payload ids per due-time, in order |
//!
//! All implementations are internally synchronised and meant to be shared
//! behind an `Arc`.

pub mod error;
pub mod index;
pub mod payload;
pub mod queue;

pub use error::{QueueError, Result};
pub use index::{InMemoryTimestampIndex, TimestampIndex};
pub use payload::{InMemoryPayloadStore, PayloadStore};
pub use queue::{EventQueue, HeapQueue};
