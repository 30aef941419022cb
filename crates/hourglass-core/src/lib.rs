//! `hourglass-core` — types, configuration and clock helpers shared by every
//! hourglass crate.

pub mod clock;
pub mod config;
pub mod error;
pub mod types;

pub use config::{HourglassConfig, LogConfig, SchedulerConfig};
pub use error::{CoreError, Result};
pub use types::{DueTime, EngineState, Event, Payload, PayloadId, NEVER};
