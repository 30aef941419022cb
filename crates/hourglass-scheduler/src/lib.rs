//! `hourglass-scheduler` — Tokio-based engine that delivers payloads at their
//! due second.
//!
//! # Overview
//!
//! A [`Scheduler`] owns one serving session made of three tasks:
//!
//! | Task         | Role                                                           |
//! |--------------|----------------------------------------------------------------|
//! | ingestion    | drains the submission handle into the stores                   |
//! | control loop | keeps a timer armed for the nearest due-time                   |
//! | dispatcher   | fetches payloads for expired due-times and sends them in order |
//!
//! ```rust,no_run
//! use hourglass_core::{clock, Event, SchedulerConfig};
//! use hourglass_scheduler::Scheduler;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (scheduler, events, mut deliveries) = Scheduler::in_memory(&SchedulerConfig::default());
//!     let handle = scheduler.serve().unwrap();
//!
//!     events.send(Event::new(clock::now_secs() + 1, "hello")).await.unwrap();
//!     println!("{:?}", deliveries.recv().await);
//!
//!     scheduler.cancel();
//!     handle.await.unwrap();
//! }
//! ```

mod control;
mod dispatch;
pub mod engine;
pub mod error;

pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
