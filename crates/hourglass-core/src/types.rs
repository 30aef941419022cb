use std::fmt;
use std::sync::Arc;

/// Delivery time of an event, in whole seconds since the Unix epoch.
pub type DueTime = u64;

/// Identifier assigned by a payload store on insert. Never reused.
pub type PayloadId = u64;

/// A due-time that never arrives.
///
/// Stands in for "nothing pending" wherever a concrete due-time is required.
/// Queues silently refuse to store it.
pub const NEVER: DueTime = 9_999_999_999;

/// Opaque event data. Cloning shares the underlying bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Payload(Arc<[u8]>);

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(Arc::from(bytes.into()))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) => write!(f, "Payload({s:?})"),
            Err(_) => write!(f, "Payload({} bytes)", self.0.len()),
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Self(Arc::from(bytes))
    }
}

impl From<String> for Payload {
    fn from(s: String) -> Self {
        Self::new(s.into_bytes())
    }
}

impl From<&str> for Payload {
    fn from(s: &str) -> Self {
        Self::from(s.as_bytes())
    }
}

impl AsRef<[u8]> for Payload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A payload paired with the second it should be delivered at.
///
/// Only exists in transit: the scheduler splits it into a stored payload,
/// an index entry and a queued due-time on ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub due: DueTime,
    pub payload: Payload,
}

impl Event {
    pub fn new(due: DueTime, payload: impl Into<Payload>) -> Self {
        Self {
            due,
            payload: payload.into(),
        }
    }
}

/// Lifecycle of a scheduler's control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Not started yet, or fully shut down after cancellation.
    #[default]
    Idle,
    /// Scanning the queue for the first due-time that is not in the past.
    Initializing,
    /// Timer armed; reacting to expiry, submissions and cancellation.
    Active,
    /// Cancellation observed; handing state back and closing delivery.
    Terminating,
}

impl EngineState {
    /// True while a control loop exists that will consume notifications.
    pub fn is_serving(self) -> bool {
        matches!(self, EngineState::Initializing | EngineState::Active)
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Idle => "idle",
            EngineState::Initializing => "initializing",
            EngineState::Active => "active",
            EngineState::Terminating => "terminating",
        };
        write!(f, "{s}")
    }
}
