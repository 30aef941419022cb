//! JSON-lines event input.
//!
//! Each non-blank line is one event, either absolute or relative:
//!
//! ```text
//! {"due": 1767225600, "payload": "happy new year"}
//! {"in": 5, "payload": "five seconds from now"}
//! ```

use anyhow::{bail, Context};
use hourglass_core::{DueTime, Event};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventLine {
    due: Option<DueTime>,
    #[serde(rename = "in")]
    in_secs: Option<u64>,
    payload: String,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str, now: DueTime) -> anyhow::Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let parsed: EventLine = serde_json::from_str(line).context("invalid event line")?;
    let due = match (parsed.due, parsed.in_secs) {
        (Some(due), None) => due,
        (None, Some(secs)) => now.saturating_add(secs),
        (Some(_), Some(_)) => bail!("`due` and `in` are mutually exclusive"),
        (None, None) => bail!("one of `due` or `in` is required"),
    };
    Ok(Some(Event::new(due, parsed.payload)))
}
