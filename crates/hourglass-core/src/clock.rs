//! Wall-clock helpers shared by the scheduler and its callers.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::types::DueTime;

/// Upper bound on any computed delay (~30 years), so timer arithmetic never
/// overflows for far-off due-times such as [`crate::NEVER`].
pub const MAX_DELAY: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Current Unix time truncated to whole seconds.
pub fn now_secs() -> DueTime {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

/// True when `due` is strictly earlier than the current second.
pub fn is_past(due: DueTime) -> bool {
    due < now_secs()
}

/// Time left until the start of second `due`, measured from `now`.
///
/// Zero for due-times already reached; capped at [`MAX_DELAY`].
pub fn delay_until_from(due: DueTime, now: DateTime<Utc>) -> Duration {
    let Some(target) = i64::try_from(due)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    else {
        return MAX_DELAY;
    };
    (target - now)
        .to_std()
        .map(|d| d.min(MAX_DELAY))
        .unwrap_or(Duration::ZERO)
}

/// Time left until the start of second `due`.
pub fn delay_until(due: DueTime) -> Duration {
    delay_until_from(due, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn delay_for_future_second() {
        let now = Utc.timestamp_opt(1_000, 250_000_000).unwrap();
        assert_eq!(delay_until_from(1_002, now), Duration::from_millis(1_750));
    }

    #[test]
    fn past_and_current_seconds_have_no_delay() {
        let now = Utc.timestamp_opt(1_000, 500_000_000).unwrap();
        assert_eq!(delay_until_from(1_000, now), Duration::ZERO);
        assert_eq!(delay_until_from(10, now), Duration::ZERO);
    }

    #[test]
    fn sentinel_delay_is_capped() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        assert_eq!(delay_until_from(crate::NEVER, now), MAX_DELAY);
        assert_eq!(delay_until_from(u64::MAX, now), MAX_DELAY);
    }

    #[test]
    fn past_check_uses_whole_seconds() {
        let now = now_secs();
        assert!(is_past(now - 5));
        assert!(!is_past(now + 5));
    }
}
