//! Timestamp and delay utilities

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a settings delay in seconds to a sleep duration
///
/// Zero, negative, non-finite and unrepresentably large values yield
/// `None`.
pub fn delay_from_seconds(seconds: f64) -> Option<Duration> {
    if seconds > 0.0 {
        Duration::try_from_secs_f64(seconds).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_positive_delay() {
        assert_eq!(delay_from_seconds(1.5), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_zero_and_negative_delay_are_none() {
        assert_eq!(delay_from_seconds(0.0), None);
        assert_eq!(delay_from_seconds(-5.0), None);
    }

    #[test]
    fn test_non_finite_delay_is_none() {
        assert_eq!(delay_from_seconds(f64::NAN), None);
        assert_eq!(delay_from_seconds(f64::INFINITY), None);
    }

    #[test]
    fn test_huge_delay_is_none() {
        assert_eq!(delay_from_seconds(1e20), None);
        assert_eq!(delay_from_seconds(f64::MAX), None);
    }
}
