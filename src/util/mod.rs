//! Utility module
//!
//! This module provides small helpers used for display throughout the
//! library and the binary.

use std::time::Duration;

/// Rounds a duration to the nearest microsecond
pub fn round_micros(duration: Duration) -> Duration {
    let micros = (duration.as_nanos() + 500) / 1000;
    Duration::from_micros(u64::try_from(micros).unwrap_or(u64::MAX))
}

/// Converts a floating-point number of seconds to a duration
pub fn secs_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_micros() {
        assert_eq!(round_micros(Duration::from_nanos(42_499_999)), Duration::from_micros(42_500));
        assert_eq!(round_micros(Duration::from_nanos(1_499)), Duration::from_micros(1));
        assert_eq!(round_micros(Duration::from_nanos(1_500)), Duration::from_micros(2));
        assert_eq!(round_micros(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_secs_conversion() {
        assert_eq!(secs_to_duration(1.5), Some(Duration::from_millis(1500)));
        assert_eq!(secs_to_duration(-1.0), None);
        assert_eq!(secs_to_duration(f64::NAN), None);
    }
}
