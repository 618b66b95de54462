//! Utility functions for the mission service

use chrono::{DateTime, Utc};

/// Wall-clock source, in milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Convert epoch milliseconds to a UTC timestamp, clamping anything chrono cannot represent to the epoch
pub fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}

/// Whole seconds elapsed between two epoch-millisecond instants.
///
/// Floors rather than rounds, and never goes negative when the clock steps back.
pub fn elapsed_whole_seconds(start_ms: i64, now_ms: i64) -> u64 {
    if now_ms <= start_ms {
        return 0;
    }
    ((now_ms - start_ms) / 1000) as u64
}

/// `HH:MM:SS`, hours not wrapped at 24
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Meters below one kilometer, kilometers with two decimals above
pub fn format_distance(meters: f64) -> String {
    if meters >= 1000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{} m", meters.round() as i64)
    }
}

/// DATETIME(3) literal as MySQL expects it, always UTC
pub fn to_db_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_whole_seconds_floors() {
        assert_eq!(elapsed_whole_seconds(0, 0), 0);
        assert_eq!(elapsed_whole_seconds(0, 999), 0);
        assert_eq!(elapsed_whole_seconds(0, 1000), 1);
        assert_eq!(elapsed_whole_seconds(0, 10_999), 10);
        assert_eq!(elapsed_whole_seconds(1_700_000_000_000, 1_700_000_061_500), 61);
    }

    #[test]
    fn test_elapsed_whole_seconds_clock_step_back() {
        assert_eq!(elapsed_whole_seconds(5000, 1000), 0);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(59), "00:00:59");
        assert_eq!(format_duration(3661), "01:01:01");
        assert_eq!(format_duration(100 * 3600), "100:00:00");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(111.19), "111 m");
        assert_eq!(format_distance(999.4), "999 m");
        assert_eq!(format_distance(1000.0), "1.00 km");
        assert_eq!(format_distance(12_346.0), "12.35 km");
    }

    #[test]
    fn test_millis_to_datetime() {
        let dt = millis_to_datetime(1_700_000_000_123);
        assert_eq!(dt.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(millis_to_datetime(i64::MAX), DateTime::<Utc>::default());
    }

    #[test]
    fn test_to_db_timestamp() {
        let dt = millis_to_datetime(1_700_000_000_123);
        assert_eq!(to_db_timestamp(&dt), "2023-11-14 22:13:20.123");
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
        assert!(a > 1_600_000_000_000);
    }
}
