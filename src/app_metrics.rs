use std::time::{Duration, Instant};
use tracing::info;

/// Service-level counters for mission tracking activity
pub struct AppMetrics {
    /// Location samples accepted from clients
    pub track_points: u64,
    pub missions_started: u64,
    pub missions_completed: u64,
    pub missions_cancelled: u64,
    /// Photos recorded against a running mission
    pub photos: u64,
    /// Persistence calls that failed
    pub store_errors: u64,
    /// Lifecycle requests refused because another one was in flight
    pub busy_rejections: u64,
}

impl AppMetrics {
    /// Create a new AppMetrics instance with all counters at zero
    pub fn new() -> Self {
        Self {
            track_points: 0,
            missions_started: 0,
            missions_completed: 0,
            missions_cancelled: 0,
            photos: 0,
            store_errors: 0,
            busy_rejections: 0,
        }
    }

    /// Reset all counters to zero
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Log current metrics to the info log
    pub fn log(&self) {
        info!(
            "[Metrics] Track points: {}, Missions started: {}, completed: {}, cancelled: {}, Photos: {}, Store errors: {}, Busy rejections: {}",
            self.track_points,
            self.missions_started,
            self.missions_completed,
            self.missions_cancelled,
            self.photos,
            self.store_errors,
            self.busy_rejections
        );
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Manages periodic logging of application metrics
pub struct MetricsLogger {
    last_log: Instant,
    log_interval: Duration,
}

impl MetricsLogger {
    /// Create a new MetricsLogger with the specified logging interval
    pub fn new(log_interval: Duration) -> Self {
        Self {
            last_log: Instant::now(),
            log_interval,
        }
    }

    /// Check if it's time to log metrics, and if so, log them and reset
    /// Returns true if metrics were logged
    pub fn check_and_log(&mut self, metrics: &mut AppMetrics) -> bool {
        if self.last_log.elapsed() >= self.log_interval {
            metrics.log();
            metrics.reset();
            self.last_log = Instant::now();
            true
        } else {
            false
        }
    }
}
