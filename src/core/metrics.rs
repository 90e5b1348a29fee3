//! Self-observability counters
//!
//! `LoggerMetrics` tracks the health of log emission, `SinkMetrics` tracks the
//! metrics sink's traffic to its backend. Both are shared through `Arc` by
//! every clone that feeds them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for log emission
///
/// # Example
///
/// ```
/// use rust_telemetry_facade::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_logged();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_logged(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records an appender failed to write
    dropped_count: AtomicU64,

    /// Records written by the appender
    total_logged: AtomicU64,

    /// Records suppressed by the minimum level
    filtered_count: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            dropped_count: AtomicU64::new(0),
            total_logged: AtomicU64::new(0),
            filtered_count: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn filtered_count(&self) -> u64 {
        self.filtered_count.load(Ordering::Relaxed)
    }

    /// Record a dropped log, returning the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_filtered(&self) -> u64 {
        self.filtered_count.fetch_add(1, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no logs have been processed.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_logged() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters for metric submission and connectivity checks
#[derive(Debug, Default)]
pub struct SinkMetrics {
    points_written: AtomicU64,
    write_failures: AtomicU64,
    pings: AtomicU64,
    ping_failures: AtomicU64,
}

impl SinkMetrics {
    pub const fn new() -> Self {
        Self {
            points_written: AtomicU64::new(0),
            write_failures: AtomicU64::new(0),
            pings: AtomicU64::new(0),
            ping_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn points_written(&self) -> u64 {
        self.points_written.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn write_failures(&self) -> u64 {
        self.write_failures.load(Ordering::Relaxed)
    }

    /// Reachability checks issued, successful or not
    #[inline]
    pub fn pings(&self) -> u64 {
        self.pings.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn ping_failures(&self) -> u64 {
        self.ping_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn record_written(&self) -> u64 {
        self.points_written.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_write_failure(&self) -> u64 {
        self.write_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_ping(&self, ok: bool) -> u64 {
        if !ok {
            self.ping_failures.fetch_add(1, Ordering::Relaxed);
        }
        self.pings.fetch_add(1, Ordering::Relaxed)
    }
}
