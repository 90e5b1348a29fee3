//! Metrics backend abstraction

use super::point::MeasurementPoint;
use crate::core::{Result, TelemetryError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Time-series store the sink writes to
///
/// Implementations that cannot be called from several threads at once must
/// return `false` from [`is_concurrency_safe`](Self::is_concurrency_safe);
/// the sink then routes every write through a single writer thread.
pub trait MetricsBackend: Send + Sync {
    /// Write `points` under `database` in one round-trip
    fn write(&self, database: &str, points: &[MeasurementPoint]) -> Result<()>;

    /// Reachability check; returns the round-trip latency
    fn ping(&self) -> Result<Duration>;

    fn is_concurrency_safe(&self) -> bool {
        true
    }

    /// Release connections. Called once when the owning sink shuts down.
    fn close(&self) {}
}

/// In-process backend that keeps every written point
///
/// Write and ping failures can be switched on to exercise the sink's
/// error paths.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    points: Mutex<Vec<(String, MeasurementPoint)>>,
    fail_writes: AtomicBool,
    fail_pings: AtomicBool,
    serial_only: bool,
    pings: AtomicU64,
    closed: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend whose writes and pings all fail
    pub fn failing() -> Self {
        let backend = Self::new();
        backend.set_fail_writes(true);
        backend.set_fail_pings(true);
        backend
    }

    /// Backend that declares itself unsafe for concurrent calls
    pub fn serial() -> Self {
        Self {
            serial_only: true,
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_pings(&self, fail: bool) {
        self.fail_pings.store(fail, Ordering::SeqCst);
    }

    /// Points written so far, with the database each went to
    pub fn points(&self) -> Vec<(String, MeasurementPoint)> {
        self.points.lock().clone()
    }

    pub fn ping_count(&self) -> u64 {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl MetricsBackend for MemoryBackend {
    fn write(&self, database: &str, points: &[MeasurementPoint]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TelemetryError::backend("write", "backend unavailable"));
        }
        let mut stored = self.points.lock();
        stored.extend(points.iter().map(|p| (database.to_string(), p.clone())));
        Ok(())
    }

    fn ping(&self) -> Result<Duration> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if self.fail_pings.load(Ordering::SeqCst) {
            return Err(TelemetryError::backend("ping", "backend unavailable"));
        }
        Ok(Duration::ZERO)
    }

    fn is_concurrency_safe(&self) -> bool {
        !self.serial_only
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
