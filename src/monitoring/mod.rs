//! Time-series metrics: backend configuration, the sink and its probe

pub mod backend;
pub mod config;
#[cfg(feature = "influxdb")]
pub mod influx;
pub mod point;
pub mod probe;
pub mod sink;

pub use backend::{MemoryBackend, MetricsBackend};
pub use config::BackendConfig;
#[cfg(feature = "influxdb")]
pub use influx::InfluxHttpBackend;
pub use point::{MeasurementPoint, PointFields, Tags, VALUE_FIELD};
pub use probe::{ConnectivityProbe, ConnectivityState, ProbeOutcome, DEFAULT_PROBE_INTERVAL};
pub use sink::{MetricsSink, Monitor, SinkOptions};

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Timeout used when a sink or probe is dropped without an explicit stop
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Join `handle`, giving up after `timeout`
pub(crate) fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration, worker: &str) -> bool {
    let start = Instant::now();

    loop {
        if handle.is_finished() {
            if let Err(e) = handle.join() {
                eprintln!(
                    "[TELEMETRY ERROR] {} thread panicked during shutdown: {:?}",
                    worker, e
                );
                return false;
            }
            return true;
        }

        if start.elapsed() >= timeout {
            eprintln!(
                "[TELEMETRY WARNING] {} thread did not finish within {:?}",
                worker, timeout
            );
            return false;
        }

        thread::sleep(Duration::from_millis(10));
    }
}
