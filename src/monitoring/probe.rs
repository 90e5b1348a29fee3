//! Background connectivity probe

use super::backend::MetricsBackend;
use super::join_with_timeout;
use crate::core::{FieldValue, Logger, Result, SinkMetrics};
use crate::fields;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Interval between reachability checks
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Result of one reachability check
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Reachable { latency: Duration },
    Unreachable { error: String },
}

/// What the probe has observed so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectivityState {
    pub checks: u64,
    pub consecutive_failures: u64,
    pub last_outcome: Option<ProbeOutcome>,
    pub last_checked: Option<DateTime<Utc>>,
}

impl ConnectivityState {
    /// `None` until the first check completes
    pub fn is_reachable(&self) -> Option<bool> {
        self.last_outcome
            .as_ref()
            .map(|outcome| matches!(outcome, ProbeOutcome::Reachable { .. }))
    }
}

/// Pings the backend once at start and then on a fixed interval.
///
/// A failed ping is logged at Warn and the loop carries on; a successful one
/// logs nothing. The thread runs until [`stop`](Self::stop) is called or the
/// probe is dropped.
pub struct ConnectivityProbe {
    state: Arc<RwLock<ConnectivityState>>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl ConnectivityProbe {
    pub fn start(
        backend: Arc<dyn MetricsBackend>,
        logger: Logger,
        interval: Duration,
        metrics: Arc<SinkMetrics>,
    ) -> Result<Self> {
        let state = Arc::new(RwLock::new(ConnectivityState::default()));
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let worker_state = Arc::clone(&state);
        let handle = thread::Builder::new()
            .name("connectivity-probe".to_string())
            .spawn(move || loop {
                check(backend.as_ref(), &logger, &worker_state, &metrics);

                // A message or a dropped sender both mean stop
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })?;

        Ok(Self {
            state,
            stop: Some(stop_tx),
            handle: Some(handle),
            interval,
        })
    }

    /// Snapshot of the observed connectivity
    pub fn state(&self) -> ConnectivityState {
        self.state.read().clone()
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the loop and wait up to `timeout` for the thread to exit.
    ///
    /// A check already in flight is not interrupted, so a backend blocked on
    /// the network can make this return `false`.
    pub fn stop(&mut self, timeout: Duration) -> bool {
        drop(self.stop.take());
        match self.handle.take() {
            Some(handle) => join_with_timeout(handle, timeout, "connectivity probe"),
            None => true,
        }
    }
}

impl Drop for ConnectivityProbe {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop(super::DEFAULT_SHUTDOWN_TIMEOUT);
        }
    }
}

fn check(
    backend: &dyn MetricsBackend,
    logger: &Logger,
    state: &RwLock<ConnectivityState>,
    metrics: &SinkMetrics,
) {
    let outcome = match backend.ping() {
        Ok(latency) => ProbeOutcome::Reachable { latency },
        Err(err) => {
            logger.warn().log(fields![
                "err" => FieldValue::error(&err),
                "during" => "influxdb.Client.Ping",
                "msg" => format!("couldn't ping influxdb: {}", err),
            ]);
            ProbeOutcome::Unreachable {
                error: err.to_string(),
            }
        }
    };

    let reachable = matches!(outcome, ProbeOutcome::Reachable { .. });
    metrics.record_ping(reachable);

    let mut state = state.write();
    state.checks += 1;
    state.consecutive_failures = if reachable {
        0
    } else {
        state.consecutive_failures + 1
    };
    state.last_outcome = Some(outcome);
    state.last_checked = Some(Utc::now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::MemoryAppender;
    use crate::core::LogLevel;
    use crate::monitoring::MemoryBackend;
    use std::time::Instant;

    fn wait_for(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn test_failures_do_not_stop_probe() {
        let backend = Arc::new(MemoryBackend::failing());
        let memory = MemoryAppender::new();
        let metrics = Arc::new(SinkMetrics::new());

        let mut probe = ConnectivityProbe::start(
            backend.clone(),
            Logger::new(memory.clone()),
            Duration::from_millis(10),
            metrics.clone(),
        )
        .unwrap();

        assert!(wait_for(Duration::from_secs(5), || probe.state().checks >= 4));
        assert!(probe.stop(Duration::from_secs(5)));

        let state = probe.state();
        assert_eq!(state.consecutive_failures, state.checks);
        assert_eq!(state.is_reachable(), Some(false));
        assert_eq!(metrics.ping_failures(), state.checks);

        let warnings = memory.records_at(LogLevel::Warn);
        assert_eq!(warnings.len() as u64, state.checks);
        assert_eq!(
            warnings[0].get("during").and_then(FieldValue::as_str),
            Some("influxdb.Client.Ping")
        );
        assert!(warnings[0]
            .message()
            .is_some_and(|m| m.starts_with("couldn't ping influxdb: ")));
    }

    #[test]
    fn test_success_is_silent() {
        let backend = Arc::new(MemoryBackend::new());
        let memory = MemoryAppender::new();

        let mut probe = ConnectivityProbe::start(
            backend.clone(),
            Logger::new(memory.clone()),
            Duration::from_millis(10),
            Arc::new(SinkMetrics::new()),
        )
        .unwrap();

        assert!(wait_for(Duration::from_secs(5), || backend.ping_count() >= 2));
        probe.stop(Duration::from_secs(5));

        assert!(memory.is_empty());
        assert_eq!(probe.state().is_reachable(), Some(true));
    }

    #[test]
    fn test_recovers_after_failures() {
        let backend = Arc::new(MemoryBackend::failing());
        let mut probe = ConnectivityProbe::start(
            backend.clone(),
            Logger::nop(),
            Duration::from_millis(10),
            Arc::new(SinkMetrics::new()),
        )
        .unwrap();

        assert!(wait_for(Duration::from_secs(5), || probe.state().consecutive_failures >= 2));
        backend.set_fail_pings(false);
        assert!(wait_for(Duration::from_secs(5), || probe.state().is_reachable() == Some(true)));
        assert_eq!(probe.state().consecutive_failures, 0);

        probe.stop(Duration::from_secs(5));
    }

    #[test]
    fn test_first_check_is_immediate_and_stop_is_prompt() {
        let backend = Arc::new(MemoryBackend::new());
        let mut probe = ConnectivityProbe::start(
            backend.clone(),
            Logger::nop(),
            DEFAULT_PROBE_INTERVAL,
            Arc::new(SinkMetrics::new()),
        )
        .unwrap();

        assert!(wait_for(Duration::from_secs(5), || backend.ping_count() == 1));
        assert!(probe.is_running());

        let started = Instant::now();
        assert!(probe.stop(Duration::from_secs(5)));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!probe.is_running());
        assert_eq!(backend.ping_count(), 1);
    }
}
