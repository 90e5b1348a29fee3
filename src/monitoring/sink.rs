//! Fire-and-forget metrics sink

use super::backend::MetricsBackend;
use super::config::BackendConfig;
use super::join_with_timeout;
use super::point::{MeasurementPoint, PointFields, Tags};
use super::probe::{ConnectivityProbe, ConnectivityState, DEFAULT_PROBE_INTERVAL};
use crate::core::{FieldValue, Logger, Result, SinkMetrics, TelemetryError};
use crate::fields;
use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Recording side of the metrics sink
///
/// None of these calls report failure: a point the backend refuses is logged
/// and dropped.
pub trait Monitor: Send + Sync {
    fn insert_record(
        &self,
        measurement: &str,
        value: f64,
        tags: Option<Tags>,
        fields: Option<PointFields>,
        at: DateTime<Utc>,
    );

    /// [`insert_record`](Self::insert_record) stamped with the current time
    fn count(&self, measurement: &str, value: f64, tags: Option<Tags>, fields: Option<PointFields>) {
        self.insert_record(measurement, value, tags, fields, Utc::now());
    }

    /// Count tagged only with `error` set to the error's message
    fn count_error(&self, measurement: &str, value: f64, err: &(dyn Error + 'static)) {
        let mut tags = Tags::new();
        tags.insert("error".to_string(), err.to_string());
        self.count(measurement, value, Some(tags), None);
    }

    fn count_simple(&self, measurement: &str, value: f64) {
        self.count(measurement, value, None, None);
    }
}

/// Runtime knobs for a [`MetricsSink`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkOptions {
    pub probe_interval: Duration,
    /// Capacity of the single-writer queue used for serial backends
    pub queue_capacity: usize,
    /// HTTP request timeout for the InfluxDB backend
    pub request_timeout: Duration,
}

impl SinkOptions {
    #[must_use]
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.probe_interval.is_zero() {
            return Err(TelemetryError::config("SinkOptions", "probe_interval must be non-zero"));
        }
        if self.queue_capacity == 0 {
            return Err(TelemetryError::config("SinkOptions", "queue_capacity must be non-zero"));
        }
        Ok(())
    }
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            probe_interval: DEFAULT_PROBE_INTERVAL,
            queue_capacity: 1024,
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Everything a write needs, shared with the writer thread
struct WriteContext {
    backend: Arc<dyn MetricsBackend>,
    database: String,
    logger: Logger,
    metrics: Arc<SinkMetrics>,
}

impl WriteContext {
    fn submit(&self, point: MeasurementPoint) {
        match self.backend.write(&self.database, std::slice::from_ref(&point)) {
            Ok(()) => {
                self.metrics.record_written();
            }
            Err(err) => self.report_failure(&point, &err),
        }
    }

    fn report_failure(&self, point: &MeasurementPoint, err: &TelemetryError) {
        self.metrics.record_write_failure();
        self.logger.error().log(fields![
            "err" => FieldValue::error(err),
            "database" => self.database.as_str(),
            "measurement" => point.measurement.as_str(),
            "value" => point.value(),
            "tags" => &point.tags,
            "during" => "influxdb.Client.Write",
            "msg" => format!("Error inserting record into {}: {}", point.measurement, err),
        ]);
    }
}

enum Writer {
    /// Caller threads write straight to the backend
    Direct,
    /// Points go through a bounded queue to one writer thread
    Queued {
        sender: Option<Sender<MeasurementPoint>>,
        handle: Option<JoinHandle<()>>,
    },
}

impl Writer {
    fn spawn_queue(ctx: Arc<WriteContext>, capacity: usize) -> Result<Self> {
        let (sender, receiver) = bounded::<MeasurementPoint>(capacity);
        let handle = thread::Builder::new()
            .name("metrics-writer".to_string())
            .spawn(move || {
                // Drains what is left once every sender is gone
                for point in receiver {
                    ctx.submit(point);
                }
            })?;

        Ok(Writer::Queued {
            sender: Some(sender),
            handle: Some(handle),
        })
    }
}

/// Writes measurement points to a time-series backend
///
/// Construction parses the connection string, logs where points will go and
/// starts a [`ConnectivityProbe`]. A malformed connection string fails
/// construction before anything is logged or spawned.
///
/// # Example
///
/// ```
/// use rust_telemetry_facade::prelude::*;
/// use rust_telemetry_facade::monitoring::{MemoryBackend, SinkOptions};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let backend = Arc::new(MemoryBackend::new());
/// let mut sink = MetricsSink::with_backend(
///     "http://writer@metrics.local:8086/app",
///     backend.clone(),
///     Logger::nop(),
///     SinkOptions::default(),
/// )
/// .unwrap();
///
/// sink.count_simple("jobs.finished", 1.0);
/// assert!(sink.shutdown(Duration::from_secs(5)));
/// assert_eq!(backend.points().len(), 1);
/// ```
pub struct MetricsSink {
    config: BackendConfig,
    ctx: Arc<WriteContext>,
    writer: Writer,
    probe: Option<ConnectivityProbe>,
    stopped: bool,
}

impl MetricsSink {
    /// Sink writing to the InfluxDB server named by `connection`
    #[cfg(feature = "influxdb")]
    pub fn new(connection: &str, logger: Logger) -> Result<Self> {
        Self::with_options(connection, logger, SinkOptions::default())
    }

    #[cfg(feature = "influxdb")]
    pub fn with_options(connection: &str, logger: Logger, options: SinkOptions) -> Result<Self> {
        let config = BackendConfig::parse(connection)?;
        options.validate()?;
        let backend = super::influx::InfluxHttpBackend::new(&config, options.request_timeout)?;
        Self::start(config, Arc::new(backend), logger, options)
    }

    /// Sink writing to an arbitrary backend. `connection` still names the
    /// database and is reported in the startup log line.
    pub fn with_backend(
        connection: &str,
        backend: Arc<dyn MetricsBackend>,
        logger: Logger,
        options: SinkOptions,
    ) -> Result<Self> {
        let config = BackendConfig::parse(connection)?;
        options.validate()?;
        Self::start(config, backend, logger, options)
    }

    fn start(
        config: BackendConfig,
        backend: Arc<dyn MetricsBackend>,
        logger: Logger,
        options: SinkOptions,
    ) -> Result<Self> {
        logger.info().log(fields![
            "msg" => format!("influxdb instrumentation writing to {}", config),
            "scheme" => config.scheme(),
            "username" => config.username(),
            "database" => config.database(),
            "host" => config.authority(),
        ]);

        let metrics = Arc::new(SinkMetrics::new());
        let ctx = Arc::new(WriteContext {
            backend: Arc::clone(&backend),
            database: config.database().to_string(),
            logger: logger.clone(),
            metrics: Arc::clone(&metrics),
        });

        let writer = if backend.is_concurrency_safe() {
            Writer::Direct
        } else {
            Writer::spawn_queue(Arc::clone(&ctx), options.queue_capacity)?
        };

        let probe_logger = logger.with(fields![
            "scheme" => config.scheme(),
            "username" => config.username(),
            "database" => config.database(),
            "host" => config.authority(),
        ]);
        let probe = ConnectivityProbe::start(backend, probe_logger, options.probe_interval, metrics)?;

        Ok(Self {
            config,
            ctx,
            writer,
            probe: Some(probe),
            stopped: false,
        })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    pub fn database(&self) -> &str {
        &self.ctx.database
    }

    pub fn metrics(&self) -> &SinkMetrics {
        &self.ctx.metrics
    }

    /// True when writes go through the single-writer queue
    pub fn is_queued(&self) -> bool {
        matches!(self.writer, Writer::Queued { .. })
    }

    /// Latest probe observations; `None` after shutdown
    pub fn connectivity(&self) -> Option<ConnectivityState> {
        self.probe.as_ref().map(ConnectivityProbe::state)
    }

    pub fn is_shut_down(&self) -> bool {
        self.stopped
    }

    /// Stop the probe, drain queued points and close the backend.
    ///
    /// Returns `false` if a background thread did not finish within
    /// `timeout`. Points recorded afterwards are logged as failed writes.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        if self.stopped {
            return true;
        }
        self.stopped = true;

        let deadline = Instant::now() + timeout;
        let mut clean = match self.probe.take() {
            Some(mut probe) => probe.stop(timeout),
            None => true,
        };

        if let Writer::Queued {
            ref mut sender,
            ref mut handle,
        } = self.writer
        {
            drop(sender.take());
            if let Some(handle) = handle.take() {
                let remaining = deadline.saturating_duration_since(Instant::now());
                clean &= join_with_timeout(handle, remaining, "metrics writer");
            }
        }

        self.ctx.backend.close();
        clean
    }
}

impl Monitor for MetricsSink {
    fn insert_record(
        &self,
        measurement: &str,
        value: f64,
        tags: Option<Tags>,
        fields: Option<PointFields>,
        at: DateTime<Utc>,
    ) {
        let point = MeasurementPoint::new(measurement, value, tags, fields, at);

        if self.stopped {
            self.ctx.report_failure(&point, &TelemetryError::WriterStopped);
            return;
        }

        match self.writer {
            Writer::Direct => self.ctx.submit(point),
            Writer::Queued { ref sender, .. } => {
                let Some(sender) = sender else {
                    self.ctx.report_failure(&point, &TelemetryError::WriterStopped);
                    return;
                };
                match sender.try_send(point) {
                    Ok(()) => {}
                    Err(TrySendError::Full(point)) => {
                        let err = TelemetryError::backend("enqueue", "metrics queue full");
                        self.ctx.report_failure(&point, &err);
                    }
                    Err(TrySendError::Disconnected(point)) => {
                        self.ctx.report_failure(&point, &TelemetryError::WriterStopped);
                    }
                }
            }
        }
    }
}

impl Drop for MetricsSink {
    fn drop(&mut self) {
        if !self.stopped {
            self.shutdown(super::DEFAULT_SHUTDOWN_TIMEOUT);
        }
    }
}
