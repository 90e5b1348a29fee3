//! Leveled, context-accumulating logger
//!
//! A [`Logger`] is a cheap value. Deriving a child with [`Logger::with`] or a
//! level method never touches the parent, so loggers can be handed to other
//! threads and decorated independently. Only [`Logger::log`] has a visible
//! side effect: it materializes one [`LogRecord`] and hands it to the shared
//! appender.

use super::{
    appender::Appender,
    error::Result,
    error_context::ErrorContext,
    field::{collect_fields, FieldValue, Fields},
    log_level::LogLevel,
    metrics::LoggerMetrics,
    output_format::OutputFormat,
    record::LogRecord,
    timestamp::TimestampFormat,
};
use crate::appenders::ConsoleAppender;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Environment variable read by [`LoggerConfig::from_env`]
pub const HUMAN_LOG_ENV: &str = "TELEMETRY_LOG_HUMAN";

/// Construction-time settings for a console logger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggerConfig {
    pub output_format: OutputFormat,
    pub timestamp_format: TimestampFormat,
    /// Only honored by the human-readable format
    pub use_colors: bool,
    /// Records below this level are discarded; records without a level always pass
    pub min_level: Option<LogLevel>,
}

impl LoggerConfig {
    /// Logfmt lines with RFC 3339 nanosecond timestamps
    pub fn machine() -> Self {
        Self {
            output_format: OutputFormat::Logfmt,
            timestamp_format: TimestampFormat::Rfc3339Nanos,
            use_colors: false,
            min_level: None,
        }
    }

    /// Colored human-readable lines
    pub fn human() -> Self {
        Self {
            output_format: OutputFormat::Human,
            use_colors: true,
            ..Self::machine()
        }
    }

    /// Select the format from the value of the human-readable toggle.
    ///
    /// Unset, empty, `false` and `0` (any case) select the machine format;
    /// any other value selects the human format.
    pub fn from_toggle(value: Option<&str>) -> Self {
        if human_toggle_enabled(value) {
            Self::human()
        } else {
            Self::machine()
        }
    }

    /// Read [`HUMAN_LOG_ENV`] from the process environment.
    ///
    /// Intended for `main` and other process-boundary code; everything else
    /// should receive a `LoggerConfig` value.
    pub fn from_env() -> Self {
        Self::from_toggle(std::env::var(HUMAN_LOG_ENV).ok().as_deref())
    }

    #[must_use]
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::machine()
    }
}

fn human_toggle_enabled(value: Option<&str>) -> bool {
    match value.map(str::to_lowercase) {
        None => false,
        Some(v) => !(v.is_empty() || v == "false" || v == "0"),
    }
}

/// State shared by every logger derived from the same root
struct Output {
    appender: Mutex<Box<dyn Appender>>,
    min_level: Option<LogLevel>,
    metrics: LoggerMetrics,
}

/// Immutable structured logger
///
/// # Example
///
/// ```
/// use rust_telemetry_facade::prelude::*;
/// use rust_telemetry_facade::fields;
///
/// let memory = MemoryAppender::new();
/// let logger = Logger::new(memory.clone()).with(fields!["service" => "billing"]);
///
/// logger.info().log(fields!["msg" => "invoice sent", "invoice_id" => 991]);
///
/// let records = memory.records();
/// assert_eq!(records[0].level, Some(LogLevel::Info));
/// assert_eq!(records[0].keys(), vec!["service", "msg", "invoice_id"]);
/// ```
#[derive(Clone)]
pub struct Logger {
    /// `None` for the no-op logger
    output: Option<Arc<Output>>,
    fields: Arc<Fields>,
    level: Option<LogLevel>,
}

impl Logger {
    /// Logger writing every record to `appender`
    #[must_use]
    pub fn new<A: Appender + 'static>(appender: A) -> Self {
        Self::builder().appender(appender).build()
    }

    /// Console logger configured by `config`
    #[must_use]
    pub fn from_config(config: &LoggerConfig) -> Self {
        Self::builder().config(config.clone()).build()
    }

    /// Logger that accepts every call and writes nothing
    #[must_use]
    pub fn nop() -> Self {
        Self {
            output: None,
            fields: Arc::new(Vec::new()),
            level: None,
        }
    }

    /// Create a builder for Logger
    #[must_use]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    fn from_output(output: Arc<Output>, fields: Fields) -> Self {
        Self {
            output: Some(output),
            fields: Arc::new(fields),
            level: None,
        }
    }

    pub fn is_nop(&self) -> bool {
        self.output.is_none()
    }

    /// Fields every record from this logger starts with
    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    /// Level the next record will carry
    pub fn level(&self) -> Option<LogLevel> {
        self.level
    }

    /// Derive a logger whose records also carry `pairs`, appended in order
    #[must_use]
    pub fn with<I, K, V>(&self, pairs: I) -> Logger
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        let extra = collect_fields(pairs);
        if extra.is_empty() {
            return self.clone();
        }

        let mut fields = Vec::with_capacity(self.fields.len() + extra.len());
        fields.extend(self.fields.iter().cloned());
        fields.extend(extra);

        Logger {
            output: self.output.clone(),
            fields: Arc::new(fields),
            level: self.level,
        }
    }

    /// Derive a logger with a single extra field
    #[must_use]
    pub fn with_field<K, V>(&self, key: K, value: V) -> Logger
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.with([(key, value)])
    }

    /// Derive a logger tagged with `level`; replaces any earlier level
    #[must_use]
    pub fn with_level(&self, level: LogLevel) -> Logger {
        Logger {
            level: Some(level),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn debug(&self) -> Logger {
        self.with_level(LogLevel::Debug)
    }

    #[must_use]
    pub fn info(&self) -> Logger {
        self.with_level(LogLevel::Info)
    }

    #[must_use]
    pub fn warn(&self) -> Logger {
        self.with_level(LogLevel::Warn)
    }

    #[must_use]
    pub fn error(&self) -> Logger {
        self.with_level(LogLevel::Error)
    }

    /// Critical records share the error tier
    #[must_use]
    pub fn crit(&self) -> Logger {
        self.with_level(LogLevel::Error)
    }

    /// Enrich with `err`, capturing a stack trace if the error has none.
    ///
    /// `None` returns an identical logger: same fields, same level.
    #[must_use]
    pub fn wrap_error(&self, err: Option<&(dyn Error + 'static)>) -> Logger {
        match err {
            None => self.clone(),
            Some(err) => self.with_context(ErrorContext::wrap(err)),
        }
    }

    /// [`wrap_error`](Self::wrap_error) for the error side of a result
    #[must_use]
    pub fn wrap_result<T, E>(&self, result: &std::result::Result<T, E>) -> Logger
    where
        E: Error + 'static,
    {
        self.wrap_error(result.as_ref().err().map(|e| e as &(dyn Error + 'static)))
    }

    /// Append the error's context pairs, `msg` and `stacktrace`, at Error level
    #[must_use]
    pub fn with_error(&self, err: &(dyn Error + 'static)) -> Logger {
        self.with_context(ErrorContext::extract(err))
    }

    #[must_use]
    pub fn with_context(&self, context: ErrorContext) -> Logger {
        self.with(context.into_fields()).error()
    }

    /// Emit one record with this logger's fields followed by `pairs`.
    ///
    /// `caller` names the code calling this method.
    #[track_caller]
    pub fn log<I, K, V>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        if self.output.is_none() {
            return;
        }
        let location = Location::caller();
        self.emit(
            Some(format!("{}:{}", location.file(), location.line())),
            collect_fields(pairs),
        );
    }

    /// Emit one record with a single `msg` field
    #[track_caller]
    pub fn log_msg(&self, message: impl Into<String>) {
        self.log([("msg", message.into())]);
    }

    /// Emit with an explicit caller, for adapters that know the original site
    pub(crate) fn log_at(&self, caller: Option<String>, fields: Fields) {
        self.emit(caller, fields);
    }

    fn emit(&self, caller: Option<String>, extra: Fields) {
        let Some(ref output) = self.output else {
            return;
        };

        if let (Some(min), Some(level)) = (output.min_level, self.level) {
            if level < min {
                output.metrics.record_filtered();
                return;
            }
        }

        let mut fields = Vec::with_capacity(self.fields.len() + extra.len());
        fields.extend(self.fields.iter().cloned());
        fields.extend(extra);

        let mut record = LogRecord::new(self.level, fields);
        record.caller = caller;

        let mut appender = output.appender.lock();
        let append_result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            appender.append(&record)
        }));

        match append_result {
            Ok(Ok(())) => {
                output.metrics.record_logged();
            }
            Ok(Err(e)) => {
                eprintln!("[TELEMETRY ERROR] Appender '{}' failed: {}", appender.name(), e);
                output.metrics.record_dropped();
            }
            Err(panic_info) => {
                let panic_msg = if let Some(s) = panic_info.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_info.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                eprintln!(
                    "[TELEMETRY CRITICAL] Appender '{}' panicked: {}",
                    appender.name(),
                    panic_msg
                );
                output.metrics.record_dropped();
            }
        }
    }

    pub fn flush(&self) -> Result<()> {
        if let Some(ref output) = self.output {
            output.appender.lock().flush()?;
        }
        Ok(())
    }

    /// Emission counters shared by every logger derived from the same root
    pub fn metrics(&self) -> Option<&LoggerMetrics> {
        self.output.as_ref().map(|o| &o.metrics)
    }

    /// Records an appender failed to write
    pub fn dropped_count(&self) -> u64 {
        self.metrics().map_or(0, LoggerMetrics::dropped_count)
    }
}

impl Default for Logger {
    /// Machine-readable logfmt to stdout
    fn default() -> Self {
        Self::from_config(&LoggerConfig::default())
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("nop", &self.is_nop())
            .field("level", &self.level)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Builder for constructing Logger with a fluent API
///
/// # Example
/// ```
/// use rust_telemetry_facade::prelude::*;
///
/// let logger = Logger::builder()
///     .config(LoggerConfig::human().with_min_level(LogLevel::Info))
///     .field("service", "api")
///     .build();
/// ```
pub struct LoggerBuilder {
    config: LoggerConfig,
    appender: Option<Box<dyn Appender>>,
    fields: Fields,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            config: LoggerConfig::default(),
            appender: None,
            fields: Vec::new(),
        }
    }

    /// Set the configuration; format settings apply to the default console appender
    #[must_use = "builder methods return a new value"]
    pub fn config(mut self, config: LoggerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.config.min_level = Some(level);
        self
    }

    /// Write to `appender` instead of the console
    #[must_use = "builder methods return a new value"]
    pub fn appender<A: Appender + 'static>(mut self, appender: A) -> Self {
        self.appender = Some(Box::new(appender));
        self
    }

    /// Add a field carried by every record of the built logger
    #[must_use = "builder methods return a new value"]
    pub fn field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> Logger {
        let appender = match self.appender {
            Some(appender) => appender,
            None => Box::new(ConsoleAppender::from_config(&self.config)),
        };

        let output = Arc::new(Output {
            appender: Mutex::new(appender),
            min_level: self.config.min_level,
            metrics: LoggerMetrics::new(),
        });

        Logger::from_output(output, self.fields)
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
