//! Adapters that feed other logging APIs into a [`Logger`]

use crate::core::{LogLevel, Logger, Result, TelemetryError};
use crate::fields;
use std::io;

/// `std::io::Write` adapter: every write becomes one record whose `msg` is
/// the written text, minus trailing line breaks.
///
/// # Example
///
/// ```
/// use rust_telemetry_facade::prelude::*;
/// use rust_telemetry_facade::bridge::LogWriter;
/// use std::io::Write;
///
/// let memory = MemoryAppender::new();
/// let mut writer = LogWriter::new(Logger::new(memory.clone()).warn());
/// writeln!(writer, "legacy component says hi").unwrap();
///
/// assert_eq!(memory.records()[0].message().as_deref(), Some("legacy component says hi"));
/// ```
#[derive(Debug, Clone)]
pub struct LogWriter {
    logger: Logger,
}

impl LogWriter {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl io::Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let message = text.trim_end_matches(['\n', '\r']);
        if !message.is_empty() {
            self.logger.log_msg(message);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.logger
            .flush()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))
    }
}

/// Routes records of the `log` crate facade into a [`Logger`].
///
/// Trace records share the Debug tier. Records carry `msg` and `target`,
/// and `caller` is taken from the originating macro call.
#[derive(Debug, Clone)]
pub struct StdLogBridge {
    logger: Logger,
    max_level: log::LevelFilter,
}

impl StdLogBridge {
    pub fn new(logger: Logger, max_level: log::LevelFilter) -> Self {
        Self { logger, max_level }
    }
}

/// Level tier for a `log` crate level
pub fn level_from_log(level: log::Level) -> LogLevel {
    match level {
        log::Level::Error => LogLevel::Error,
        log::Level::Warn => LogLevel::Warn,
        log::Level::Info => LogLevel::Info,
        log::Level::Debug | log::Level::Trace => LogLevel::Debug,
    }
}

impl log::Log for StdLogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let caller = match (record.file(), record.line()) {
            (Some(file), Some(line)) => Some(format!("{}:{}", file, line)),
            _ => None,
        };

        self.logger
            .with_level(level_from_log(record.level()))
            .log_at(
                caller,
                fields!["msg" => record.args().to_string(), "target" => record.target()],
            );
    }

    fn flush(&self) {
        if let Err(e) = self.logger.flush() {
            eprintln!("[TELEMETRY ERROR] Failed to flush bridged logger: {}", e);
        }
    }
}

/// Install a [`StdLogBridge`] as the process-wide `log` backend.
///
/// Fails if another `log` backend is already installed.
pub fn install(logger: Logger, max_level: log::LevelFilter) -> Result<()> {
    log::set_boxed_logger(Box::new(StdLogBridge::new(logger, max_level)))
        .map_err(|e| TelemetryError::config("log bridge", e.to_string()))?;
    log::set_max_level(max_level);
    Ok(())
}
