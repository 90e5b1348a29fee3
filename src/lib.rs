//! # Rust Telemetry Facade
//!
//! Structured logging and time-series metrics for server processes.
//!
//! ## Features
//!
//! - **Immutable Loggers**: Derive context-carrying loggers without touching the parent
//! - **Error Enrichment**: Error chains, structured error fields and stack traces in every error record
//! - **Metrics Sink**: Fire-and-forget measurement writes with a background connectivity probe
//! - **Call Instrumentation**: Statement timings logged at a severity that grows with latency
//!
//! ## Quick start
//!
//! ```
//! use rust_telemetry_facade::prelude::*;
//! use rust_telemetry_facade::fields;
//!
//! let logger = Logger::from_config(&LoggerConfig::machine()).with(fields!["service" => "api"]);
//! logger.info().log(fields!["msg" => "listening", "port" => 8080]);
//! ```

pub mod appenders;
pub mod bridge;
pub mod core;
pub mod instrument;
pub mod macros;
pub mod monitoring;
pub mod notifier;

pub mod prelude {
    pub use crate::appenders::{ConsoleAppender, FileAppender, MemoryAppender};
    pub use crate::core::{
        Appender, ContextError, ErrorContext, ErrorValue, FieldValue, Fields, LogLevel, LogRecord,
        Logger, LoggerBuilder, LoggerConfig, OutputFormat, Result, TelemetryError,
        TimestampFormat,
    };
    pub use crate::instrument::{CallInstrumentation, InstrumentEvent};
    pub use crate::monitoring::{MetricsSink, Monitor, PointFields, SinkOptions, Tags};
}

pub use appenders::{ConsoleAppender, FileAppender, MemoryAppender};
pub use core::{
    Appender, ContextError, ErrorContext, ErrorValue, FieldValue, Fields, LogLevel, LogRecord,
    Logger, LoggerBuilder, LoggerConfig, LoggerMetrics, OutputFormat, Result, SinkMetrics,
    TelemetryError, TimestampFormat, HUMAN_LOG_ENV,
};
pub use instrument::{CallInstrumentation, InstrumentEvent};
pub use monitoring::{MetricsSink, Monitor};
