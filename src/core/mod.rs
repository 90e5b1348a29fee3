//! Core logger types and traits

pub mod appender;
pub mod error;
pub mod error_context;
pub mod field;
pub mod log_level;
pub mod logger;
pub mod metrics;
pub mod output_format;
pub mod record;
pub mod timestamp;

pub use appender::Appender;
pub use error::{Result, TelemetryError};
pub use error_context::{ContextError, ErrorContext, ErrorValue};
pub use field::{collect_fields, FieldValue, Fields};
pub use log_level::LogLevel;
pub use logger::{Logger, LoggerBuilder, LoggerConfig, HUMAN_LOG_ENV};
pub use metrics::{LoggerMetrics, SinkMetrics};
pub use output_format::OutputFormat;
pub use record::LogRecord;
pub use timestamp::TimestampFormat;
