//! Appender trait for log output destinations

use super::{error::Result, record::LogRecord};

/// Destination for materialized records. Appenders are driven behind a lock,
/// so one `append` call finishes before the next begins.
pub trait Appender: Send {
    fn append(&mut self, record: &LogRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;
}
