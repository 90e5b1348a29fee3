//! Log record structure

use super::field::{FieldValue, Fields};
use super::log_level::LogLevel;
use chrono::{DateTime, Utc};

/// One materialized log line before encoding
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    /// `file:line` of the code that emitted the record
    pub caller: Option<String>,
    /// Absent when no level-setting call preceded emission
    pub level: Option<LogLevel>,
    pub fields: Fields,
}

impl LogRecord {
    pub fn new(level: Option<LogLevel>, fields: Fields) -> Self {
        Self {
            timestamp: Utc::now(),
            caller: None,
            level,
            fields,
        }
    }

    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = Some(caller.into());
        self
    }

    /// Last value recorded under `key`
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn has_field(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Rendered `msg` field, if any
    pub fn message(&self) -> Option<String> {
        self.get("msg").map(ToString::to_string)
    }

    pub fn keys(&self) -> Vec<&str> {
        self.fields.iter().map(|(k, _)| k.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::collect_fields;

    #[test]
    fn test_get_returns_last_value() {
        let record = LogRecord::new(
            Some(LogLevel::Info),
            collect_fields([("msg", "first"), ("msg", "second")]),
        );
        assert_eq!(record.message().as_deref(), Some("second"));
        assert!(record.has_field("msg"));
        assert!(!record.has_field("err"));
    }

    #[test]
    fn test_with_caller() {
        let record = LogRecord::new(None, Vec::new()).with_caller("main.rs:10");
        assert_eq!(record.caller.as_deref(), Some("main.rs:10"));
        assert!(record.level.is_none());
    }
}
