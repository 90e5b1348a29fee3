//! Output format configuration for log records
//!
//! Provides the encodings a record can be written in:
//! - Logfmt: machine-readable `key=value` pairs on one line (default)
//! - Human: aligned, readable text for terminals
//! - Json: one JSON object per line
//!
//! All three render the same logical content: `ts`, `caller`, `level` and the
//! record's own fields in the order they were added.

use super::log_level::LogLevel;
use super::record::LogRecord;
use super::timestamp::TimestampFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Output format for log records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Logfmt format (key=value pairs)
    ///
    /// Example: `ts=2025-01-08T10:30:45.123456789Z caller=main.rs:12 level=info msg="request done"`
    #[default]
    Logfmt,

    /// Human-readable text format
    ///
    /// Example: `2025-01-08T10:30:45.123456789Z INFO  main.rs:12 msg="request done" status=200`
    Human,

    /// JSON format for machine processing
    ///
    /// Example: `{"ts":"...","caller":"main.rs:12","level":"info","msg":"request done"}`
    ///
    /// A key that repeats within a record becomes an array of its values.
    Json,
}

impl OutputFormat {
    /// Format a log record according to this output format
    pub fn format(&self, record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
        match self {
            OutputFormat::Logfmt => format_logfmt(record, timestamp_format),
            OutputFormat::Human => format_human(record, timestamp_format, |_, label| label.to_string()),
            OutputFormat::Json => format_json(record, timestamp_format),
        }
    }
}

/// Format as logfmt (key=value pairs)
fn format_logfmt(record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
    let mut parts = Vec::with_capacity(record.fields.len() + 3);

    parts.push(format!(
        "ts={}",
        escape_logfmt_value(&timestamp_format.format(&record.timestamp))
    ));
    if let Some(ref caller) = record.caller {
        parts.push(format!("caller={}", escape_logfmt_value(caller)));
    }
    if let Some(level) = record.level {
        parts.push(format!("level={}", level.as_str()));
    }

    for (key, value) in &record.fields {
        parts.push(format!(
            "{}={}",
            escape_logfmt_key(key),
            escape_logfmt_value(&value.to_string())
        ));
    }

    parts.join(" ")
}

/// Format as human-readable text; `paint` decorates the padded level label
pub(crate) fn format_human<F>(
    record: &LogRecord,
    timestamp_format: &TimestampFormat,
    paint: F,
) -> String
where
    F: Fn(LogLevel, &str) -> String,
{
    let level = record
        .level
        .map(|l| paint(l, &format!("{:5}", l.label())))
        .unwrap_or_else(|| " ".repeat(5));

    let mut line = format!(
        "{} {} {}",
        timestamp_format.format(&record.timestamp),
        level,
        record.caller.as_deref().unwrap_or("-")
    );

    for (key, value) in &record.fields {
        line.push(' ');
        line.push_str(&escape_logfmt_key(key));
        line.push('=');
        line.push_str(&escape_logfmt_value(&value.to_string()));
    }

    line
}

/// Format as JSON
fn format_json(record: &LogRecord, timestamp_format: &TimestampFormat) -> String {
    let mut json_obj = serde_json::Map::new();

    let ts = if timestamp_format.is_numeric() {
        serde_json::Value::Number(record.timestamp.timestamp_millis().into())
    } else {
        serde_json::Value::String(timestamp_format.format(&record.timestamp))
    };
    json_obj.insert("ts".to_string(), ts);

    if let Some(ref caller) = record.caller {
        json_obj.insert("caller".to_string(), serde_json::Value::String(caller.clone()));
    }
    if let Some(level) = record.level {
        json_obj.insert(
            "level".to_string(),
            serde_json::Value::String(level.as_str().to_string()),
        );
    }

    let mut repeated = HashSet::new();
    for (key, value) in &record.fields {
        let value = value.to_json_value();
        match json_obj.get_mut(key) {
            Some(existing) if repeated.insert(key.as_str()) => {
                let first = existing.take();
                *existing = serde_json::Value::Array(vec![first, value]);
            }
            Some(serde_json::Value::Array(values)) => values.push(value),
            Some(existing) => *existing = value,
            None => {
                json_obj.insert(key.clone(), value);
            }
        }
    }

    serde_json::to_string(&serde_json::Value::Object(json_obj)).unwrap_or_default()
}

/// Escape a logfmt key (remove spaces and special chars)
fn escape_logfmt_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect()
}

/// Escape a logfmt value (quote if needed)
fn escape_logfmt_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c == ' ' || c == '"' || c == '=' || c.is_control());

    if needs_quotes {
        format!("\"{}\"", sanitize(&value.replace('\\', "\\\\").replace('"', "\\\"")))
    } else {
        value.to_string()
    }
}

/// Replace line breaks and tabs so one record always stays on one line
fn sanitize(value: &str) -> String {
    value
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::field::collect_fields;

    fn record(level: Option<LogLevel>, pairs: &[(&str, &str)]) -> LogRecord {
        LogRecord::new(level, collect_fields(pairs.iter().copied())).with_caller("main.rs:12")
    }

    #[test]
    fn test_logfmt_format() {
        let rec = record(Some(LogLevel::Warn), &[("msg", "Warning message")]);
        let result = OutputFormat::Logfmt.format(&rec, &TimestampFormat::Rfc3339Nanos);

        assert!(result.starts_with("ts="));
        assert!(result.contains(" caller=main.rs:12 level=warn "));
        assert!(result.ends_with("msg=\"Warning message\""));
    }

    #[test]
    fn test_logfmt_field_order() {
        let rec = record(Some(LogLevel::Info), &[("b", "1"), ("a", "2"), ("c", "3")]);
        let result = OutputFormat::Logfmt.format(&rec, &TimestampFormat::Rfc3339Nanos);

        let b = result.find("b=1").unwrap();
        let a = result.find("a=2").unwrap();
        let c = result.find("c=3").unwrap();
        assert!(b < a && a < c);
    }

    #[test]
    fn test_logfmt_without_level() {
        let rec = record(None, &[("msg", "plain")]);
        let result = OutputFormat::Logfmt.format(&rec, &TimestampFormat::Rfc3339Nanos);
        assert!(!result.contains("level="));
    }

    #[test]
    fn test_logfmt_escape_special_chars() {
        let rec = record(None, &[("query", "SELECT * FROM users WHERE id=1"), ("empty", "")]);
        let result = OutputFormat::Logfmt.format(&rec, &TimestampFormat::Rfc3339Nanos);

        assert!(result.contains("query=\"SELECT * FROM users WHERE id=1\""));
        assert!(result.contains("empty=\"\""));
    }

    #[test]
    fn test_logfmt_injection_prevention() {
        let rec = record(
            Some(LogLevel::Info),
            &[("msg", "User login\nlevel=error msg=\"Fake error injected\"")],
        );
        let result = OutputFormat::Logfmt.format(&rec, &TimestampFormat::Rfc3339Nanos);

        assert_eq!(result.lines().count(), 1);
        assert!(result.contains("\\n"));
    }

    #[test]
    fn test_human_format() {
        let rec = record(Some(LogLevel::Error), &[("msg", "disk full"), ("path", "/var")]);
        let result = OutputFormat::Human.format(&rec, &TimestampFormat::Rfc3339Nanos);

        assert!(result.contains("ERROR main.rs:12 msg=\"disk full\" path=/var"));
    }

    #[test]
    fn test_repeated_keys_in_every_format() {
        let rec = record(
            Some(LogLevel::Error),
            &[("msg", "disk full"), ("path", "/var"), ("msg", "while saving")],
        );
        let ts = TimestampFormat::Rfc3339Nanos;

        let logfmt = OutputFormat::Logfmt.format(&rec, &ts);
        assert!(logfmt.ends_with(
            "level=error msg=\"disk full\" path=/var msg=\"while saving\""
        ));

        let human = OutputFormat::Human.format(&rec, &ts);
        assert!(human.ends_with(
            "ERROR main.rs:12 msg=\"disk full\" path=/var msg=\"while saving\""
        ));

        let json = OutputFormat::Json.format(&rec, &ts);
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["msg"], serde_json::json!(["disk full", "while saving"]));
        assert_eq!(parsed["path"], "/var");
        let keys: Vec<&String> = parsed.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["ts", "caller", "level", "msg", "path"]);
    }

    #[test]
    fn test_json_format() {
        let rec = record(Some(LogLevel::Error), &[("msg", "Error occurred")]);
        let result = OutputFormat::Json.format(&rec, &TimestampFormat::Rfc3339Nanos);

        let parsed: serde_json::Value = serde_json::from_str(&result).unwrap();
        assert_eq!(parsed["level"], "error");
        assert_eq!(parsed["msg"], "Error occurred");
        assert_eq!(parsed["caller"], "main.rs:12");
        assert!(parsed["ts"].is_string());
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Logfmt);
    }
}
