//! Call instrumentation adapter
//!
//! Converts "call completed" events, such as the statement callbacks ORM and
//! database layers deliver, into leveled log records. Timed calls escalate
//! severity with their duration:
//!
//! | elapsed            | level |
//! |--------------------|-------|
//! | `> 100ms`          | warn  |
//! | `> 50ms, <= 100ms` | info  |
//! | `<= 50ms`          | debug |

use crate::core::{FieldValue, Fields, LogLevel, Logger};
use crate::fields;
use std::panic::Location;
use std::time::{Duration, Instant};

/// Calls slower than this are logged at Warn
pub const WARN_THRESHOLD: Duration = Duration::from_millis(100);

/// Calls slower than this (and not slower than [`WARN_THRESHOLD`]) are logged at Info
pub const INFO_THRESHOLD: Duration = Duration::from_millis(50);

/// Severity for a call that took `elapsed`
pub fn severity_for(elapsed: Duration) -> LogLevel {
    if elapsed > WARN_THRESHOLD {
        LogLevel::Warn
    } else if elapsed > INFO_THRESHOLD {
        LogLevel::Info
    } else {
        LogLevel::Debug
    }
}

/// What an instrumentation event carries
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A completed statement with its duration and bound values
    Call {
        duration: Duration,
        statement: String,
        values: Vec<FieldValue>,
    },
    /// Log-style values emitted by the instrumented layer
    Log(Vec<FieldValue>),
    /// Anything not recognized as a call or a log payload
    Other(Vec<FieldValue>),
}

/// One instrumentation event: a category tag, a source tag and a payload
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentEvent {
    pub category: String,
    pub source: String,
    pub payload: Payload,
}

impl InstrumentEvent {
    pub fn call(
        source: impl Into<String>,
        duration: Duration,
        statement: impl Into<String>,
        values: Vec<FieldValue>,
    ) -> Self {
        Self {
            category: "sql".to_string(),
            source: source.into(),
            payload: Payload::Call {
                duration,
                statement: statement.into(),
                values,
            },
        }
    }

    pub fn log(source: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Self {
            category: "log".to_string(),
            source: source.into(),
            payload: Payload::Log(values),
        }
    }

    /// Classify a positional `(category, source, ...)` tuple.
    ///
    /// `sql` events are expected as `(duration, statement[, values])`; a `sql`
    /// tuple of any other shape is kept as [`Payload::Other`]. Returns `None`
    /// when there are fewer than two values, leaving no room for the tags.
    pub fn from_values(values: Vec<FieldValue>) -> Option<Self> {
        if values.len() < 2 {
            return None;
        }

        let mut values = values.into_iter();
        let category = tag_text(values.next()?);
        let source = tag_text(values.next()?);
        let rest: Vec<FieldValue> = values.collect();

        let payload = match category.as_str() {
            "sql" => match rest.as_slice() {
                [FieldValue::Duration(duration), FieldValue::Str(statement)] => Payload::Call {
                    duration: *duration,
                    statement: statement.clone(),
                    values: Vec::new(),
                },
                [FieldValue::Duration(duration), FieldValue::Str(statement), FieldValue::List(bound), ..] => {
                    Payload::Call {
                        duration: *duration,
                        statement: statement.clone(),
                        values: bound.clone(),
                    }
                }
                _ => Payload::Other(rest),
            },
            "log" => Payload::Log(rest),
            _ => Payload::Other(rest),
        };

        Some(Self {
            category,
            source,
            payload,
        })
    }
}

fn tag_text(value: FieldValue) -> String {
    match value {
        FieldValue::Str(s) => s,
        other => other.to_string(),
    }
}

/// Turns instrumentation events into log records
///
/// # Example
///
/// ```
/// use rust_telemetry_facade::prelude::*;
/// use std::time::Duration;
///
/// let memory = MemoryAppender::new();
/// let adapter = CallInstrumentation::new(Logger::new(memory.clone()));
///
/// adapter.record(InstrumentEvent::call(
///     "orders.rs:88",
///     Duration::from_millis(120),
///     "SELECT * FROM orders WHERE id = $1",
///     vec![FieldValue::from(7)],
/// ));
///
/// assert_eq!(memory.records()[0].level, Some(LogLevel::Warn));
/// ```
#[derive(Debug, Clone)]
pub struct CallInstrumentation {
    logger: Logger,
}

impl CallInstrumentation {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }

    /// Log one event. Records carry `type` and `source` from the event tags.
    #[track_caller]
    pub fn record(&self, event: InstrumentEvent) {
        let caller = caller_of(Location::caller());
        self.record_at(caller, event);
    }

    /// Log a positional event tuple as delivered by ORM logging callbacks
    #[track_caller]
    pub fn print(&self, values: Vec<FieldValue>) {
        let caller = caller_of(Location::caller());
        if values.len() < 2 {
            let dump = FieldValue::List(values).to_string();
            self.logger.info().log_at(caller, fields!["msg" => dump]);
            return;
        }
        if let Some(event) = InstrumentEvent::from_values(values) {
            self.record_at(caller, event);
        }
    }

    /// Run `call`, then log it as a timed statement
    #[track_caller]
    pub fn time<T, F>(&self, source: &str, statement: &str, values: Vec<FieldValue>, call: F) -> T
    where
        F: FnOnce() -> T,
    {
        let caller = caller_of(Location::caller());
        let started = Instant::now();
        let result = call();
        let event = InstrumentEvent::call(source, started.elapsed(), statement, values);
        self.record_at(caller, event);
        result
    }

    fn record_at(&self, caller: Option<String>, event: InstrumentEvent) {
        let logger = self
            .logger
            .with(fields!["type" => event.category, "source" => event.source]);

        match event.payload {
            Payload::Call {
                duration,
                statement,
                values,
            } => log_call(&logger, caller, duration, statement, values),
            Payload::Log(values) => log_values(&logger, caller, values),
            Payload::Other(values) => {
                let dump = FieldValue::List(values).to_string();
                logger.info().log_at(caller, fields!["msg" => dump]);
            }
        }
    }
}

fn caller_of(location: &Location<'_>) -> Option<String> {
    Some(format!("{}:{}", location.file(), location.line()))
}

fn log_call(
    logger: &Logger,
    caller: Option<String>,
    duration: Duration,
    statement: String,
    values: Vec<FieldValue>,
) {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    let mut pairs: Fields = fields!["query_us" => micros, "query" => statement];
    if !values.is_empty() {
        pairs.push(("values".to_string(), FieldValue::Str(FieldValue::List(values).to_string())));
    }

    logger.with_level(severity_for(duration)).log_at(caller, pairs);
}

fn log_values(logger: &Logger, caller: Option<String>, mut values: Vec<FieldValue>) {
    if values.len() == 1 {
        match values.remove(0) {
            FieldValue::Error(err) => {
                logger
                    .error()
                    .log_at(caller, fields!["msg" => err.message()]);
            }
            value => {
                logger.info().log_at(caller, fields!["msg" => value.to_string()]);
            }
        }
        return;
    }

    let dump = FieldValue::List(values).to_string();
    logger.info().log_at(caller, fields!["msg" => dump]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appenders::MemoryAppender;
    use crate::core::ErrorValue;

    fn adapter() -> (CallInstrumentation, MemoryAppender) {
        let memory = MemoryAppender::new();
        (CallInstrumentation::new(Logger::new(memory.clone())), memory)
    }

    #[test]
    fn test_severity_boundaries() {
        assert_eq!(severity_for(Duration::from_millis(50)), LogLevel::Debug);
        assert_eq!(severity_for(Duration::from_micros(50_001)), LogLevel::Info);
        assert_eq!(severity_for(Duration::from_millis(100)), LogLevel::Info);
        assert_eq!(severity_for(Duration::from_micros(100_001)), LogLevel::Warn);
        assert_eq!(severity_for(Duration::ZERO), LogLevel::Debug);
    }

    #[test]
    fn test_call_fields() {
        let (adapter, memory) = adapter();
        adapter.record(InstrumentEvent::call(
            "repo.rs:10",
            Duration::from_micros(1_500),
            "SELECT 1",
            Vec::new(),
        ));

        let record = &memory.records()[0];
        assert_eq!(record.level, Some(LogLevel::Debug));
        assert_eq!(record.keys(), vec!["type", "source", "query_us", "query"]);
        assert_eq!(record.get("query_us"), Some(&FieldValue::Uint(1_500)));
    }

    #[test]
    fn test_call_with_values() {
        let (adapter, memory) = adapter();
        adapter.record(InstrumentEvent::call(
            "repo.rs:10",
            Duration::from_millis(70),
            "SELECT * FROM t WHERE a = ? AND b = ?",
            vec![FieldValue::from(1), FieldValue::from("x")],
        ));

        let record = &memory.records()[0];
        assert_eq!(record.level, Some(LogLevel::Info));
        assert_eq!(record.get("values").map(ToString::to_string).as_deref(), Some("[1 x]"));
    }

    #[test]
    fn test_single_error_value() {
        let (adapter, memory) = adapter();
        adapter.record(InstrumentEvent::log(
            "db.go:1",
            vec![FieldValue::Error(ErrorValue::new("connection lost"))],
        ));

        let records = memory.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].level, Some(LogLevel::Error));
        assert_eq!(records[0].message().as_deref(), Some("connection lost"));
    }

    #[test]
    fn test_single_plain_value() {
        let (adapter, memory) = adapter();
        adapter.record(InstrumentEvent::log("db.rs:1", vec![FieldValue::from("migrated")]));

        let record = &memory.records()[0];
        assert_eq!(record.level, Some(LogLevel::Info));
        assert_eq!(record.message().as_deref(), Some("migrated"));
    }

    #[test]
    fn test_multi_value_log() {
        let (adapter, memory) = adapter();
        adapter.record(InstrumentEvent::log(
            "db.rs:1",
            vec![FieldValue::from("rows"), FieldValue::from(3)],
        ));

        assert_eq!(memory.records()[0].message().as_deref(), Some("[rows 3]"));
    }

    #[test]
    fn test_from_values_classifies_sql() {
        let event = InstrumentEvent::from_values(vec![
            FieldValue::from("sql"),
            FieldValue::from("repo.rs:3"),
            FieldValue::from(Duration::from_millis(5)),
            FieldValue::from("DELETE FROM t"),
            FieldValue::List(vec![]),
        ])
        .unwrap();

        assert_eq!(event.category, "sql");
        assert!(matches!(event.payload, Payload::Call { .. }));
    }

    #[test]
    fn test_from_values_malformed_sql_is_other() {
        let event = InstrumentEvent::from_values(vec![
            FieldValue::from("sql"),
            FieldValue::from("repo.rs:3"),
            FieldValue::from("not a duration"),
        ])
        .unwrap();

        assert!(matches!(event.payload, Payload::Other(_)));
        assert!(InstrumentEvent::from_values(vec![FieldValue::from("sql")]).is_none());
    }

    #[test]
    fn test_print_short_tuple_dumps_values() {
        let (adapter, memory) = adapter();
        adapter.print(vec![FieldValue::from("lonely")]);

        let record = &memory.records()[0];
        assert_eq!(record.level, Some(LogLevel::Info));
        assert_eq!(record.message().as_deref(), Some("[lonely]"));
        assert!(!record.has_field("type"));
    }

    #[test]
    fn test_print_other_category() {
        let (adapter, memory) = adapter();
        adapter.print(vec![
            FieldValue::from("trace"),
            FieldValue::from("x.rs:1"),
            FieldValue::from(1),
            FieldValue::from(2),
        ]);

        let record = &memory.records()[0];
        assert_eq!(record.level, Some(LogLevel::Info));
        assert_eq!(record.message().as_deref(), Some("[1 2]"));
        assert_eq!(record.get("type").and_then(FieldValue::as_str), Some("trace"));
    }

    #[test]
    fn test_caller_is_adapter_call_site() {
        let (adapter, memory) = adapter();
        let line = line!() + 1;
        adapter.record(InstrumentEvent::log("x", vec![FieldValue::from("hi")]));

        let caller = memory.records()[0].caller.clone().unwrap();
        assert!(caller.ends_with(&format!("instrument.rs:{}", line)), "caller was {}", caller);
    }

    #[test]
    fn test_time_returns_result() {
        let (adapter, memory) = adapter();
        let answer = adapter.time("calc.rs:1", "SELECT 42", Vec::new(), || 42);

        assert_eq!(answer, 42);
        assert_eq!(memory.records()[0].get("query").and_then(FieldValue::as_str), Some("SELECT 42"));
    }
}
