//! Measurement points and their line protocol encoding

use crate::core::FieldValue;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::fmt::Write;

/// String-valued, indexed dimensions of a point
pub type Tags = BTreeMap<String, String>;

/// Scalar payload values of a point
pub type PointFields = BTreeMap<String, FieldValue>;

/// Field carrying the numeric value of every point
pub const VALUE_FIELD: &str = "value";

/// One timestamped measurement. The point owns its tags and fields, so
/// nothing the caller does after submission can reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementPoint {
    pub measurement: String,
    pub tags: Tags,
    pub fields: PointFields,
    pub timestamp: DateTime<Utc>,
}

impl MeasurementPoint {
    /// Build a point; `fields["value"]` is always set to `value`
    pub fn new(
        measurement: impl Into<String>,
        value: f64,
        tags: Option<Tags>,
        fields: Option<PointFields>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let mut fields = fields.unwrap_or_default();
        fields.insert(VALUE_FIELD.to_string(), FieldValue::Float(value));

        Self {
            measurement: measurement.into(),
            tags: tags.unwrap_or_default(),
            fields,
            timestamp,
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.fields.get(VALUE_FIELD).and_then(FieldValue::as_f64)
    }

    /// Encode as one InfluxDB line protocol line with a nanosecond timestamp.
    ///
    /// Null fields and non-finite floats have no line protocol form and are
    /// left out.
    pub fn to_line_protocol(&self) -> String {
        let mut line = String::with_capacity(64);
        escape_into(&mut line, &self.measurement, &[',', ' ']);

        for (key, value) in &self.tags {
            line.push(',');
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            escape_into(&mut line, value, &[',', '=', ' ']);
        }

        let mut first = true;
        for (key, value) in &self.fields {
            let Some(encoded) = encode_field(value) else {
                continue;
            };
            line.push(if first { ' ' } else { ',' });
            first = false;
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            line.push_str(&encoded);
        }

        if let Some(nanos) = self.timestamp.timestamp_nanos_opt() {
            let _ = write!(line, " {}", nanos);
        }
        line
    }
}

/// Line breaks never reach the output: one point is always one line
fn escape_into(out: &mut String, raw: &str, special: &[char]) {
    for c in raw.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => {
                if special.contains(&c) || c == '\\' {
                    out.push('\\');
                }
                out.push(c);
            }
        }
    }
}

fn quoted(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    escape_into(&mut out, raw, &['"']);
    out.push('"');
    out
}

fn encode_field(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Float(f) if f.is_finite() => Some(format!("{}", f)),
        FieldValue::Float(_) | FieldValue::Null => None,
        FieldValue::Int(i) => Some(format!("{}i", i)),
        FieldValue::Uint(u) => Some(match i64::try_from(*u) {
            Ok(i) => format!("{}i", i),
            Err(_) => format!("{}", *u as f64),
        }),
        FieldValue::Bool(b) => Some(b.to_string()),
        FieldValue::Duration(d) => Some(format!("{}i", i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))),
        FieldValue::Str(s) => Some(quoted(s)),
        other => Some(quoted(&other.to_string())),
    }
}
