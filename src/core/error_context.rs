//! Error enrichment
//!
//! Turns an error value into loggable context: a human message built from the
//! whole source chain, the key-values carried by any [`ContextError`] in that
//! chain, and a stack trace when one is available.

use super::field::{collect_fields, FieldValue, Fields};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::fmt;

/// An error rendered to its message, usable as a field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorValue {
    message: String,
}

impl ErrorValue {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Render `err` and all of its sources as `outer: inner: root`
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        Self {
            message: render_chain(err),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ErrorValue {}

/// Error wrapper that carries structured key-values and a stack trace
///
/// # Example
///
/// ```
/// use rust_telemetry_facade::core::{ContextError, ErrorContext};
///
/// let err = ContextError::new("connection reset")
///     .with_message("loading order")
///     .with_field("order_id", 42);
///
/// let ctx = ErrorContext::extract(&err);
/// assert_eq!(ctx.message(), "loading order: connection reset");
/// assert_eq!(ctx.fields().len(), 1);
/// ```
#[derive(Debug)]
pub struct ContextError {
    message: Option<String>,
    source: Box<dyn Error + Send + Sync + 'static>,
    fields: Fields,
    stacktrace: Option<String>,
}

impl ContextError {
    /// Wrap an error, capturing a backtrace if `RUST_BACKTRACE` enables it
    pub fn new<E>(source: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        let backtrace = Backtrace::capture();
        let stacktrace = match backtrace.status() {
            BacktraceStatus::Captured => Some(backtrace.to_string()),
            _ => None,
        };

        Self {
            message: None,
            source: source.into(),
            fields: Vec::new(),
            stacktrace,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_fields<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<FieldValue>,
    {
        self.fields.extend(collect_fields(pairs));
        self
    }

    #[must_use]
    pub fn with_stacktrace(mut self, stacktrace: impl Into<String>) -> Self {
        self.stacktrace = Some(stacktrace.into());
        self
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn stacktrace(&self) -> Option<&str> {
        self.stacktrace.as_deref()
    }
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message {
            Some(ref message) => write!(f, "{}", message),
            None => write!(f, "{}", self.source),
        }
    }
}

impl Error for ContextError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Message, key-values and stack trace derived from one error value
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorContext {
    message: String,
    fields: Fields,
    stacktrace: Option<String>,
}

impl ErrorContext {
    /// Read the context carried by `err` without capturing anything new
    pub fn extract(err: &(dyn Error + 'static)) -> Self {
        let mut fields = Vec::new();
        let mut stacktrace = None;

        for cause in chain(err) {
            if let Some(ctx) = cause.downcast_ref::<ContextError>() {
                fields.extend(ctx.fields.iter().cloned());
                if stacktrace.is_none() {
                    stacktrace = ctx.stacktrace.clone().filter(|s| !s.is_empty());
                }
            }
        }

        Self {
            message: render_chain(err),
            fields,
            stacktrace,
        }
    }

    /// Like [`extract`](Self::extract), but records the current stack when the
    /// error chain carries none
    pub fn wrap(err: &(dyn Error + 'static)) -> Self {
        let mut ctx = Self::extract(err);
        if ctx.stacktrace.is_none() {
            ctx.stacktrace = Some(Backtrace::force_capture().to_string());
        }
        ctx
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn fields(&self) -> &[(String, FieldValue)] {
        &self.fields
    }

    pub fn stacktrace(&self) -> Option<&str> {
        self.stacktrace.as_deref()
    }

    /// Context pairs followed by `msg` and, when non-empty, `stacktrace`
    pub fn into_fields(self) -> Fields {
        let mut fields = self.fields;
        fields.push(("msg".to_string(), FieldValue::Str(self.message)));
        if let Some(stacktrace) = self.stacktrace.filter(|s| !s.is_empty()) {
            fields.push(("stacktrace".to_string(), FieldValue::Str(stacktrace)));
        }
        fields
    }
}

fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

/// Join the messages of an error chain with `": "`.
///
/// A `ContextError` without its own message displays its source, so it is
/// skipped to avoid printing the source twice.
pub(crate) fn render_chain(err: &(dyn Error + 'static)) -> String {
    chain(err)
        .filter_map(|cause| match cause.downcast_ref::<ContextError>() {
            Some(ctx) => ctx.message.clone(),
            None => Some(cause.to_string()),
        })
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Outer(std::io::Error);

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "reading config")
        }
    }

    impl Error for Outer {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_render_plain_chain() {
        let err = Outer(std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"));
        assert_eq!(render_chain(&err), "reading config: no such file");
    }

    #[test]
    fn test_extract_plain_error_has_no_context() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let ctx = ErrorContext::extract(&err);

        assert_eq!(ctx.message(), "boom");
        assert!(ctx.fields().is_empty());
        assert!(ctx.stacktrace().is_none());
    }

    #[test]
    fn test_extract_context_error() {
        let err = ContextError::new("timeout")
            .with_field("order_id", 7)
            .with_stacktrace("frame 0\nframe 1");
        let ctx = ErrorContext::extract(&err);

        assert_eq!(ctx.message(), "timeout");
        assert_eq!(ctx.fields()[0].0, "order_id");
        assert_eq!(ctx.stacktrace(), Some("frame 0\nframe 1"));
    }

    #[test]
    fn test_extract_nested_context_errors() {
        let inner = ContextError::new("refused").with_field("host", "db-1");
        let outer = ContextError::new(inner)
            .with_message("saving user")
            .with_field("user_id", 3);
        let ctx = ErrorContext::extract(&outer);

        assert_eq!(ctx.message(), "saving user: refused");
        let keys: Vec<&str> = ctx.fields().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["user_id", "host"]);
    }

    #[test]
    fn test_empty_stacktrace_is_ignored() {
        let err = ContextError::new("x").with_stacktrace("");
        let ctx = ErrorContext::extract(&err);
        assert!(ctx.stacktrace().is_none());

        let fields = ctx.into_fields();
        assert!(fields.iter().all(|(k, _)| k != "stacktrace"));
    }

    #[test]
    fn test_wrap_captures_stacktrace() {
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let ctx = ErrorContext::wrap(&err);
        assert!(ctx.stacktrace().is_some_and(|s| !s.is_empty()));
    }

    #[test]
    fn test_into_fields_order() {
        let err = ContextError::new("bad").with_field("k", "v").with_stacktrace("st");
        let fields = ErrorContext::extract(&err).into_fields();
        let keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["k", "msg", "stacktrace"]);
    }
}
