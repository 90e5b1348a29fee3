//! Error notifiers
//!
//! A [`Notifier`] forwards unexpected errors to whoever has to hear about
//! them. The implementations here are the in-process ones: a buffer for
//! assertions, a notifier that fails the running test, and one that writes
//! to a [`Logger`].

use crate::core::{ErrorValue, FieldValue, Logger, Result};
use crate::fields;
use parking_lot::Mutex;
use std::error::Error;

/// Request an error occurred while serving
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: String,
    pub url: String,
}

impl RequestInfo {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }
}

/// One delivered notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub error: ErrorValue,
    pub request: Option<RequestInfo>,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, error: &ErrorValue, request: Option<&RequestInfo>) -> Result<()>;

    /// Notify about any error value, rendering its source chain
    fn notify_error(&self, err: &(dyn Error + 'static), request: Option<&RequestInfo>) -> Result<()> {
        self.notify(&ErrorValue::from_error(err), request)
    }
}

/// Keeps every notice for later inspection
#[derive(Debug, Default)]
pub struct BufferNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl BufferNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.notices.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.lock().is_empty()
    }
}

impl Notifier for BufferNotifier {
    fn notify(&self, error: &ErrorValue, request: Option<&RequestInfo>) -> Result<()> {
        self.notices.lock().push(Notice {
            error: error.clone(),
            request: request.cloned(),
        });
        Ok(())
    }
}

/// Panics on every notice. Install it where no error is expected so that
/// one surfacing fails the test.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicNotifier;

impl Notifier for PanicNotifier {
    fn notify(&self, error: &ErrorValue, request: Option<&RequestInfo>) -> Result<()> {
        match request {
            Some(request) => panic!(
                "unexpected error notification during {} {}: {}",
                request.method, request.url, error
            ),
            None => panic!("unexpected error notification: {}", error),
        }
    }
}

/// Writes each notice as an Error record
#[derive(Debug, Clone)]
pub struct LogNotifier {
    logger: Logger,
}

impl LogNotifier {
    pub fn new(logger: Logger) -> Self {
        Self { logger }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, error: &ErrorValue, request: Option<&RequestInfo>) -> Result<()> {
        let mut logger = self.logger.with_error(error);
        if let Some(request) = request {
            logger = logger.with(fields![
                "method" => request.method.as_str(),
                "url" => request.url.as_str(),
            ]);
        }
        logger.log(fields!["err" => FieldValue::Error(error.clone())]);
        Ok(())
    }
}
