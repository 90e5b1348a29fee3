//! Macros for building key-value pairs.
//!
//! Field values are heterogeneous, so a plain array of tuples does not
//! type-check. `fields!` converts each value into a
//! [`FieldValue`](crate::FieldValue) up front.
//!
//! # Examples
//!
//! ```
//! use rust_telemetry_facade::prelude::*;
//! use rust_telemetry_facade::fields;
//!
//! let logger = Logger::nop();
//!
//! logger.info().log(fields!["msg" => "server started", "port" => 8080]);
//!
//! let request = logger.with(fields!["request_id" => "abc-123", "retry" => false]);
//! request.warn().log(fields!["msg" => "slow upstream"]);
//! ```

/// Build `Vec<(String, FieldValue)>` from `key => value` pairs.
///
/// # Examples
///
/// ```
/// use rust_telemetry_facade::fields;
///
/// let pairs = fields!["user_id" => 42, "name" => "alice"];
/// assert_eq!(pairs.len(), 2);
/// assert_eq!(pairs[0].0, "user_id");
///
/// let empty = fields![];
/// assert!(empty.is_empty());
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        ::std::vec::Vec::<(::std::string::String, $crate::FieldValue)>::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        ::std::vec![$((
            ::std::string::String::from($key),
            $crate::FieldValue::from($value),
        )),+]
    };
}

/// Emit a record with a formatted `msg` field at the given level.
///
/// # Examples
///
/// ```
/// use rust_telemetry_facade::prelude::*;
/// use rust_telemetry_facade::log_msg;
///
/// let logger = Logger::nop();
/// log_msg!(logger, LogLevel::Warn, "retrying in {}s", 5);
/// ```
#[macro_export]
macro_rules! log_msg {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $logger.with_level($level).log_msg(format!($($arg)+))
    };
}
