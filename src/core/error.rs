//! Error types for the telemetry facade

pub type Result<T> = std::result::Result<T, TelemetryError>;

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Connection string is not syntactically a URL
    #[error("couldn't parse metrics backend url {url}: {source}")]
    UrlParse {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// Connection string parsed but has no scheme or host
    #[error("metrics backend url {url} not absolute url")]
    NotAbsolute { url: String },

    /// Backend round-trip failed
    #[error("backend {operation} failed: {message}")]
    Backend { operation: String, message: String },

    /// HTTP transport error from the InfluxDB client
    #[cfg(feature = "influxdb")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Single-writer queue already shut down
    #[error("metrics writer already stopped")]
    WriterStopped,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl TelemetryError {
    /// Create a URL parse error
    pub fn url_parse(url: impl Into<String>, source: url::ParseError) -> Self {
        TelemetryError::UrlParse {
            url: url.into(),
            source,
        }
    }

    /// Create a not-absolute URL error
    pub fn not_absolute(url: impl Into<String>) -> Self {
        TelemetryError::NotAbsolute { url: url.into() }
    }

    /// Create a backend failure for the named operation
    pub fn backend(operation: impl Into<String>, message: impl Into<String>) -> Self {
        TelemetryError::Backend {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        TelemetryError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        TelemetryError::Other(msg.into())
    }

    /// True for errors raised while parsing the backend connection string
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            TelemetryError::UrlParse { .. } | TelemetryError::NotAbsolute { .. }
        )
    }
}
