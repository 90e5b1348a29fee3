//! Console appender implementation

use crate::core::{
    output_format::format_human, Appender, LogRecord, LoggerConfig, OutputFormat, Result,
    TimestampFormat,
};
use std::io::Write;

/// Writes one line per record to stdout
pub struct ConsoleAppender {
    use_colors: bool,
    timestamp_format: TimestampFormat,
    output_format: OutputFormat,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self::from_config(&LoggerConfig::default())
    }

    pub fn from_config(config: &LoggerConfig) -> Self {
        Self {
            use_colors: config.use_colors,
            timestamp_format: config.timestamp_format.clone(),
            output_format: config.output_format,
        }
    }

    /// Set the output format for this appender
    ///
    /// # Example
    ///
    /// ```
    /// use rust_telemetry_facade::appenders::ConsoleAppender;
    /// use rust_telemetry_facade::OutputFormat;
    ///
    /// let appender = ConsoleAppender::new()
    ///     .with_output_format(OutputFormat::Json);
    /// ```
    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn render(&self, record: &LogRecord) -> String {
        match self.output_format {
            OutputFormat::Human if self.use_colors => self.format_colored(record),
            _ => self.output_format.format(record, &self.timestamp_format),
        }
    }

    #[cfg(feature = "console")]
    fn format_colored(&self, record: &LogRecord) -> String {
        use colored::Colorize;
        format_human(record, &self.timestamp_format, |level, label| {
            label.color(level.color_code()).to_string()
        })
    }

    #[cfg(not(feature = "console"))]
    fn format_colored(&self, record: &LogRecord) -> String {
        format_human(record, &self.timestamp_format, |_, label| label.to_string())
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        let line = self.render(record);
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        std::io::stdout().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}
