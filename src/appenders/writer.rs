//! Appender over any `std::io::Write`

use crate::core::{Appender, LogRecord, OutputFormat, Result, TimestampFormat};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

/// Writes encoded records, one per line, to an arbitrary writer.
/// The writer is driven behind the logger's lock, so it needs no
/// synchronization of its own.
pub struct WriterAppender<W: Write + Send> {
    writer: W,
    output_format: OutputFormat,
    timestamp_format: TimestampFormat,
}

/// Appends records to a file
pub type FileAppender = WriterAppender<BufWriter<File>>;

impl<W: Write + Send> WriterAppender<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            output_format: OutputFormat::default(),
            timestamp_format: TimestampFormat::default(),
        }
    }

    #[must_use]
    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set the timestamp format for this appender
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use rust_telemetry_facade::appenders::FileAppender;
    /// use rust_telemetry_facade::TimestampFormat;
    ///
    /// let appender = FileAppender::open("/var/log/app.log")
    ///     .unwrap()
    ///     .with_timestamp_format(TimestampFormat::Iso8601);
    /// ```
    #[must_use]
    pub fn with_timestamp_format(mut self, format: TimestampFormat) -> Self {
        self.timestamp_format = format;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl FileAppender {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write + Send> Appender for WriterAppender<W> {
    fn append(&mut self, record: &LogRecord) -> Result<()> {
        let mut output = self.output_format.format(record, &self.timestamp_format);
        output.push('\n');
        self.writer.write_all(output.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "writer"
    }
}
