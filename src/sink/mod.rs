//! Log sinks: where recorded traffic ends up.
//!
//! Stream pumps never touch a sink. They enqueue [`LogData`] into a bounded
//! mailbox and a single consumer ([`run_sink`]) owns the sink and writes
//! records in dequeue order.
//!
//! Encodings:
//! - [`TextSink`]: `key=value` text lines.
//! - [`JsonLinesSink`]: one JSON object per line.
//! - [`GzipSink`]: JSON lines through a gzip encoder.
//!
//! [`LogData`]: crate::models::LogData

pub mod consumer;
pub mod jsonl;
pub mod text;

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use clap::ValueEnum;

use crate::models::LogRecord;
use crate::{AppError, Result};

pub use consumer::run_sink;
pub use jsonl::{GzipSink, JsonLinesSink};
pub use text::TextSink;

/// Persisted log encoding, selected with `record --format`.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, ValueEnum)]
pub enum LogFormat {
    /// `key=value` text lines.
    #[default]
    Text,
    /// JSON lines.
    Json,
    /// Gzip-compressed JSON lines.
    JsonGzip,
}

/// Destination for log records.
///
/// Implementations must be [`Send`] so the consumer task can own them.
pub trait LogSink: Send {
    /// Encode and write a single record.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Log`] if encoding or writing fails.
    fn write_record(&mut self, record: &LogRecord) -> Result<()>;

    /// Flush buffered output and finalize the encoding.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Log`] if flushing fails.
    fn finish(&mut self) -> Result<()>;
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn write_record(&mut self, record: &LogRecord) -> Result<()> {
        (**self).write_record(record)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// Create (or truncate) `path` and wrap it in the sink for `format`.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the file cannot be created.
pub fn open_log_file(path: impl AsRef<Path>, format: LogFormat) -> Result<Box<dyn LogSink>> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|err| {
        AppError::Io(format!("cannot open log file: {}, caused by {err}", path.display()))
    })?;
    let writer = BufWriter::new(file);

    Ok(match format {
        LogFormat::Text => Box::new(TextSink::new(writer)),
        LogFormat::Json => Box::new(JsonLinesSink::new(writer)),
        LogFormat::JsonGzip => Box::new(GzipSink::new(writer)),
    })
}
