//! JSON-lines log encoding, optionally gzip-compressed.

use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;

use super::LogSink;
use crate::models::LogRecord;
use crate::{AppError, Result};

/// Appends one JSON object per line.
///
/// Plain sinks flush after every record so a crashed session still leaves a
/// readable log behind.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
    flush_each_record: bool,
}

impl<W: Write> JsonLinesSink<W> {
    /// Sink flushing `writer` after every record.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            flush_each_record: true,
        }
    }

    /// Sink that only flushes on [`LogSink::finish`].
    pub fn buffered(writer: W) -> Self {
        Self {
            writer,
            flush_each_record: false,
        }
    }

    /// Mutable access to the underlying writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> LogSink for JsonLinesSink<W> {
    fn write_record(&mut self, record: &LogRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)
            .map_err(|e| AppError::Log(format!("failed to serialize log record: {e}")))?;
        line.push(b'\n');

        self.writer
            .write_all(&line)
            .map_err(|e| AppError::Log(format!("write failed: {e}")))?;
        if self.flush_each_record {
            self.writer
                .flush()
                .map_err(|e| AppError::Log(format!("flush failed: {e}")))?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| AppError::Log(format!("flush failed: {e}")))
    }
}

/// JSON lines compressed with gzip; the gzip trailer is written by
/// [`LogSink::finish`].
pub struct GzipSink<W: Write> {
    inner: JsonLinesSink<GzEncoder<W>>,
}

impl<W: Write> GzipSink<W> {
    /// Compress into `writer` at the default level.
    pub fn new(writer: W) -> Self {
        Self {
            inner: JsonLinesSink::buffered(GzEncoder::new(writer, Compression::default())),
        }
    }

    /// Finish the gzip stream and unwrap the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Log`] if the trailer cannot be written.
    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .finish()
            .map_err(|e| AppError::Log(format!("failed to finish gzip stream: {e}")))
    }
}

impl<W: Write + Send> LogSink for GzipSink<W> {
    fn write_record(&mut self, record: &LogRecord) -> Result<()> {
        self.inner.write_record(record)
    }

    fn finish(&mut self) -> Result<()> {
        let encoder = self.inner.get_mut();
        encoder
            .try_finish()
            .map_err(|e| AppError::Log(format!("failed to finish gzip stream: {e}")))?;
        encoder
            .get_mut()
            .flush()
            .map_err(|e| AppError::Log(format!("flush failed: {e}")))
    }
}
