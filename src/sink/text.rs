//! Plain-text log encoding.
//!
//! One record per line:
//!
//! ```text
//! timestamp=2024-05-01T10:00:00.123456789Z type=<stdout> payload=json msg="{\"id\":1}"
//! ```
//!
//! `msg` is written as a JSON string literal so embedded newlines and quotes
//! never break the one-record-per-line layout.

use std::io::Write;

use super::LogSink;
use crate::models::record::parse_timestamp;
use crate::models::LogRecord;
use crate::{AppError, Result};

/// Text encoder over any writer.
#[derive(Debug)]
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Render one record as a text line, without the trailing newline.
///
/// # Errors
///
/// Returns [`AppError::Log`] if `msg` cannot be escaped.
pub fn format_line(record: &LogRecord) -> Result<String> {
    let msg = serde_json::to_string(&record.msg)
        .map_err(|e| AppError::Log(format!("failed to escape message: {e}")))?;
    Ok(format!(
        "timestamp={} type={} payload={} msg={msg}",
        record.timestamp_string(),
        record.stream,
        record.payload,
    ))
}

/// Parse a line written by [`format_line`].
///
/// # Errors
///
/// Returns a description of the first field that does not match.
pub fn parse_line(line: &str) -> std::result::Result<LogRecord, String> {
    let (timestamp, rest) = take_field(line, "timestamp")?;
    let (stream, rest) = take_field(rest, "type")?;
    let (payload, rest) = take_field(rest, "payload")?;
    let msg = rest
        .strip_prefix("msg=")
        .ok_or_else(|| "missing field: msg".to_owned())?;

    Ok(LogRecord {
        timestamp: parse_timestamp(timestamp).map_err(|e| format!("bad timestamp: {e}"))?,
        stream: stream.parse()?,
        payload: payload.parse()?,
        msg: serde_json::from_str(msg).map_err(|e| format!("bad msg: {e}"))?,
    })
}

fn take_field<'a>(line: &'a str, key: &str) -> std::result::Result<(&'a str, &'a str), String> {
    line.strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('='))
        .and_then(|rest| rest.split_once(' '))
        .ok_or_else(|| format!("missing field: {key}"))
}

impl<W: Write + Send> LogSink for TextSink<W> {
    fn write_record(&mut self, record: &LogRecord) -> Result<()> {
        let line = format_line(record)?;
        writeln!(self.writer, "{line}")
            .map_err(|e| AppError::Log(format!("write failed: {e}")))?;
        self.writer
            .flush()
            .map_err(|e| AppError::Log(format!("flush failed: {e}")))
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| AppError::Log(format!("flush failed: {e}")))
    }
}
