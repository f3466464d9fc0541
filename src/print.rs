//! Pretty-printer for persisted logs.
//!
//! Accepts every encoding the recorder writes: text lines, JSON lines, and
//! gzip-compressed JSON lines (detected from the gzip magic bytes). `json`
//! records are re-indented; every other record is printed verbatim.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::models::{LogRecord, PayloadType};
use crate::sink::text;
use crate::{AppError, Result};

/// Longest accepted log line: 64 MiB.
pub const MAX_LINE_BYTES: usize = 64 * 1024 * 1024;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a persisted log, transparently decompressing gzip.
///
/// # Errors
///
/// Returns [`AppError::Io`] if the file cannot be opened or read.
pub fn open_log_reader(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|err| {
        AppError::Io(format!("cannot open log file: {}, caused by {err}", path.display()))
    })?;
    let mut reader = BufReader::new(file);

    let head = reader.fill_buf().map_err(|err| {
        AppError::Io(format!("cannot read log file: {}, caused by {err}", path.display()))
    })?;
    if head.starts_with(&GZIP_MAGIC) {
        Ok(Box::new(BufReader::new(GzDecoder::new(reader))))
    } else {
        Ok(Box::new(reader))
    }
}

/// Parse one persisted line in either encoding.
///
/// # Errors
///
/// Returns a description of why the line is not a record.
pub fn parse_record(line: &str) -> std::result::Result<LogRecord, String> {
    if line.starts_with('{') {
        serde_json::from_str(line).map_err(|e| e.to_string())
    } else {
        text::parse_line(line)
    }
}

/// Human-readable rendering of one record, without a trailing newline.
///
/// `json` payloads are re-indented; key order and number literals are kept
/// exactly as recorded.
#[must_use]
pub fn render(record: &LogRecord) -> String {
    let timestamp = record.timestamp_string();
    if record.payload != PayloadType::Json {
        return format!(
            "{timestamp} {} [{}] {}",
            record.stream, record.payload, record.msg
        );
    }

    let pretty = serde_json::from_str::<serde_json::Value>(&record.msg)
        .ok()
        .and_then(|value| serde_json::to_string_pretty(&value).ok());
    match pretty {
        Some(body) => format!("{timestamp} {}\n{body}", record.stream),
        None => format!(
            "{timestamp} {} invalid json payload\n{}",
            record.stream, record.msg
        ),
    }
}

/// Replay every record from `reader` into `writer`.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns [`AppError::Print`] for an unparsable or oversized line and
/// [`AppError::Io`] for read or write failures.
pub fn print_log<R: BufRead, W: Write>(mut reader: R, mut writer: W) -> Result<()> {
    let mut buf = Vec::with_capacity(16 * 1024);
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| AppError::Io(format!("cannot read log: {e}")))?;
        if n == 0 {
            break;
        }
        line_no += 1;
        if buf.len() > MAX_LINE_BYTES {
            return Err(AppError::Print(format!(
                "line {line_no}: exceeds {MAX_LINE_BYTES} bytes"
            )));
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim().is_empty() {
            continue;
        }

        let record =
            parse_record(line).map_err(|e| AppError::Print(format!("line {line_no}: {e}")))?;
        writeln!(writer, "{}", render(&record))
            .map_err(|e| AppError::Io(format!("cannot write output: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::Io(format!("cannot write output: {e}")))
}
