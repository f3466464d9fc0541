//! Log record model.
//!
//! [`LogData`] is the in-flight unit produced by stream pumps and the
//! orchestrator. [`LogRecord`] is its four-field persisted shape
//! (`timestamp`, `type`, `payload`, `msg`) shared by every sink encoding
//! and by the pretty-printer.

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::stream::{PayloadType, StreamType};

/// One observed unit of traffic or bookkeeping.
///
/// The timestamp is taken when the record is constructed, i.e. when the
/// unit was recognized, not when its first byte arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogData {
    timestamp: DateTime<Utc>,
    stream: StreamType,
    payload_type: PayloadType,
    payload: Bytes,
}

impl LogData {
    /// Construct a record stamped with the current time.
    #[must_use]
    pub fn new(stream: StreamType, payload_type: PayloadType, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp: Utc::now(),
            stream,
            payload_type,
            payload: payload.into(),
        }
    }

    /// Unframed bytes observed on `stream`.
    #[must_use]
    pub fn raw(stream: StreamType, payload: impl Into<Bytes>) -> Self {
        Self::new(stream, PayloadType::Raw, payload)
    }

    /// Bookkeeping text attributed to the stderr channel.
    #[must_use]
    pub fn bookkeeping(payload_type: PayloadType, text: impl Into<String>) -> Self {
        Self::new(StreamType::Stderr, payload_type, text.into())
    }

    /// Recognition time.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Originating channel.
    #[must_use]
    pub fn stream(&self) -> StreamType {
        self.stream
    }

    /// Content classification.
    #[must_use]
    pub fn payload_type(&self) -> PayloadType {
        self.payload_type
    }

    /// Raw content bytes.
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}

/// Persisted shape of a log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// RFC 3339 timestamp with nanosecond precision.
    #[serde(with = "rfc3339_nanos")]
    pub timestamp: DateTime<Utc>,
    /// Originating channel, e.g. `<stdout>`.
    #[serde(rename = "type")]
    pub stream: StreamType,
    /// Content classification, e.g. `json`.
    pub payload: PayloadType,
    /// Content; the message body itself for `json` records.
    pub msg: String,
}

impl LogRecord {
    /// Timestamp formatted the way every encoding writes it.
    #[must_use]
    pub fn timestamp_string(&self) -> String {
        format_timestamp(&self.timestamp)
    }
}

impl From<LogData> for LogRecord {
    fn from(data: LogData) -> Self {
        Self {
            timestamp: data.timestamp,
            stream: data.stream,
            payload: data.payload_type,
            msg: String::from_utf8_lossy(&data.payload).into_owned(),
        }
    }
}

/// Format a timestamp as RFC 3339 in UTC with nanoseconds.
#[must_use]
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse a timestamp written by [`format_timestamp`] (any RFC 3339 offset is accepted).
///
/// # Errors
///
/// Returns the chrono parse error when `raw` is not RFC 3339.
pub fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|ts| ts.with_timezone(&Utc))
}

mod rfc3339_nanos {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        timestamp: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_timestamp(timestamp))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}
