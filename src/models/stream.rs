//! Stream and payload classification tags.
//!
//! Both enums carry an explicit string contract (`as_str` / [`FromStr`])
//! which is the only encoding used on the wire; serde goes through it
//! rather than deriving names from the variant identifiers.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which child-process channel a record originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamType {
    /// Traffic from the editor to the language server.
    Stdin,
    /// Traffic from the language server to the editor.
    Stdout,
    /// Diagnostic output of the language server; never framed.
    Stderr,
}

impl StreamType {
    /// All stream tags in channel order.
    pub const ALL: [Self; 3] = [Self::Stdin, Self::Stdout, Self::Stderr];

    /// Wire representation, e.g. `<stdin>`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdin => "<stdin>",
            Self::Stdout => "<stdout>",
            Self::Stderr => "<stderr>",
        }
    }

    /// Whether bytes on this stream carry `Content-Length` framed messages.
    #[must_use]
    pub const fn is_framed(self) -> bool {
        !matches!(self, Self::Stderr)
    }
}

impl Display for StreamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StreamType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "<stdin>" => Ok(Self::Stdin),
            "<stdout>" => Ok(Self::Stdout),
            "<stderr>" => Ok(Self::Stderr),
            other => Err(format!("unknown stream type: {other}")),
        }
    }
}

/// Classification of a log record's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    /// A complete, length-delimited message body.
    Json,
    /// Unframed bytes: stderr chatter or bookkeeping text.
    Raw,
    /// Session start marker.
    RawStart,
    /// Session end marker.
    RawEnd,
    /// Bytes that failed header parsing.
    Invalid,
}

impl PayloadType {
    /// Wire representation, e.g. `json`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Raw => "raw",
            Self::RawStart => "start",
            Self::RawEnd => "end",
            Self::Invalid => "invalid",
        }
    }
}

impl Display for PayloadType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayloadType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "raw" => Ok(Self::Raw),
            "start" => Ok(Self::RawStart),
            "end" => Ok(Self::RawEnd),
            "invalid" => Ok(Self::Invalid),
            other => Err(format!("unknown payload type: {other}")),
        }
    }
}

macro_rules! serde_via_str {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

serde_via_str!(StreamType);
serde_via_str!(PayloadType);
