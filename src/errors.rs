//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all session-level failure modes.
///
/// Per-message framing failures are not represented here; they are
/// recoverable and surface as `invalid` log records instead (see
/// [`crate::framing::FramingError`]).
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Child process pipe setup, spawn, or wait failure.
    Process(String),
    /// Stream or file-system I/O failure.
    Io(String),
    /// Log sink encoding or write failure.
    Log(String),
    /// Persisted log could not be replayed.
    Print(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Process(msg) => write!(f, "process: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Log(msg) => write!(f, "log: {msg}"),
            Self::Print(msg) => write!(f, "print: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
