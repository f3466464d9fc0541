//! Recorder configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

fn default_channel_capacity() -> usize {
    32
}

fn default_read_buffer_bytes() -> usize {
    4096
}

fn default_max_message_bytes() -> usize {
    crate::framing::DEFAULT_MAX_MESSAGE_BYTES
}

fn default_grace_period_ms() -> u64 {
    100
}

fn default_idle_backoff_ms() -> u64 {
    10
}

fn default_max_io_failures() -> u32 {
    5
}

fn default_kill_timeout_ms() -> u64 {
    2000
}

fn default_true() -> bool {
    true
}

/// Tunables for a recording session, optionally loaded from a TOML file.
///
/// Every field has a default, so an empty document is a valid configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RecorderConfig {
    /// Capacity of the bounded record mailbox; producers block when it is full.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Maximum number of bytes a stream pump reads per iteration.
    #[serde(default = "default_read_buffer_bytes")]
    pub read_buffer_bytes: usize,
    /// Largest accepted `Content-Length`; bigger values are a framing error.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
    /// Drain window after child exit, also the bound for joining pumps.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,
    /// Pause after a zero-byte read before the pump reads again.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
    /// Consecutive read/write failures tolerated before a pump stops.
    #[serde(default = "default_max_io_failures")]
    pub max_io_failures: u32,
    /// Time the child gets to exit after a forwarded termination signal.
    #[serde(default = "default_kill_timeout_ms")]
    pub kill_timeout_ms: u64,
    /// Whether the recorder's environment is captured as a bookkeeping record.
    #[serde(default = "default_true")]
    pub capture_environment: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            read_buffer_bytes: default_read_buffer_bytes(),
            max_message_bytes: default_max_message_bytes(),
            grace_period_ms: default_grace_period_ms(),
            idle_backoff_ms: default_idle_backoff_ms(),
            max_io_failures: default_max_io_failures(),
            kill_timeout_ms: default_kill_timeout_ms(),
            capture_environment: true,
        }
    }
}

impl RecorderConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Drain window after the child exits.
    #[must_use]
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Pause inserted after a zero-byte read.
    #[must_use]
    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }

    /// Time allowed for the child to exit after a forwarded signal.
    #[must_use]
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }

    /// Check that every size, count and timer is usable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(AppError::Config(
                "channel_capacity must be greater than zero".into(),
            ));
        }
        if self.read_buffer_bytes == 0 {
            return Err(AppError::Config(
                "read_buffer_bytes must be greater than zero".into(),
            ));
        }
        if self.max_message_bytes == 0 {
            return Err(AppError::Config(
                "max_message_bytes must be greater than zero".into(),
            ));
        }
        if self.max_io_failures == 0 {
            return Err(AppError::Config(
                "max_io_failures must be greater than zero".into(),
            ));
        }
        // Zero would spin on a closed pipe.
        if self.idle_backoff_ms == 0 {
            return Err(AppError::Config(
                "idle_backoff_ms must be greater than zero".into(),
            ));
        }
        // Zero would cancel the pumps before the child's last output is forwarded.
        if self.grace_period_ms == 0 {
            return Err(AppError::Config(
                "grace_period_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
