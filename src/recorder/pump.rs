//! Stream pump: passthrough with a logging tap.
//!
//! One pump runs per child stream. Every byte read from the source is
//! written to the destination immediately and unmodified; classification
//! for the log happens afterwards and never delays forwarding.
//!
//! - `<stderr>`: each non-empty read becomes one `raw` record.
//! - `<stdin>` / `<stdout>`: reads accumulate in a pending-payload buffer
//!   and [`MessageCodec`] turns it into `json` and `invalid` records.
//!
//! A zero-byte read is not treated as the end of the stream: the pump idles
//! for a short backoff and reads again. Only the orchestrator decides when a
//! stream is finished, by cancelling the pump.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::Decoder;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::config::RecorderConfig;
use crate::framing::{Frame, MessageCodec};
use crate::models::{LogData, PayloadType, StreamType};
use crate::{AppError, Result};

/// Per-pump tunables, derived from [`RecorderConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpSettings {
    /// Maximum bytes read per iteration.
    pub read_buffer_bytes: usize,
    /// Largest accepted `Content-Length`.
    pub max_message_bytes: usize,
    /// Pause after a zero-byte read or a failed read.
    pub idle_backoff: Duration,
    /// Consecutive I/O failures tolerated before the pump stops.
    pub max_io_failures: u32,
}

impl From<&RecorderConfig> for PumpSettings {
    fn from(config: &RecorderConfig) -> Self {
        Self {
            read_buffer_bytes: config.read_buffer_bytes,
            max_message_bytes: config.max_message_bytes,
            idle_backoff: config.idle_backoff(),
            max_io_failures: config.max_io_failures,
        }
    }
}

impl Default for PumpSettings {
    fn default() -> Self {
        Self::from(&RecorderConfig::default())
    }
}

/// Classification state of one pump.
enum Tap {
    Raw,
    Framed {
        codec: MessageCodec,
        pending: BytesMut,
    },
}

impl Tap {
    fn for_stream(stream: StreamType, settings: &PumpSettings) -> Self {
        if stream.is_framed() {
            Self::Framed {
                codec: MessageCodec::with_max_length(settings.max_message_bytes),
                pending: BytesMut::with_capacity(settings.read_buffer_bytes * 2),
            }
        } else {
            Self::Raw
        }
    }

    /// Classify freshly read bytes into zero or more records.
    fn classify(&mut self, stream: StreamType, bytes: &[u8]) -> Result<Vec<LogData>> {
        match self {
            Self::Raw => Ok(vec![LogData::raw(stream, Bytes::copy_from_slice(bytes))]),
            Self::Framed { codec, pending } => {
                pending.extend_from_slice(bytes);
                let mut records = Vec::new();
                while let Some(frame) = codec.decode(pending)? {
                    records.push(match frame {
                        Frame::Message(body) => LogData::new(stream, PayloadType::Json, body),
                        Frame::Invalid(run) => {
                            LogData::new(stream, PayloadType::Invalid, run.to_string())
                        }
                    });
                }
                Ok(records)
            }
        }
    }
}

/// Pump `source` into `dest` for `stream`, tapping records into `tx`,
/// until `cancel` fires.
///
/// Enqueueing blocks while the mailbox is full; records are never dropped.
/// If the mailbox is closed the pump stops quietly.
///
/// # Errors
///
/// Returns [`AppError::Io`] after `max_io_failures` consecutive read or
/// write failures. Other streams are unaffected.
pub async fn run_pump<R, W>(
    stream: StreamType,
    mut source: R,
    mut dest: W,
    tx: mpsc::Sender<LogData>,
    cancel: CancellationToken,
    settings: PumpSettings,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    let mut chunk = vec![0u8; settings.read_buffer_bytes];
    let mut tap = Tap::for_stream(stream, &settings);
    let mut failures = 0u32;

    loop {
        let read = tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!(%stream, "pump: cancellation received, stopping");
                break;
            }

            read = source.read(&mut chunk) => read,
        };

        let n = match read {
            Ok(0) => {
                trace!(%stream, "pump: empty read");
                if idle(&cancel, settings.idle_backoff).await {
                    break;
                }
                continue;
            }
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => {
                failures += 1;
                warn!(%stream, %err, failures, "pump: read failed");
                if failures >= settings.max_io_failures {
                    return Err(AppError::Io(format!(
                        "{stream} read failed {failures} times in a row: {err}"
                    )));
                }
                if idle(&cancel, settings.idle_backoff).await {
                    break;
                }
                continue;
            }
        };
        let bytes = &chunk[..n];

        let forwarded = forward(&mut dest, bytes).await;

        for record in tap.classify(stream, bytes)? {
            if tx.send(record).await.is_err() {
                debug!(%stream, "pump: record mailbox closed, stopping");
                return Ok(());
            }
        }

        match forwarded {
            Ok(()) => failures = 0,
            Err(err) => {
                failures += 1;
                warn!(%stream, %err, failures, "pump: write failed");
                if failures >= settings.max_io_failures {
                    return Err(AppError::Io(format!(
                        "{stream} write failed {failures} times in a row: {err}"
                    )));
                }
            }
        }
    }

    Ok(())
}

async fn forward<W: AsyncWrite + Unpin>(dest: &mut W, bytes: &[u8]) -> std::io::Result<()> {
    dest.write_all(bytes).await?;
    dest.flush().await
}

/// Sleep for `backoff`; returns `true` if cancelled meanwhile.
async fn idle(cancel: &CancellationToken, backoff: Duration) -> bool {
    tokio::select! {
        () = cancel.cancelled() => true,
        () = tokio::time::sleep(backoff) => false,
    }
}
