//! Record mailbox consumer.
//!
//! The only task that writes to the sink. Records are written strictly in
//! the order they leave the mailbox, so pumps never interleave partial
//! writes and no lock is needed around the sink.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::LogSink;
use crate::models::{LogData, LogRecord};
use crate::Result;

/// Drain `rx` into `sink` until every producer is gone or `cancel` fires.
///
/// On cancellation the mailbox is closed, so producers blocked on a full
/// mailbox fail fast, and every record already enqueued is still written.
/// The sink is then finished and handed back to the caller.
///
/// A record that fails to encode or write is logged and skipped; the
/// consumer keeps going.
///
/// # Errors
///
/// Returns [`crate::AppError::Log`] if finishing the sink fails.
pub async fn run_sink<S: LogSink>(
    mut rx: mpsc::Receiver<LogData>,
    mut sink: S,
    cancel: CancellationToken,
) -> Result<S> {
    let mut written = 0usize;

    loop {
        tokio::select! {
            biased;

            record = rx.recv() => {
                let Some(data) = record else {
                    debug!("log sink: all producers gone");
                    break;
                };
                write_one(&mut sink, data, &mut written);
            }

            () = cancel.cancelled() => {
                rx.close();
                while let Some(data) = rx.recv().await {
                    write_one(&mut sink, data, &mut written);
                }
                debug!("log sink: cancellation received, mailbox drained");
                break;
            }
        }
    }

    sink.finish()?;
    debug!(written, "log sink finished");
    Ok(sink)
}

fn write_one<S: LogSink>(sink: &mut S, data: LogData, written: &mut usize) {
    let record = LogRecord::from(data);
    match sink.write_record(&record) {
        Ok(()) => *written += 1,
        Err(err) => warn!(%err, stream = %record.stream, "log sink: dropping record"),
    }
}
