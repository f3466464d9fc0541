//! Shared helpers for recording-session integration tests.
//!
//! Sessions run real child processes through in-memory duplex pipes and an
//! in-memory JSON-lines sink, so every test can inspect both what the
//! editor side received and what was recorded.

#![allow(dead_code)]

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, DuplexStream};

use lsp_recorder::models::{LogRecord, PayloadType, StreamType};
use lsp_recorder::recorder::SessionOutcome;
use lsp_recorder::sink::JsonLinesSink;
use lsp_recorder::{CommandSpec, ProxyIo, Recorder, RecorderConfig, Result};

pub const PIPE_CAPACITY: usize = 64 * 1024;

/// Configuration with short timers for tests.
pub fn test_config() -> RecorderConfig {
    RecorderConfig {
        grace_period_ms: 200,
        idle_backoff_ms: 1,
        kill_timeout_ms: 2_000,
        ..RecorderConfig::default()
    }
}

/// `sh -c <script>`.
pub fn shell(script: &str) -> CommandSpec {
    CommandSpec::new("sh", ["-c", script])
}

/// Parse the JSON-lines output of a session sink.
pub fn parse_records(bytes: &[u8]) -> Vec<LogRecord> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(|line| serde_json::from_str(line).expect("every line is a record"))
        .collect()
}

/// What one finished session produced.
pub struct Recorded {
    pub outcome: Result<SessionOutcome>,
    pub records: Vec<LogRecord>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Recorded {
    /// Records observed on `stream` with `payload`.
    pub fn of(&self, stream: StreamType, payload: PayloadType) -> Vec<&LogRecord> {
        self.records
            .iter()
            .filter(|r| r.stream == stream && r.payload == payload)
            .collect()
    }

    /// Records between the bookkeeping header and the `end` record.
    pub fn traffic(&self) -> &[LogRecord] {
        let end = self.records.len().saturating_sub(1);
        &self.records[2.min(end)..end]
    }

    pub fn last(&self) -> &LogRecord {
        self.records.last().expect("at least one record")
    }
}

/// Run `command` with `stdin` as the editor side and an in-memory sink.
pub async fn record_session<I, F>(command: CommandSpec, stdin: I, shutdown: F) -> Recorded
where
    I: AsyncRead + Unpin + Send + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let (proxy_stdout, editor_stdout) = tokio::io::duplex(PIPE_CAPACITY);
    let (proxy_stderr, editor_stderr) = tokio::io::duplex(PIPE_CAPACITY);

    let stdout_reader = tokio::spawn(read_all(editor_stdout));
    let stderr_reader = tokio::spawn(read_all(editor_stderr));

    let io = ProxyIo {
        stdin,
        stdout: proxy_stdout,
        stderr: proxy_stderr,
    };
    let report = Recorder::new(test_config())
        .expect("valid config")
        .run(&command, io, JsonLinesSink::new(Vec::new()), shutdown)
        .await;

    let sink = report.sink.expect("sink finishes");
    Recorded {
        outcome: report.outcome,
        records: parse_records(&sink.into_inner()),
        stdout: stdout_reader.await.expect("join stdout reader"),
        stderr: stderr_reader.await.expect("join stderr reader"),
    }
}

async fn read_all(mut reader: DuplexStream) -> Vec<u8> {
    let mut out = Vec::new();
    reader.read_to_end(&mut out).await.expect("read editor side");
    out
}

/// `Content-Length` framing of `body`.
pub fn frame(body: &str) -> Vec<u8> {
    format!("Content-Length: {}\r\n\r\n{body}", body.len()).into_bytes()
}

/// Editor endpoint that has gone away: every write fails.
pub struct ClosedEditor;

impl AsyncWrite for ClosedEditor {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "editor closed")))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
