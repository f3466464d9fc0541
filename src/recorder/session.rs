//! Recording session orchestration.
//!
//! [`Recorder::run`] walks a session through
//! `Starting → Running → Draining → Stopped`:
//!
//! 1. **Starting**: allocate the record mailbox and cancellation tokens,
//!    start the sink consumer, enqueue the `start` and environment
//!    bookkeeping records, spawn the child with three piped streams.
//! 2. **Running**: one pump per stream forwards traffic while the
//!    orchestrator waits for the child to exit or for the shutdown future.
//! 3. **Draining**: hold for the grace period so the child's last output is
//!    forwarded, enqueue the `end` record, cancel the pumps, then stop the
//!    consumer, which drains every enqueued record before finishing the sink.
//! 4. **Stopped**: pipes closed, sink handed back.
//!
//! Setup failures (spawn, pipe capture) and wait failures are reported once,
//! to the log and through `tracing`, and never retried.

use std::ffi::OsString;
use std::future::Future;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};

use super::pump::{run_pump, PumpSettings};
use super::signal::{exit_code_of, terminate_child};
use crate::config::RecorderConfig;
use crate::models::{LogData, PayloadType, SessionPhase, StreamType};
use crate::sink::{run_sink, LogSink};
use crate::{AppError, Result};

/// Program and arguments of the language server to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,
    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Build a command specification.
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Human-readable command line, as recorded in the `start` record.
    #[must_use]
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The caller-side endpoints the child's streams are proxied to.
#[derive(Debug)]
pub struct ProxyIo<I, O, E> {
    /// Source forwarded to the child's stdin.
    pub stdin: I,
    /// Destination of the child's stdout.
    pub stdout: O,
    /// Destination of the child's stderr.
    pub stderr: E,
}

impl ProxyIo<tokio::io::Stdin, tokio::io::Stdout, tokio::io::Stderr> {
    /// The recorder process's own standard streams.
    #[must_use]
    pub fn process() -> Self {
        Self {
            stdin: tokio::io::stdin(),
            stdout: tokio::io::stdout(),
            stderr: tokio::io::stderr(),
        }
    }
}

/// How a session that got its child running came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOutcome {
    /// Child exit status, if it could be collected.
    pub status: Option<ExitStatus>,
    /// Whether the session was ended by an external signal.
    pub interrupted: bool,
}

impl SessionOutcome {
    /// Child exit code, `128 + signal` for signal deaths on Unix.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.status.as_ref().and_then(exit_code_of)
    }

    /// Exit code the recorder itself should exit with.
    #[must_use]
    pub fn process_exit_code(&self) -> i32 {
        self.exit_code().unwrap_or(1)
    }
}

/// Result of [`Recorder::run`].
pub struct SessionReport<S> {
    /// Session outcome; `Err` for fatal setup, start, or wait failures.
    pub outcome: Result<SessionOutcome>,
    /// The finished sink, or the error raised while finishing it.
    pub sink: Result<S>,
}

/// Runs recording sessions with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    config: RecorderConfig,
}

impl Recorder {
    /// Create a recorder from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `config` fails [`RecorderConfig::validate`].
    pub fn new(config: RecorderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Launch `command`, proxy its streams through `io`, and record every
    /// observed unit into `sink` until the child exits or `shutdown`
    /// resolves.
    pub async fn run<I, O, E, S, F>(
        &self,
        command: &CommandSpec,
        io: ProxyIo<I, O, E>,
        sink: S,
        shutdown: F,
    ) -> SessionReport<S>
    where
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send + 'static,
        E: AsyncWrite + Unpin + Send + 'static,
        S: LogSink + 'static,
        F: Future<Output = ()>,
    {
        let span = info_span!("session", program = %command.program);
        self.run_inner(command, io, sink, shutdown)
            .instrument(span)
            .await
    }

    async fn run_inner<I, O, E, S, F>(
        &self,
        command: &CommandSpec,
        io: ProxyIo<I, O, E>,
        sink: S,
        shutdown: F,
    ) -> SessionReport<S>
    where
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send + 'static,
        E: AsyncWrite + Unpin + Send + 'static,
        S: LogSink + 'static,
        F: Future<Output = ()>,
    {
        let mut phase = SessionPhase::Starting;

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let sink_cancel = CancellationToken::new();
        let pump_cancel = CancellationToken::new();
        let consumer = tokio::spawn(run_sink(rx, sink, sink_cancel.clone()));

        enqueue(
            &tx,
            LogData::bookkeeping(
                PayloadType::RawStart,
                format!("run: {}", command.command_line()),
            ),
        )
        .await;
        if self.config.capture_environment {
            enqueue(&tx, LogData::bookkeeping(PayloadType::Raw, format_env())).await;
        }

        let mut pumps = Vec::with_capacity(3);
        let outcome = match self.start(command, io, &tx, &pump_cancel, &mut pumps).await {
            Ok(child) => {
                advance(&mut phase, SessionPhase::Running);
                info!("language server started");
                self.supervise(child, &tx, shutdown).await
            }
            Err(err) => Err(err),
        };

        advance(&mut phase, SessionPhase::Draining);
        pump_cancel.cancel();
        self.join_pumps(pumps).await;

        drop(tx);
        sink_cancel.cancel();
        let sink = match consumer.await {
            Ok(result) => result,
            Err(err) => Err(AppError::Log(format!("log sink task failed: {err}"))),
        };

        advance(&mut phase, SessionPhase::Stopped);
        debug!(terminal = phase.is_terminal(), "session stopped");
        SessionReport { outcome, sink }
    }

    /// Spawn the child, capture its pipes and start one pump per stream.
    async fn start<I, O, E>(
        &self,
        command: &CommandSpec,
        io: ProxyIo<I, O, E>,
        tx: &mpsc::Sender<LogData>,
        cancel: &CancellationToken,
        pumps: &mut Vec<JoinHandle<()>>,
    ) -> Result<Child>
    where
        I: AsyncRead + Unpin + Send + 'static,
        O: AsyncWrite + Unpin + Send + 'static,
        E: AsyncWrite + Unpin + Send + 'static,
    {
        let mut child = match Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                let err = AppError::Process(format!("failed to start command: {err}"));
                report_error(tx, &err).await;
                return Err(err);
            }
        };

        let pipes = (child.stdin.take(), child.stdout.take(), child.stderr.take());
        let (Some(stdin), Some(stdout), Some(stderr)) = pipes else {
            let err = AppError::Process("failed to open child stdio pipes".into());
            report_error(tx, &err).await;
            child.start_kill().ok();
            return Err(err);
        };

        let settings = PumpSettings::from(&self.config);
        pumps.push(spawn_pump(StreamType::Stdin, io.stdin, stdin, tx, cancel, settings));
        pumps.push(spawn_pump(StreamType::Stdout, stdout, io.stdout, tx, cancel, settings));
        pumps.push(spawn_pump(StreamType::Stderr, stderr, io.stderr, tx, cancel, settings));

        Ok(child)
    }

    /// Wait for the child or the shutdown future, then enqueue the `end` record.
    async fn supervise<F>(
        &self,
        mut child: Child,
        tx: &mpsc::Sender<LogData>,
        shutdown: F,
    ) -> Result<SessionOutcome>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let exited = tokio::select! {
            waited = child.wait() => Some(waited),
            () = &mut shutdown => None,
        };
        let (waited, interrupted) = match exited {
            Some(waited) => (waited.map(Some), false),
            None => {
                info!("shutdown signal received, terminating language server");
                (Ok(terminate_child(&mut child, self.config.kill_timeout()).await), true)
            }
        };

        self.conclude(waited, interrupted, tx).await
    }

    /// Hold for the grace period, then turn the wait result into the
    /// session outcome and enqueue the `end` record.
    async fn conclude(
        &self,
        waited: std::io::Result<Option<ExitStatus>>,
        interrupted: bool,
        tx: &mpsc::Sender<LogData>,
    ) -> Result<SessionOutcome> {
        // Let the output pumps forward whatever the child wrote last.
        tokio::time::sleep(self.config.grace_period()).await;

        let outcome = match waited {
            Ok(status) => Ok(SessionOutcome {
                status,
                interrupted,
            }),
            Err(err) => {
                let err = AppError::Process(format!("failed to wait command: {err}"));
                report_error(tx, &err).await;
                Err(err)
            }
        };

        let code = outcome
            .as_ref()
            .ok()
            .and_then(SessionOutcome::exit_code)
            .unwrap_or(-1);
        let suffix = if interrupted { " (interrupted)" } else { "" };
        enqueue(
            tx,
            LogData::bookkeeping(
                PayloadType::RawEnd,
                format!("command exited with: {code}{suffix}"),
            ),
        )
        .await;
        info!(code, interrupted, "language server exited");

        outcome
    }

    /// Join the pumps, aborting any that outlive the grace period.
    async fn join_pumps(&self, pumps: Vec<JoinHandle<()>>) {
        for mut handle in pumps {
            match tokio::time::timeout(self.config.grace_period(), &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(%err, "stream pump task failed"),
                Err(_elapsed) => {
                    warn!("stream pump did not stop in time, aborting");
                    handle.abort();
                }
            }
        }
    }
}

fn spawn_pump<R, W>(
    stream: StreamType,
    source: R,
    dest: W,
    tx: &mpsc::Sender<LogData>,
    cancel: &CancellationToken,
    settings: PumpSettings,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let tx = tx.clone();
    let cancel = cancel.clone();
    tokio::spawn(
        async move {
            if let Err(err) = run_pump(stream, source, dest, tx.clone(), cancel, settings).await {
                report_error(&tx, &AppError::Io(format!("{stream} pump stopped: {err}"))).await;
            }
        }
        .in_current_span(),
    )
}

fn advance(phase: &mut SessionPhase, next: SessionPhase) {
    debug_assert!(
        phase.can_transition_to(next),
        "illegal session transition {phase:?} -> {next:?}"
    );
    debug!(from = ?phase, to = ?next, "session phase");
    *phase = next;
}

async fn enqueue(tx: &mpsc::Sender<LogData>, record: LogData) {
    if tx.send(record).await.is_err() {
        warn!("record mailbox closed, bookkeeping record lost");
    }
}

/// Report a session-level failure to both the log and the error stream.
async fn report_error(tx: &mpsc::Sender<LogData>, err: &AppError) {
    error!(%err, "recording session error");
    enqueue(tx, LogData::raw(StreamType::Stderr, err.to_string())).await;
}

/// `KEY=VALUE` lines of the recorder's environment.
fn format_env() -> String {
    std::env::vars_os()
        .map(|(key, value)| {
            let mut line = OsString::with_capacity(key.len() + value.len() + 1);
            line.push(&key);
            line.push("=");
            line.push(&value);
            line.to_string_lossy().into_owned()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
