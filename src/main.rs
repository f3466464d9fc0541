#![forbid(unsafe_code)]

//! `lsp-recorder`: record and replay Language Server Protocol traffic.
//!
//! `record` launches a language server behind a transparent stdio proxy and
//! writes every message it sees to a log file; `print` pretty-prints such a
//! log.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use lsp_recorder::print::{open_log_reader, print_log};
use lsp_recorder::recorder::signal::shutdown_signal;
use lsp_recorder::sink::open_log_file;
use lsp_recorder::{AppError, CommandSpec, LogFormat, ProxyIo, Recorder, RecorderConfig, Result};

/// Output format of the recorder's own diagnostics.
#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum TraceFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "lsp-recorder",
    about = "Record Language Server Protocol traffic",
    version,
    long_about = None
)]
struct Cli {
    /// Diagnostic output format (text or json); diagnostics go to stderr.
    #[arg(long, value_enum, default_value_t = TraceFormat::Text, global = true)]
    trace_format: TraceFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run and record a language server.
    Record(RecordArgs),

    /// Pretty print a recorded log.
    Print {
        /// Log file path.
        log: PathBuf,
    },
}

#[derive(Debug, Args)]
struct RecordArgs {
    /// Log file path.
    #[arg(long, default_value = "./lsp-recorder.log")]
    log: PathBuf,

    /// Log file format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    format: LogFormat,

    /// Optional TOML file with recorder tunables.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Language server executable path.
    bin: String,

    /// Additional options/arguments of the language server.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.trace_format) {
        eprintln!("lsp-recorder: {err}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("lsp-recorder: failed to build tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    let code = match cli.command {
        Command::Record(args) => runtime.block_on(record(args)),
        Command::Print { log } => print(&log),
    };

    // Tokio's stdin reader can stay parked in a blocking read forever.
    runtime.shutdown_timeout(Duration::from_millis(100));
    code
}

async fn record(args: RecordArgs) -> ExitCode {
    let config = match &args.config {
        Some(path) => RecorderConfig::load_from_path(path),
        None => Ok(RecorderConfig::default()),
    };
    let setup = config.and_then(Recorder::new).and_then(|recorder| {
        open_log_file(&args.log, args.format).map(|sink| (recorder, sink))
    });
    let (recorder, sink) = match setup {
        Ok(setup) => setup,
        Err(err) => {
            eprintln!("lsp-recorder: {err}");
            return ExitCode::FAILURE;
        }
    };

    let command = CommandSpec::new(args.bin, args.args);
    info!(command = %command.command_line(), log = %args.log.display(), "recording");

    let report = recorder
        .run(&command, ProxyIo::process(), sink, shutdown_signal())
        .await;

    if let Err(err) = report.sink {
        error!(%err, "failed to finish log file");
    }

    // Session failures were already reported by the recorder.
    match report.outcome {
        Ok(outcome) => {
            u8::try_from(outcome.process_exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
        }
        Err(_) => ExitCode::FAILURE,
    }
}

fn print(path: &Path) -> ExitCode {
    let result =
        open_log_reader(path).and_then(|reader| print_log(reader, std::io::stdout().lock()));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("lsp-recorder: cannot print log: {}, caused by {err}", path.display());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: TraceFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    // stdout carries the proxied protocol; diagnostics must never touch it.
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match format {
        TraceFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        TraceFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
