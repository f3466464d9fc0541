#![forbid(unsafe_code)]

//! `lsp-recorder`: transparent stdio proxy that records Language Server
//! Protocol traffic.
//!
//! A [`Recorder`] launches a language server with piped standard streams,
//! forwards all three streams unmodified, and writes every observed unit
//! (complete message, raw chunk, malformed header) as a timestamped record
//! to a [`LogSink`].

pub mod config;
pub mod errors;
pub mod framing;
pub mod models;
pub mod print;
pub mod recorder;
pub mod sink;

pub use config::RecorderConfig;
pub use errors::{AppError, Result};
pub use recorder::{CommandSpec, ProxyIo, Recorder};
pub use sink::{LogFormat, LogSink};
