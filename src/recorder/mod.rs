//! Stream interception: pumps, session orchestration and signals.
//!
//! - `pump`: per-stream passthrough with a logging tap.
//! - `session`: [`Recorder`], which owns the child process lifecycle.
//! - `signal`: shutdown signal listening and child termination.

pub mod pump;
pub mod session;
pub mod signal;

pub use pump::{run_pump, PumpSettings};
pub use session::{CommandSpec, ProxyIo, Recorder, SessionOutcome, SessionReport};
