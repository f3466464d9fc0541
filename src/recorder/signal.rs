//! External signal handling and child termination.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tracing::{debug, warn};

/// Resolve when the recorder receives Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

/// Ask the child to exit, escalating to a kill after `timeout`.
///
/// On Unix the child first receives SIGTERM so a language server can shut
/// down on its own terms; elsewhere it is killed directly. Returns the exit
/// status when it could be collected.
pub async fn terminate_child(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    if !forward_terminate(child) {
        if let Err(err) = child.start_kill() {
            warn!(%err, "failed to kill child process");
        }
    }

    match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(err)) => {
            warn!(%err, "error waiting for child process after termination");
            None
        }
        Err(_elapsed) => {
            warn!(?timeout, "child did not exit after termination request, killing");
            child.kill().await.ok();
            child.try_wait().ok().flatten()
        }
    }
}

#[cfg(unix)]
fn forward_terminate(child: &Child) -> bool {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        // Already reaped.
        return false;
    };
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    match kill(Pid::from_raw(raw), Signal::SIGTERM) {
        Ok(()) => {
            debug!(pid, "forwarded SIGTERM to child");
            true
        }
        Err(err) => {
            warn!(pid, %err, "failed to forward SIGTERM to child");
            false
        }
    }
}

#[cfg(not(unix))]
fn forward_terminate(_child: &Child) -> bool {
    false
}

/// Exit code reported for `status`: the child's own code, or `128 + signal`
/// when it was killed by a signal on Unix.
#[must_use]
pub fn exit_code_of(status: &ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(128 + signal);
        }
    }

    None
}
