//! Recording session lifecycle.

/// Lifecycle phase of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Mailbox, consumer and child pipes are being set up.
    Starting,
    /// Child is running and all pumps are forwarding.
    Running,
    /// Child exited or a signal arrived; pumps are stopping and records drain.
    Draining,
    /// Pipes closed and consumer stopped. Terminal.
    Stopped,
}

impl SessionPhase {
    /// Determine whether a lifecycle transition is permitted.
    ///
    /// A failed setup jumps straight from `Starting` to `Draining` so the
    /// bookkeeping records already enqueued still reach the sink.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Starting, Self::Running | Self::Draining)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Stopped)
        )
    }

    /// Whether the session has finished.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }
}
