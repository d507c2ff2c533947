//! Lifecycle error definitions.

use thiserror::Error;

use crate::lifecycle::signals::Signal;

/// Error returned by cleanup actions and signal handlers.
///
/// These never escape the coordinator; they are logged against the task
/// or signal that produced them.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while configuring a [`ShutdownCoordinator`](crate::lifecycle::ShutdownCoordinator).
///
/// All of them are detected before the coordinator starts listening.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShutdownError {
    /// The signal cannot be intercepted by a process (SIGKILL, SIGSTOP, ...).
    #[error("signal {0} cannot be intercepted")]
    ForbiddenSignal(Signal),

    /// A custom handler was registered for a signal that already terminates.
    #[error("signal {0} is already a terminate signal")]
    SignalConflict(Signal),

    /// A second custom handler was registered for the same signal.
    #[error("signal {0} already has a handler")]
    DuplicateHandler(Signal),

    /// A signal name or number could not be parsed.
    #[error("invalid signal: {0:?}")]
    InvalidSignal(String),

    /// The signal number is outside the range this platform delivers.
    #[error("signal {0} is out of range (1..={max})", max = crate::lifecycle::signals::MAX_SIGNAL)]
    UnsupportedSignal(Signal),

    /// The OS refused to register a signal handler.
    #[error("failed to install signal handlers: {0}")]
    InstallFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShutdownError::SignalConflict(Signal::INT);
        assert_eq!(err.to_string(), "signal SIGINT is already a terminate signal");

        let err = ShutdownError::InvalidSignal("SIGNOPE".into());
        assert!(err.to_string().contains("SIGNOPE"));

        let err = ShutdownError::UnsupportedSignal(Signal::from_raw(1000));
        assert!(err.to_string().starts_with("signal SIG1000 is out of range"));
    }
}
