//! OS signal handling.
//!
//! # Responsibilities
//! - Name and parse Unix signals
//! - Register OS-level interest in terminate and custom-handled signals
//! - Run the listening loop that turns signals into shutdown or handler calls
//!
//! # Design Decisions
//! - One `signal-hook-tokio` stream carries every observed signal, so the
//!   loop sees a single ordered event sequence
//! - The loop also exits when the token is cancelled by other code
//! - Custom handlers run in place; their failures never start shutdown

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;

use futures_util::{FutureExt, StreamExt};
use signal_hook::consts as sig;
use signal_hook_tokio::Signals;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::error::ShutdownError;
use crate::lifecycle::registry::SignalHandler;
use crate::observability::metrics;

/// Highest signal number the platform delivers (`SIGRTMAX` on Linux).
#[cfg(any(target_os = "linux", target_os = "android"))]
pub const MAX_SIGNAL: i32 = 64;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub const MAX_SIGNAL: i32 = 31;

/// A Unix signal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signal(i32);

const NAMES: &[(i32, &str)] = &[
    (sig::SIGHUP, "SIGHUP"),
    (sig::SIGINT, "SIGINT"),
    (sig::SIGQUIT, "SIGQUIT"),
    (sig::SIGILL, "SIGILL"),
    (sig::SIGABRT, "SIGABRT"),
    (sig::SIGFPE, "SIGFPE"),
    (sig::SIGKILL, "SIGKILL"),
    (sig::SIGSEGV, "SIGSEGV"),
    (sig::SIGPIPE, "SIGPIPE"),
    (sig::SIGALRM, "SIGALRM"),
    (sig::SIGTERM, "SIGTERM"),
    (sig::SIGUSR1, "SIGUSR1"),
    (sig::SIGUSR2, "SIGUSR2"),
    (sig::SIGCHLD, "SIGCHLD"),
    (sig::SIGCONT, "SIGCONT"),
    (sig::SIGSTOP, "SIGSTOP"),
    (sig::SIGTSTP, "SIGTSTP"),
    (sig::SIGWINCH, "SIGWINCH"),
];

impl Signal {
    pub const HUP: Signal = Signal(sig::SIGHUP);
    pub const INT: Signal = Signal(sig::SIGINT);
    pub const QUIT: Signal = Signal(sig::SIGQUIT);
    pub const PIPE: Signal = Signal(sig::SIGPIPE);
    pub const ALRM: Signal = Signal(sig::SIGALRM);
    pub const TERM: Signal = Signal(sig::SIGTERM);
    pub const USR1: Signal = Signal(sig::SIGUSR1);
    pub const USR2: Signal = Signal(sig::SIGUSR2);
    pub const CHLD: Signal = Signal(sig::SIGCHLD);
    pub const CONT: Signal = Signal(sig::SIGCONT);
    pub const TSTP: Signal = Signal(sig::SIGTSTP);
    pub const WINCH: Signal = Signal(sig::SIGWINCH);
    pub const KILL: Signal = Signal(sig::SIGKILL);
    pub const STOP: Signal = Signal(sig::SIGSTOP);

    /// Wrap a raw signal number.
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    /// The raw signal number.
    pub const fn as_raw(self) -> i32 {
        self.0
    }

    /// Canonical name (`SIGINT`), if the signal is a well-known one.
    pub fn name(self) -> Option<&'static str> {
        NAMES
            .iter()
            .find(|(raw, _)| *raw == self.0)
            .map(|(_, name)| *name)
    }

    /// Whether a process is allowed to intercept this signal.
    pub fn is_forbidden(self) -> bool {
        sig::FORBIDDEN.contains(&self.0)
    }

    /// Whether the number lies in `1..=MAX_SIGNAL`.
    pub fn is_supported(self) -> bool {
        (1..=MAX_SIGNAL).contains(&self.0)
    }

    /// Fail if the signal is out of range or cannot be intercepted.
    pub(crate) fn ensure_interceptable(self) -> Result<Self, ShutdownError> {
        if !self.is_supported() {
            Err(ShutdownError::UnsupportedSignal(self))
        } else if self.is_forbidden() {
            Err(ShutdownError::ForbiddenSignal(self))
        } else {
            Ok(self)
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "SIG{}", self.0),
        }
    }
}

impl FromStr for Signal {
    type Err = ShutdownError;

    /// Accepts `SIGTERM`, `TERM`, `term` or a decimal number up to [`MAX_SIGNAL`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(raw) = trimmed.parse::<i32>() {
            let signal = Signal(raw);
            if signal.is_supported() {
                return Ok(signal);
            }
            return Err(ShutdownError::InvalidSignal(s.to_string()));
        }

        let upper = trimmed.to_ascii_uppercase();
        let wanted = if upper.starts_with("SIG") {
            upper
        } else {
            format!("SIG{}", upper)
        };

        NAMES
            .iter()
            .find(|(_, name)| *name == wanted)
            .map(|(raw, _)| Signal(*raw))
            .ok_or_else(|| ShutdownError::InvalidSignal(s.to_string()))
    }
}

/// Why the listening loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterExit {
    /// A terminate signal arrived and the router cancelled the token.
    Terminated(Signal),
    /// The token was cancelled by other code.
    Cancelled,
}

/// Maps incoming OS signals to shutdown or to custom handlers.
pub struct SignalRouter {
    terminate: BTreeSet<Signal>,
    handlers: BTreeMap<Signal, SignalHandler>,
    token: CancellationToken,
}

impl SignalRouter {
    pub(crate) fn new(terminate: BTreeSet<Signal>, token: CancellationToken) -> Self {
        Self {
            terminate,
            handlers: BTreeMap::new(),
            token,
        }
    }

    pub(crate) fn add_handler(
        &mut self,
        signal: Signal,
        handler: SignalHandler,
    ) -> Result<(), ShutdownError> {
        signal.ensure_interceptable()?;
        if self.terminate.contains(&signal) {
            return Err(ShutdownError::SignalConflict(signal));
        }
        if self.handlers.contains_key(&signal) {
            return Err(ShutdownError::DuplicateHandler(signal));
        }
        self.handlers.insert(signal, handler);
        Ok(())
    }

    /// Signals that start shutdown.
    pub fn terminate_signals(&self) -> &BTreeSet<Signal> {
        &self.terminate
    }

    /// Every signal the router registers with the OS: terminate signals plus
    /// custom-handled ones, sorted and without duplicates.
    pub fn observed_signals(&self) -> Vec<Signal> {
        let mut observed = Vec::new();
        for signal in self.terminate.iter().chain(self.handlers.keys()) {
            if !observed.contains(signal) {
                observed.push(*signal);
            }
        }
        observed.sort_unstable();
        observed
    }

    /// Register OS-level interest in [`observed_signals`](Self::observed_signals).
    ///
    /// Returns `Ok(None)` when there is nothing to observe; the loop then
    /// waits for external cancellation only.
    pub(crate) fn install(&self) -> Result<Option<Signals>, ShutdownError> {
        let observed = self.observed_signals();
        if observed.is_empty() {
            tracing::info!("No signals to observe, waiting for explicit cancellation");
            return Ok(None);
        }
        if let Some(signal) = observed.iter().find(|s| !s.is_supported()) {
            return Err(ShutdownError::UnsupportedSignal(*signal));
        }

        let signals = Signals::new(observed.iter().map(|s| s.as_raw()))
            .map_err(|e| ShutdownError::InstallFailed(e.to_string()))?;
        tracing::debug!(
            signals = ?observed.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Signal handlers installed"
        );
        Ok(Some(signals))
    }

    /// Run the listening loop until a terminate signal arrives or the token
    /// is cancelled elsewhere.
    pub(crate) async fn listen(&self, signals: Option<Signals>) -> RouterExit {
        let Some(mut signals) = signals else {
            self.token.cancelled().await;
            return RouterExit::Cancelled;
        };
        let handle = signals.handle();

        let exit = loop {
            tokio::select! {
                biased;
                _ = self.token.cancelled() => break RouterExit::Cancelled,
                next = signals.next() => match next {
                    Some(raw) => {
                        if let Some(exit) = self.dispatch(Signal::from_raw(raw)).await {
                            break exit;
                        }
                    }
                    None => {
                        tracing::warn!("Signal stream closed, waiting for explicit cancellation");
                        self.token.cancelled().await;
                        break RouterExit::Cancelled;
                    }
                },
            }
        };

        handle.close();
        exit
    }

    async fn dispatch(&self, signal: Signal) -> Option<RouterExit> {
        if self.terminate.contains(&signal) {
            tracing::info!(signal = %signal, "Received terminate signal from OS");
            metrics::record_signal(signal, "terminate");
            self.token.cancel();
            return Some(RouterExit::Terminated(signal));
        }

        let Some(handler) = self.handlers.get(&signal) else {
            tracing::debug!(signal = %signal, "Ignoring unobserved signal");
            return None;
        };

        tracing::info!(signal = %signal, "Received signal, running handler");
        metrics::record_signal(signal, "handler");

        let token = self.token.clone();
        let outcome = AssertUnwindSafe(async move { handler(token).await })
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(signal = %signal, error = %e, "Can't run handler for signal");
            }
            Err(_) => {
                tracing::error!(signal = %signal, "Handler for signal panicked");
            }
        }
        None
    }
}
