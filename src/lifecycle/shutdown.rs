//! Shutdown coordination.
//!
//! # State Machine
//! ```text
//! Idle → Listening: wait() called, signal handlers installed
//! Listening → Cancelling: terminate signal or external cancel()
//! Cancelling → Draining: deadline armed, every cleanup task launched
//! Draining → Drained: last cleanup task returned, deadline disarmed
//! Draining → Killed: deadline elapsed first, process exits
//! ```
//!
//! Drained and Killed are exclusive: once the deadline fires, `wait` never
//! resolves.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::deadline::ForceDeadline;
use crate::lifecycle::error::{BoxError, ShutdownError};
use crate::lifecycle::registry::{boxed_handler, CallbackRegistry, CleanupTask, TaskOutcome};
use crate::lifecycle::signals::{RouterExit, Signal, SignalRouter};
use crate::observability::metrics;

/// Default status for a forced exit.
pub const DEFAULT_FORCE_EXIT_CODE: i32 = 1;

/// Observable coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Idle,
    Listening,
    Cancelling,
    Draining,
    Drained,
    Killed,
}

type ExitAction = Arc<dyn Fn(i32) + Send + Sync>;

/// Turns OS signals into a bounded, two-phase shutdown.
///
/// Phase one cancels the shared [`CancellationToken`]. Phase two runs every
/// registered cleanup task concurrently under a hard deadline, after which
/// the process is terminated.
pub struct ShutdownCoordinator {
    token: CancellationToken,
    router: SignalRouter,
    registry: CallbackRegistry,
    state: watch::Sender<ShutdownState>,
    exit_code: i32,
    exit_action: ExitAction,
}

impl ShutdownCoordinator {
    /// Create a coordinator that shuts down on any of `terminate_signals`.
    ///
    /// Fails if a signal cannot be intercepted by the process.
    pub fn new<I>(terminate_signals: I) -> Result<Self, ShutdownError>
    where
        I: IntoIterator<Item = Signal>,
    {
        let terminate = terminate_signals
            .into_iter()
            .map(Signal::ensure_interceptable)
            .collect::<Result<BTreeSet<_>, _>>()?;
        let token = CancellationToken::new();
        let (state, _) = watch::channel(ShutdownState::Idle);

        Ok(Self {
            router: SignalRouter::new(terminate, token.clone()),
            token,
            registry: CallbackRegistry::new(),
            state,
            exit_code: DEFAULT_FORCE_EXIT_CODE,
            exit_action: Arc::new(|code| std::process::exit(code)),
        })
    }

    /// Status the process exits with when the deadline elapses.
    pub fn with_exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Replace `std::process::exit` as the action taken when the deadline
    /// elapses. `wait` never resolves after it runs, even if it returns.
    pub fn with_exit_action<F>(mut self, action: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit_action = Arc::new(action);
        self
    }

    /// The shared token subsystems observe for cooperative shutdown.
    pub fn context(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Begin shutdown without a signal. Calling it again has no effect.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Register a named cleanup task, run concurrently with all others
    /// once shutdown begins.
    pub fn register_cleanup<F, Fut, E>(&mut self, name: impl Into<String>, action: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.registry.register(CleanupTask::new(name, action));
    }

    /// Run `handler` whenever `signal` arrives, without starting shutdown.
    ///
    /// A signal can have one handler and must not be a terminate signal.
    pub fn register_signal_handler<F, Fut, E>(
        &mut self,
        signal: Signal,
        handler: F,
    ) -> Result<(), ShutdownError>
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        self.router.add_handler(signal, boxed_handler(handler))?;
        tracing::debug!(signal = %signal, "Registered signal handler");
        Ok(())
    }

    /// Spawn a background worker bound to the shutdown lifecycle.
    ///
    /// When the worker returns on its own (or panics) the token is cancelled.
    /// A cleanup task with the same name waits for the worker to finish.
    /// Must be called from within a Tokio runtime.
    pub fn spawn_worker<F, Fut, E>(&mut self, name: impl Into<String>, worker: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        let name = name.into();
        let token = self.token.clone();
        let work = worker(token.clone());

        let handle = tokio::spawn(async move {
            let _cancel_on_exit = token.drop_guard();
            let result: Result<(), BoxError> = work.await.map_err(Into::into);
            result
        });
        tracing::debug!(worker = %name, "Worker spawned");

        self.register_cleanup(name, move |_| async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(BoxError::from(e)),
            }
        });
    }

    pub fn terminate_signals(&self) -> &BTreeSet<Signal> {
        self.router.terminate_signals()
    }

    /// Exactly the terminate signals plus signals with custom handlers.
    pub fn observed_signals(&self) -> Vec<Signal> {
        self.router.observed_signals()
    }

    /// Names of registered cleanup tasks, in registration order.
    pub fn cleanup_names(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Watch the coordinator move through its states.
    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.state.subscribe()
    }

    /// Listen for signals, then drain cleanup tasks within `deadline`.
    ///
    /// Resolves once every cleanup task has returned. If the deadline
    /// elapses first the exit action runs and this future never resolves.
    pub async fn wait(self, deadline: Duration) {
        let Self {
            token,
            router,
            registry,
            state,
            exit_code,
            exit_action,
        } = self;
        let state = Arc::new(state);

        let signals = match router.install() {
            Ok(signals) => signals,
            Err(e) => {
                // Terminate signals still have their default action.
                tracing::error!(error = %e, "Signal interception unavailable, shutting down");
                token.cancel();
                None
            }
        };
        state.send_replace(ShutdownState::Listening);

        match router.listen(signals).await {
            RouterExit::Terminated(signal) => {
                tracing::info!(signal = %signal, "Shutdown initiated by signal");
            }
            RouterExit::Cancelled => {
                tracing::info!("Shutdown initiated by cancellation");
            }
        }
        drop(router);
        state.send_replace(ShutdownState::Cancelling);
        let started = Instant::now();

        let expiry_state = state.clone();
        let mut force = ForceDeadline::arm(deadline, move || {
            expiry_state.send_replace(ShutdownState::Killed);
            tracing::error!(
                deadline_ms = deadline.as_millis() as u64,
                exit_code,
                "Shutdown deadline elapsed, force exit"
            );
            metrics::record_forced_exit();
            exit_action(exit_code);
        });

        state.send_replace(ShutdownState::Draining);
        let report = drain(registry, &token).await;

        if !force.disarm() {
            tracing::warn!(
                fired = force.has_fired(),
                "Cleanup tasks returned after the deadline"
            );
            // The deadline won; the exit action owns the rest of the process.
            std::future::pending::<()>().await;
        }

        state.send_replace(ShutdownState::Drained);
        metrics::record_shutdown_duration(started.elapsed());
        report.log_summary(started.elapsed());
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("observed_signals", &self.observed_signals())
            .field("cleanup_tasks", &self.cleanup_names())
            .field("exit_code", &self.exit_code)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

#[derive(Debug, Default)]
struct DrainReport {
    succeeded: usize,
    failed: Vec<(String, String)>,
    slowest: Option<(String, Duration)>,
}

impl DrainReport {
    fn record(&mut self, name: String, outcome: TaskOutcome, elapsed: Duration) {
        if self.slowest.as_ref().map_or(true, |(_, d)| elapsed > *d) {
            self.slowest = Some((name.clone(), elapsed));
        }
        match outcome {
            TaskOutcome::Succeeded => self.succeeded += 1,
            TaskOutcome::Failed(error) => self.failed.push((name, error)),
            TaskOutcome::Panicked => self.failed.push((name, String::from("panicked"))),
        }
    }

    fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    fn log_summary(&self, elapsed: Duration) {
        let (slowest_task, slowest_ms) = match &self.slowest {
            Some((name, d)) => (name.as_str(), d.as_millis() as u64),
            None => ("", 0),
        };
        if self.failed.is_empty() {
            tracing::info!(
                tasks = self.total(),
                succeeded = self.succeeded,
                slowest_task,
                slowest_ms,
                elapsed_ms = elapsed.as_millis() as u64,
                "Graceful shutdown complete"
            );
        } else {
            tracing::warn!(
                tasks = self.total(),
                succeeded = self.succeeded,
                failed = ?self.failed,
                slowest_task,
                slowest_ms,
                elapsed_ms = elapsed.as_millis() as u64,
                "Graceful shutdown complete with failures"
            );
        }
    }
}

/// Launch every task at once and wait for all of them.
async fn drain(registry: CallbackRegistry, token: &CancellationToken) -> DrainReport {
    if registry.is_empty() {
        tracing::debug!("No cleanup tasks registered");
    } else {
        tracing::info!(tasks = registry.len(), "Running cleanup tasks");
    }

    let mut running = JoinSet::new();
    for task in registry.into_tasks() {
        running.spawn(task.run(token.clone()));
    }

    let mut report = DrainReport::default();
    while let Some(joined) = running.join_next().await {
        match joined {
            Ok((name, outcome, elapsed)) => report.record(name, outcome, elapsed),
            Err(e) => {
                tracing::error!(error = %e, "Cleanup task did not complete");
                report.failed.push((String::from("<unknown>"), e.to_string()));
            }
        }
    }
    report
}
