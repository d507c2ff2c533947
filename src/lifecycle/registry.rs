//! Cleanup task registry.
//!
//! # Responsibilities
//! - Hold named cleanup tasks in registration order
//! - Erase the concrete future types behind boxed actions
//! - Run a single task with logging, timing and panic capture
//!
//! # Design Decisions
//! - Actions are `FnOnce`: each task can run at most once
//! - Names are diagnostic only; duplicates are allowed and all of them run
//! - Order affects log output only, never scheduling

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use futures_util::{FutureExt, TryFutureExt};
use tokio_util::sync::CancellationToken;

use crate::lifecycle::error::BoxError;
use crate::observability::metrics;

pub(crate) type CleanupAction =
    Box<dyn FnOnce(CancellationToken) -> BoxFuture<'static, Result<(), BoxError>> + Send>;

pub(crate) type SignalHandler =
    Box<dyn Fn(CancellationToken) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

pub(crate) fn boxed_action<F, Fut, E>(action: F) -> CleanupAction
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    Box::new(
        move |token: CancellationToken| -> BoxFuture<'static, Result<(), BoxError>> {
            action(token).map_err(Into::into).boxed()
        },
    )
}

pub(crate) fn boxed_handler<F, Fut, E>(handler: F) -> SignalHandler
where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    Box::new(
        move |token: CancellationToken| -> BoxFuture<'static, Result<(), BoxError>> {
            handler(token).map_err(Into::into).boxed()
        },
    )
}

/// How a cleanup task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
    Panicked,
}

impl TaskOutcome {
    fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Succeeded => "success",
            TaskOutcome::Failed(_) => "failure",
            TaskOutcome::Panicked => "panic",
        }
    }
}

/// A named unit of shutdown work.
pub struct CleanupTask {
    name: String,
    action: CleanupAction,
}

impl CleanupTask {
    /// Create a task from an async action taking the shared token.
    pub fn new<F, Fut, E>(name: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<BoxError> + 'static,
    {
        Self {
            name: name.into(),
            action: boxed_action(action),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the action to completion, logging start and result.
    ///
    /// Errors and panics are reported in the returned outcome, never propagated.
    pub async fn run(self, token: CancellationToken) -> (String, TaskOutcome, Duration) {
        let Self { name, action } = self;
        let started = Instant::now();

        tracing::info!(task = %name, "Cleaning up: start");

        let outcome = match AssertUnwindSafe(async move { action(token).await })
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => TaskOutcome::Succeeded,
            Ok(Err(e)) => TaskOutcome::Failed(e.to_string()),
            Err(_) => TaskOutcome::Panicked,
        };
        let elapsed = started.elapsed();

        match &outcome {
            TaskOutcome::Succeeded => {
                tracing::info!(task = %name, elapsed_ms = elapsed.as_millis() as u64, "Cleaning up: finish");
            }
            TaskOutcome::Failed(error) => {
                tracing::error!(task = %name, error = %error, "Cleaning up: failed");
            }
            TaskOutcome::Panicked => {
                tracing::error!(task = %name, "Cleaning up: panicked");
            }
        }
        metrics::record_cleanup(&name, outcome.label(), elapsed);

        (name, outcome, elapsed)
    }
}

impl std::fmt::Debug for CleanupTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CleanupTask").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Append-only sequence of cleanup tasks.
#[derive(Debug, Default)]
pub struct CallbackRegistry {
    tasks: Vec<CleanupTask>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a named cleanup task.
    pub fn register(&mut self, task: CleanupTask) {
        tracing::debug!(task = %task.name(), "Registered cleanup task");
        self.tasks.push(task);
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tasks.iter().map(CleanupTask::name).collect()
    }

    pub(crate) fn into_tasks(self) -> Vec<CleanupTask> {
        self.tasks
    }
}
