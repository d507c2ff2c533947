//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     [shutdown] config → parse signals → ShutdownCoordinator
//!
//! Registration (registry.rs, shutdown.rs):
//!     cleanup tasks, custom signal handlers, workers
//!
//! Signals (signals.rs):
//!     terminate signal → cancel token → leave listening loop
//!     custom signal    → run handler in place → keep listening
//!
//! Shutdown (shutdown.rs, deadline.rs):
//!     arm deadline → run every cleanup task concurrently
//!         → all returned: disarm, Drained, wait() resolves
//!         → deadline first: Killed, process exits
//! ```
//!
//! # Design Decisions
//! - One shared CancellationToken is the only cancellation channel
//! - No ordering between cleanup tasks; only a global deadline
//! - Cleanup and handler failures are logged, never surfaced to the caller

pub mod deadline;
pub mod error;
pub mod registry;
pub mod shutdown;
pub mod signals;
pub mod startup;

pub use deadline::ForceDeadline;
pub use error::{BoxError, ShutdownError};
pub use registry::{CallbackRegistry, CleanupTask, TaskOutcome};
pub use shutdown::{ShutdownCoordinator, ShutdownState, DEFAULT_FORCE_EXIT_CODE};
pub use signals::{RouterExit, Signal, SignalRouter, MAX_SIGNAL};
pub use startup::build_coordinator;
pub use tokio_util::sync::CancellationToken;
