//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn the `[shutdown]` configuration into a ready coordinator
//!
//! # Design Decisions
//! - Fail fast: an unusable signal list is a startup error, not a runtime one
//! - The deadline stays with the caller, who passes it to `wait`

use crate::config::ShutdownConfig;
use crate::lifecycle::error::ShutdownError;
use crate::lifecycle::shutdown::ShutdownCoordinator;
use crate::lifecycle::signals::Signal;

/// Build a coordinator for the configured terminate signals and exit code.
pub fn build_coordinator(config: &ShutdownConfig) -> Result<ShutdownCoordinator, ShutdownError> {
    let signals = config
        .terminate_signals
        .iter()
        .map(|name| name.parse::<Signal>())
        .collect::<Result<Vec<_>, _>>()?;

    let coordinator =
        ShutdownCoordinator::new(signals)?.with_exit_code(config.force_exit_code);

    tracing::info!(
        terminate_signals = ?coordinator
            .terminate_signals()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
        deadline_secs = config.deadline_secs,
        force_exit_code = config.force_exit_code,
        "Shutdown coordinator ready"
    );
    Ok(coordinator)
}
