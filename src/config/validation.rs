//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that signal names parse and can be intercepted
//! - Validate value ranges (deadline > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::BTreeSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::lifecycle::Signal;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("shutdown.deadline_secs must be greater than zero")]
    ZeroDeadline,

    #[error("unknown signal {0:?}")]
    UnknownSignal(String),

    #[error("signal {0} cannot be intercepted")]
    ForbiddenSignal(String),

    #[error("signal {0} listed more than once")]
    DuplicateSignal(String),

    #[error("{field} is not a valid socket address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.shutdown.deadline_secs == 0 {
        errors.push(ValidationError::ZeroDeadline);
    }

    let mut seen = BTreeSet::new();
    for name in &config.shutdown.terminate_signals {
        match name.parse::<Signal>() {
            Ok(signal) if signal.is_forbidden() => {
                errors.push(ValidationError::ForbiddenSignal(signal.to_string()));
            }
            Ok(signal) => {
                if !seen.insert(signal) {
                    errors.push(ValidationError::DuplicateSignal(signal.to_string()));
                }
            }
            Err(_) => errors.push(ValidationError::UnknownSignal(name.clone())),
        }
    }

    check_address(&mut errors, "server.bind_address", &config.server.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
