//! Graceful shutdown coordination for long-running services.
//!
//! Converts OS termination signals into a bounded, two-phase shutdown:
//! cancel a shared token, then run every registered cleanup task
//! concurrently under a hard deadline.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::{CancellationToken, ShutdownCoordinator, ShutdownState, Signal};
