//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle produces:
//!     → logging.rs (structured log events per signal and cleanup task)
//!     → metrics.rs (signal, cleanup and deadline counters)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Task name flows through every cleanup log line and metric
//! - Metrics are cheap and inert without an installed recorder

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
