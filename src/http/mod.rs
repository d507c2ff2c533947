//! HTTP subsystem.
//!
//! A small HTTP service that consumes the lifecycle API: it serves until the
//! shared token is cancelled and registers its own drain as a cleanup task.

pub mod server;

pub use server::HttpServer;
