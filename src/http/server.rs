//! HTTP server setup.
//!
//! # Responsibilities
//! - Create Axum Router with the service handlers
//! - Serve until the shutdown token is cancelled
//! - Hook the server into the shutdown coordinator
//!
//! # Design Decisions
//! - The server is a coordinator worker: a bind or serve error cancels the token
//! - Its cleanup task (`stopHttpServer`) waits for in-flight requests to drain
//! - `/health` reports 503 as soon as shutdown begins

use std::net::SocketAddr;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::lifecycle::ShutdownCoordinator;

/// Name of the cleanup task that waits for the server to stop.
pub const CLEANUP_NAME: &str = "stopHttpServer";

/// HTTP server for the service.
pub struct HttpServer {
    listener: TcpListener,
}

impl HttpServer {
    /// Wrap an already-bound listener.
    pub fn new(listener: TcpListener) -> Self {
        Self { listener }
    }

    /// Bind to `address`.
    pub async fn bind(address: &str) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(address).await?;
        Ok(Self::new(listener))
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    fn build_router(token: CancellationToken) -> Router {
        Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .with_state(token)
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` is cancelled, then finish in-flight requests.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), std::io::Error> {
        let addr = self.listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let router = Self::build_router(shutdown.clone());
        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server as a coordinator worker named [`CLEANUP_NAME`].
    pub fn spawn(self, coordinator: &mut ShutdownCoordinator) {
        coordinator.spawn_worker(CLEANUP_NAME, move |token| self.run(token));
    }

    /// Bind and serve inside a coordinator worker.
    ///
    /// A bind failure ends the worker, which cancels the shared token and
    /// starts shutdown like any other trigger.
    pub fn launch(address: impl Into<String>, coordinator: &mut ShutdownCoordinator) {
        let address = address.into();
        coordinator.spawn_worker(CLEANUP_NAME, move |token| async move {
            let server = match Self::bind(&address).await {
                Ok(server) => server,
                Err(e) => {
                    tracing::error!(address = %address, error = %e, "Failed to bind HTTP server");
                    return Err(e);
                }
            };
            server.run(token).await
        });
    }
}

async fn root() -> &'static str {
    concat!("graceful-shutdown ", env!("CARGO_PKG_VERSION"))
}

async fn health(State(token): State<CancellationToken>) -> (StatusCode, &'static str) {
    if token.is_cancelled() {
        (StatusCode::SERVICE_UNAVAILABLE, "shutting down")
    } else {
        (StatusCode::OK, "ok")
    }
}
