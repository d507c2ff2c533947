//! graceful-shutdown service
//!
//! An HTTP service whose lifetime is managed by the shutdown coordinator.
//!
//! # Lifecycle
//!
//! ```text
//!   config + CLI ──▶ logging / metrics ──▶ ShutdownCoordinator
//!                                               │
//!        HTTP server (worker) ◀── token ────────┤
//!        SIGUSR1 status handler ◀───────────────┤
//!                                               ▼
//!   SIGINT/SIGTERM/SIGHUP ──▶ cancel ──▶ cleanup tasks ──▶ Drained ──▶ exit
//!                                          │
//!                                          └─ deadline ──▶ forced exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use graceful_shutdown::config::{load_config, validate_config, ConfigError, ServiceConfig};
use graceful_shutdown::lifecycle::{build_coordinator, BoxError, Signal};
use graceful_shutdown::observability::{init_logging, metrics, LogFormat};
use graceful_shutdown::HttpServer;

#[derive(Parser)]
#[command(name = "graceful-shutdown")]
#[command(about = "HTTP service with bounded graceful shutdown", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server.bind_address.
    #[arg(long)]
    bind: Option<String>,

    /// Override shutdown.deadline_secs.
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Override observability.log_format (pretty or json).
    #[arg(long)]
    log_format: Option<String>,
}

impl Cli {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }
        if let Some(deadline) = self.deadline_secs {
            config.shutdown.deadline_secs = deadline;
        }
        if let Some(format) = &self.log_format {
            config.observability.log_format = format.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServiceConfig::default(),
    };
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    let format: LogFormat = config.observability.log_format.parse()?;
    init_logging(&config.observability.log_level, format)?;

    tracing::info!("graceful-shutdown v{} starting", env!("CARGO_PKG_VERSION"));

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let mut coordinator = build_coordinator(&config.shutdown)?;

    if !coordinator.terminate_signals().contains(&Signal::USR1) {
        coordinator.register_signal_handler(Signal::USR1, |token| async move {
            tracing::info!(shutting_down = token.is_cancelled(), "Status requested");
            Ok::<(), BoxError>(())
        })?;
    }

    HttpServer::launch(config.server.bind_address.clone(), &mut coordinator);

    coordinator.wait(config.shutdown.deadline()).await;

    tracing::info!("Exit...");
    Ok(())
}
