//! tcp-gatekeeper
//!
//! A TCP gateway in front of a single backend. Clients are admitted per
//! source address, must open with a one-message handshake, and are then
//! relayed byte-for-byte to the backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────┐
//!                      │                   GATEKEEPER                      │
//!                      │                                                   │
//!   Client             │  ┌──────────┐   ┌───────────┐   ┌────────────┐   │
//!   ───────────────────┼─▶│   net    │──▶│ admission │──▶│  gateway   │   │
//!                      │  │ listener │   │  tracker  │   │ handshake  │   │
//!                      │  └──────────┘   └─────▲─────┘   └─────┬──────┘   │
//!                      │                       │               │          │
//!                      │                 ┌─────┴─────┐   ┌─────▼──────┐   │
//!                      │                 │  sweeper  │   │   tunnel   │◀──┼──▶ Backend
//!                      │                 └───────────┘   │ two pumps  │   │
//!                      │                                 └────────────┘   │
//!                      │  config · observability · lifecycle               │
//!                      └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use tcp_gatekeeper::config::{load_config, ConfigOverrides};
use tcp_gatekeeper::lifecycle::{signals, startup, Shutdown};
use tcp_gatekeeper::observability::logging;

#[derive(Parser)]
#[command(name = "tcp-gatekeeper")]
#[command(about = "TCP gateway with per-source admission control", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Address to accept clients on, e.g. 0.0.0.0:43594.
    #[arg(long, env = "BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Backend to relay to, as host:port.
    #[arg(long, env = "BACKEND_ADDRESS")]
    backend_address: Option<String>,

    /// Attempts a source may make before being refused.
    #[arg(long, env = "MAX_ATTEMPTS")]
    max_attempts: Option<usize>,

    /// Log filter directive.
    #[arg(long, env = "LOG_LEVEL")]
    log_level: Option<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind_address: self.bind_address.clone(),
            backend_address: self.backend_address.clone(),
            max_attempts: self.max_attempts,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), &cli.overrides())?;

    logging::init(&config.observability)?;

    tracing::info!("tcp-gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.address,
        max_attempts = config.admission.max_attempts,
        "Configuration loaded"
    );

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match signals::shutdown_signal().await {
            Ok(()) => trigger.trigger(),
            Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signals"),
        }
    });

    startup::run(config, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
