//! Startup orchestration.
//!
//! Order: metrics → shared admission state → listener → sweeper → gateway.
//! Any failure before the gateway starts is fatal; after that the gateway
//! runs until shutdown.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::admission::{AttemptTracker, Sweeper};
use crate::config::GatewayConfig;
use crate::gateway::Gateway;
use crate::lifecycle::Shutdown;
use crate::net::{Listener, ListenerError};
use crate::observability::{metrics, Stats};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),
    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),
    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
}

/// Bind the gateway and serve until `shutdown` fires.
///
/// Returns after the gateway has drained and the sweeper has stopped.
pub async fn run(config: GatewayConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr)?;
    }

    let tracker = Arc::new(AttemptTracker::new(config.admission.window_capacity()));
    let stats = Arc::new(Stats::new());

    let listener = Listener::bind(&config.listener).await?;

    let sweeper = Sweeper::new(
        Arc::clone(&tracker),
        Arc::clone(&stats),
        config.admission.sweep_interval(),
    );
    let sweeper_task = tokio::spawn(sweeper.run(shutdown.subscribe()));

    let gateway = Arc::new(Gateway::new(config, tracker, stats));
    gateway.run(listener, shutdown.subscribe()).await;

    if let Err(e) = sweeper_task.await {
        tracing::error!(error = %e, "Sweeper task failed");
    }
    Ok(())
}
