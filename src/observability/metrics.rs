//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_connections_opened_total` (counter): connections admitted to the handshake
//! - `gateway_rejections_total` (counter): rejected connections by reason
//! - `gateway_tunnels_active` (gauge): tunnels currently relaying
//! - `gateway_relay_bytes_total` (counter): bytes read by direction
//! - `gateway_tracked_sources` (gauge): sources held by the attempt tracker
//! - `gateway_evicted_sources_total` (counter): sources dropped by the sweeper
//!
//! Updates go through the `metrics` facade and are no-ops until a recorder
//! is installed with [`init_metrics`].

use std::net::SocketAddr;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::tunnel::Direction;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(
        "gateway_connections_opened_total",
        "Connections that passed admission and reached the handshake"
    );
    describe_counter!("gateway_rejections_total", "Connections rejected with an error code");
    describe_gauge!("gateway_tunnels_active", "Tunnels currently relaying bytes");
    describe_counter!("gateway_relay_bytes_total", "Bytes read from either side of a tunnel");
    describe_gauge!("gateway_tracked_sources", "Sources held by the attempt tracker");
    describe_counter!("gateway_evicted_sources_total", "Sources evicted by the sweeper");

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_opened() {
    counter!("gateway_connections_opened_total").increment(1);
}

pub fn record_rejection(reason: &'static str) {
    counter!("gateway_rejections_total", "reason" => reason).increment(1);
}

pub fn record_tunnel_opened() {
    gauge!("gateway_tunnels_active").increment(1.0);
}

pub fn record_tunnel_closed() {
    gauge!("gateway_tunnels_active").decrement(1.0);
}

pub fn record_relay_bytes(direction: Direction, bytes: usize) {
    counter!("gateway_relay_bytes_total", "direction" => direction.as_str()).increment(bytes as u64);
}

pub fn record_sweep(tracked: usize, evicted: usize) {
    gauge!("gateway_tracked_sources").set(tracked as f64);
    counter!("gateway_evicted_sources_total").increment(evicted as u64);
}
