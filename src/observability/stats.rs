//! Interval traffic counters.
//!
//! Counters accumulate between sweeper ticks; each tick logs them and starts
//! over from zero. The same events are mirrored to [`metrics`](super::metrics)
//! where they are never reset.

use std::sync::atomic::{AtomicU64, Ordering};

use super::metrics;
use crate::tunnel::Direction;

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub connections_opened: u64,
    pub connections_established: u64,
    pub client_bytes_read: u64,
    pub server_bytes_read: u64,
}

/// Shared traffic counters, injected into the gateway and every tunnel.
#[derive(Debug, Default)]
pub struct Stats {
    connections_opened: AtomicU64,
    connections_established: AtomicU64,
    client_bytes_read: AtomicU64,
    server_bytes_read: AtomicU64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A connection passed admission and is about to handshake.
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
        metrics::record_connection_opened();
    }

    pub fn tunnel_established(&self) {
        self.connections_established.fetch_add(1, Ordering::Relaxed);
        metrics::record_tunnel_opened();
    }

    /// Counterpart of [`tunnel_established`](Self::tunnel_established).
    ///
    /// Saturates at zero: a reset may have happened while the tunnel was up.
    pub fn tunnel_closed(&self) {
        let _ = self
            .connections_established
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        metrics::record_tunnel_closed();
    }

    pub fn record_bytes(&self, direction: Direction, bytes: usize) {
        let counter = match direction {
            Direction::ClientToBackend => &self.client_bytes_read,
            Direction::BackendToClient => &self.server_bytes_read,
        };
        counter.fetch_add(bytes as u64, Ordering::Relaxed);
        metrics::record_relay_bytes(direction, bytes);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connections_opened: self.connections_opened.load(Ordering::Relaxed),
            connections_established: self.connections_established.load(Ordering::Relaxed),
            client_bytes_read: self.client_bytes_read.load(Ordering::Relaxed),
            server_bytes_read: self.server_bytes_read.load(Ordering::Relaxed),
        }
    }

    /// Log the current interval and zero every counter.
    pub fn report_and_reset(&self) -> StatsSnapshot {
        let snapshot = StatsSnapshot {
            connections_opened: self.connections_opened.swap(0, Ordering::Relaxed),
            connections_established: self.connections_established.swap(0, Ordering::Relaxed),
            client_bytes_read: self.client_bytes_read.swap(0, Ordering::Relaxed),
            server_bytes_read: self.server_bytes_read.swap(0, Ordering::Relaxed),
        };

        tracing::info!(
            connections_opened = snapshot.connections_opened,
            connections_established = snapshot.connections_established,
            client_transferred_bytes = snapshot.client_bytes_read,
            server_transferred_bytes = snapshot.server_bytes_read,
            "stats"
        );

        snapshot
    }
}
