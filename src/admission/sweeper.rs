//! Periodic housekeeping for admission state.
//!
//! Every interval: log and reset the traffic stats, then evict sources
//! whose attempts have all gone stale.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant};

use super::tracker::AttemptTracker;
use super::unix_now;
use crate::lifecycle::ShutdownSignal;
use crate::observability::{metrics, Stats};

/// Result of one sweep tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: usize,
    pub tracked: usize,
}

pub struct Sweeper {
    tracker: Arc<AttemptTracker>,
    stats: Arc<Stats>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(tracker: Arc<AttemptTracker>, stats: Arc<Stats>, interval: Duration) -> Self {
        Self {
            tracker,
            stats,
            interval,
        }
    }

    /// Tick every interval until shutdown. The first tick fires one full
    /// interval after start.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Sweeper starting");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(unix_now());
                }
                _ = shutdown.recv() => {
                    tracing::info!("Sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    pub fn tick(&self, now: i64) -> SweepReport {
        self.stats.report_and_reset();

        let evicted = self.tracker.sweep(now);
        let tracked = self.tracker.len();
        metrics::record_sweep(tracked, evicted);
        tracing::debug!(evicted, tracked, "Attempt tracker swept");

        SweepReport { evicted, tracked }
    }
}
