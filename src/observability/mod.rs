//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Gateway and tunnels produce:
//!     → logging.rs (structured log events, per-connection spans)
//!     → stats.rs (interval counters, logged and reset by the sweeper)
//!     → metrics.rs (Prometheus counters and gauges)
//! ```
//!
//! # Design Decisions
//! - `Stats` is constructed once and injected; no global counters
//! - Metric updates are no-ops unless the exporter is enabled

pub mod logging;
pub mod metrics;
pub mod stats;

pub use stats::{Stats, StatsSnapshot};
