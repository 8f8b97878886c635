//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted connection
//!     → source.rs (peer IPv4 → SourceKey)
//!     → tracker.rs (record attempt, return remembered attempt count)
//!     → gateway compares count with max_attempts
//!
//! Every sweep interval:
//!     sweeper.rs → stats report/reset → tracker.sweep(now)
//! ```
//!
//! # Design Decisions
//! - Counting is capacity-bounded (last N attempts), eviction is age-based
//! - One coarse lock over the whole map; per-key work is O(N), N small
//! - Memory per source is fixed by window.rs regardless of attempt volume

use std::time::{SystemTime, UNIX_EPOCH};

pub mod source;
pub mod sweeper;
pub mod tracker;
pub mod window;

pub use source::SourceKey;
pub use sweeper::Sweeper;
pub use tracker::AttemptTracker;
pub use window::EventWindow;

/// Current wall clock in unix seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
