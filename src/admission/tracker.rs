//! Per-source connection attempt tracking.
//!
//! The admission count is "how many of the last N attempts are still
//! remembered", not "attempts within a time window". Age only matters when
//! the sweeper decides whether to forget a source entirely.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::source::SourceKey;
use super::unix_now;
use super::window::EventWindow;

/// Seconds without any attempt after which a source is forgotten.
pub const STALENESS_HORIZON_SECS: i64 = 60;

/// Tracks recent connection attempts for every source.
///
/// A single lock covers the whole map. Per-key work is O(capacity) and the
/// capacity is a small constant, so contention is bounded by accept rate.
#[derive(Debug)]
pub struct AttemptTracker {
    capacity: NonZeroUsize,
    attempts: Mutex<HashMap<SourceKey, EventWindow>>,
}

impl AttemptTracker {
    /// Create a tracker remembering at most `capacity` attempts per source.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt from `key` now and return how many attempts are
    /// remembered for it, this one included.
    pub fn record_and_count(&self, key: SourceKey) -> usize {
        self.record_and_count_at(key, unix_now())
    }

    /// Same as [`record_and_count`](Self::record_and_count) with an explicit
    /// clock value.
    pub fn record_and_count_at(&self, key: SourceKey, now: i64) -> usize {
        let mut attempts = self.lock();
        let window = attempts
            .entry(key)
            .or_insert_with(|| EventWindow::new(self.capacity));
        window.record(now);
        window.len()
    }

    /// Forget every source whose attempts are all at least
    /// [`STALENESS_HORIZON_SECS`] old. Returns the number of evicted sources.
    pub fn sweep(&self, now: i64) -> usize {
        let cutoff = now - STALENESS_HORIZON_SECS;
        let mut attempts = self.lock();
        let before = attempts.len();
        attempts.retain(|_, window| window.iter().any(|t| t > cutoff));
        before - attempts.len()
    }

    /// Number of sources currently tracked.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SourceKey, EventWindow>> {
        // Every mutation leaves the map valid, so a poisoned lock is still usable.
        self.attempts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
