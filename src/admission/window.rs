//! Fixed-capacity ring of event timestamps.
//!
//! One window exists per tracked source. Memory per window is fixed at
//! construction no matter how many events are recorded into it.

use std::num::NonZeroUsize;

/// Circular buffer of unix-second timestamps.
///
/// Once `len() == capacity()`, each new record overwrites the logically
/// oldest entry.
#[derive(Debug, Clone)]
pub struct EventWindow {
    slots: Box<[i64]>,
    /// Index of the logically oldest entry.
    start: usize,
    len: usize,
}

impl EventWindow {
    /// Create an empty window holding at most `capacity` timestamps.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            slots: vec![0; capacity.get()].into_boxed_slice(),
            start: 0,
            len: 0,
        }
    }

    /// Record an event, evicting the oldest one if the window is full.
    pub fn record(&mut self, timestamp: i64) {
        let capacity = self.slots.len();
        if self.len == capacity {
            self.start = (self.start + 1) % capacity;
        } else {
            self.len += 1;
        }
        let tail = (self.start + self.len - 1) % capacity;
        self.slots[tail] = timestamp;
    }

    /// Number of events currently held.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Stored timestamps, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        let capacity = self.slots.len();
        (0..self.len).map(move |i| self.slots[(self.start + i) % capacity])
    }

    /// Copy of the stored timestamps, oldest first.
    pub fn snapshot(&self) -> Vec<i64> {
        self.iter().collect()
    }
}
