//! One-shot tunnel teardown.
//!
//! Both pumps, and anything outside the tunnel, may ask for teardown at any
//! time and as often as they like. Exactly one request wins: it records the
//! cause and raises the cancellation signal.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use tokio::sync::watch;

use super::Direction;

/// Why a tunnel was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownCause {
    /// The source side of `Direction` closed its stream.
    Eof(Direction),
    ReadFailed(Direction),
    WriteFailed(Direction),
    /// A pump exited without naming a cause (e.g. it panicked).
    PumpExited(Direction),
    /// The owner stopped the tunnel: process shutdown, or `run` dropped.
    Shutdown,
}

impl fmt::Display for TeardownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeardownCause::Eof(d) => write!(f, "{} reached end of stream", d),
            TeardownCause::ReadFailed(d) => write!(f, "{} read failed", d),
            TeardownCause::WriteFailed(d) => write!(f, "{} write failed", d),
            TeardownCause::PumpExited(d) => write!(f, "{} pump exited", d),
            TeardownCause::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Shared teardown state for one tunnel.
#[derive(Debug)]
pub struct Teardown {
    fired: AtomicBool,
    cause: OnceLock<TeardownCause>,
    cancel: watch::Sender<bool>,
}

impl Teardown {
    pub fn new() -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            fired: AtomicBool::new(false),
            cause: OnceLock::new(),
            cancel,
        }
    }

    /// Request teardown. Returns `true` only for the call that performed it.
    pub fn fire(&self, cause: TeardownCause) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        let _ = self.cause.set(cause);
        self.cancel.send_replace(true);
        tracing::debug!(%cause, "Tunnel teardown");
        true
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Cause recorded by the winning [`fire`](Self::fire) call.
    pub fn cause(&self) -> Option<TeardownCause> {
        self.cause.get().copied()
    }

    /// Receiver that flips to `true` once teardown has fired.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.cancel.subscribe()
    }
}

impl Default for Teardown {
    fn default() -> Self {
        Self::new()
    }
}

/// Fires teardown when dropped, so a pump that exits for any reason,
/// unwinding included, releases its peer.
pub(crate) struct FireOnDrop {
    pub(crate) teardown: Arc<Teardown>,
    pub(crate) direction: Direction,
}

impl Drop for FireOnDrop {
    fn drop(&mut self) {
        self.teardown.fire(TeardownCause::PumpExited(self.direction));
    }
}
