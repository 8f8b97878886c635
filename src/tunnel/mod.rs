//! Byte relay between an admitted client and the backend.
//!
//! # Data Flow
//! ```text
//! RelayTunnel::run
//!     → split client and backend streams
//!     → pump client→backend  ┐ each: read → write → flush, until error/EOF
//!     → pump backend→client  ┘
//!     → first failure fires Teardown (once), cancelling the other pump
//!     → both pumps joined → both streams shut down and dropped
//! ```
//!
//! # Design Decisions
//! - No retries: a half-broken stream cannot be resumed
//! - Streams are only touched by their pumps and the final close step
//! - Teardown is an atomic one-shot, never a pair of racing closes

use std::fmt;

pub mod relay;
pub mod teardown;

pub use relay::{RelayTunnel, TunnelReport};
pub use teardown::{Teardown, TeardownCause};

/// Direction of a pump inside a tunnel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToBackend => "client_to_backend",
            Direction::BackendToClient => "backend_to_client",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
