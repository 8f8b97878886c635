//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept, connection limit)
//!     → connection.rs (connection id for spans)
//!     → Hand off to the gateway
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - The permit lives as long as the connection task

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, Peer};
pub use listener::{ConnectionPermit, Listener, ListenerError};
