//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Metrics → Tracker/Stats → Bind listener → Sweeper → Gateway
//!
//! Shutdown (shutdown.rs, level-triggered watch):
//!     Signal received → Stop accepting → Tear down tunnels → Drain → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: a listener that cannot bind is fatal
//! - Shutdown has a deadline: sessions still alive after it are aborted

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
