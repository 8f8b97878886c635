//! TCP gateway with per-source admission control.

pub mod admission;
pub mod config;
pub mod gateway;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod tunnel;

pub use config::GatewayConfig;
pub use gateway::Gateway;
pub use lifecycle::{Shutdown, ShutdownSignal};
