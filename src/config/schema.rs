//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every
//! section has defaults so a minimal file only names what differs.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, connection limit).
    pub listener: ListenerConfig,

    /// The single backend every tunnel connects to.
    pub backend: BackendConfig,

    /// Connection-attempt limiting.
    pub admission: AdmissionConfig,

    /// First-message validation.
    pub handshake: HandshakeConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    /// Shutdown behaviour.
    pub lifecycle: LifecycleConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:43594").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:43594".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Backend server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend address as `host:port`.
    pub address: String,

    /// Connection establishment timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl BackendConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:43595".to_string(),
            connect_timeout_ms: 3_000,
        }
    }
}

/// Connection-attempt limiting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Attempts a source may make before further ones are refused.
    pub max_attempts: usize,

    /// Seconds between sweeps of the attempt tracker.
    pub sweep_interval_secs: u64,

    /// Delay between writing a rejection code and closing, in milliseconds.
    pub reject_delay_ms: u64,
}

impl AdmissionConfig {
    /// Attempts remembered per source. One more than `max_attempts`, so the
    /// attempt after the last allowed one can be told apart.
    pub fn window_capacity(&self) -> NonZeroUsize {
        NonZeroUsize::MIN.saturating_add(self.max_attempts)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn reject_delay(&self) -> Duration {
        Duration::from_millis(self.reject_delay_ms)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            sweep_interval_secs: 30,
            reject_delay_ms: 1_000,
        }
    }
}

/// First-message validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Opcode a login request must carry.
    pub opcode: u8,

    /// Size of the buffer the first message is read into.
    pub read_buffer_bytes: usize,

    /// Time a client has to send its first message, in milliseconds.
    pub timeout_ms: u64,
}

impl HandshakeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            opcode: 14,
            read_buffer_bytes: 10,
            timeout_ms: 10_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log filter directive (trace, debug, info, warn, error, or per-target).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Shutdown behaviour.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Seconds to wait for live connections after shutdown is signalled.
    pub drain_timeout_secs: u64,
}

impl LifecycleConfig {
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 5,
        }
    }
}
