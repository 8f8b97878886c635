//! Configuration validation.
//!
//! Serde handles syntax; this checks value ranges and address formats.
//! Every problem is reported, not just the first.

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("{field}: expected host:port, got {value:?}")]
    InvalidHostPort { field: &'static str, value: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Check `config` for semantic errors.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_nonzero(&mut errors, "listener.max_connections", config.listener.max_connections as u64);

    if !is_host_port(&config.backend.address) {
        errors.push(ValidationError::InvalidHostPort {
            field: "backend.address",
            value: config.backend.address.clone(),
        });
    }
    check_nonzero(&mut errors, "backend.connect_timeout_ms", config.backend.connect_timeout_ms);

    check_nonzero(&mut errors, "admission.max_attempts", config.admission.max_attempts as u64);
    check_nonzero(&mut errors, "admission.sweep_interval_secs", config.admission.sweep_interval_secs);

    check_nonzero(&mut errors, "handshake.read_buffer_bytes", config.handshake.read_buffer_bytes as u64);
    check_nonzero(&mut errors, "handshake.timeout_ms", config.handshake.timeout_ms);

    if config.observability.metrics_enabled {
        check_socket_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_nonzero(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError::Zero { field });
    }
}

/// `host:port` with a non-empty host and a numeric port. DNS names are
/// allowed; resolution happens at dial time.
fn is_host_port(value: &str) -> bool {
    match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
