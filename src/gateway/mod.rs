//! Connection gateway.
//!
//! # Data Flow
//! ```text
//! Accepted connection
//!     → SourceKey from peer address        (non-IPv4 → REJECTED_SESSION)
//!     → AttemptTracker::record_and_count   (over limit → ATTEMPTS_EXCEEDED)
//!     → first message → HandshakeAuthorizer (→ MALFORMED_LOGIN / REJECTED_SESSION)
//!     → dial backend with timeout          (→ UNABLE_TO_CONNECT)
//!     → forward address + handshake        (→ NO_RESPONSE)
//!     → RelayTunnel::run
//! ```
//!
//! # Design Decisions
//! - Admission and handshake failures end at the connection boundary
//! - Tunnel failures stay inside the tunnel
//! - The accept loop outlives any single connection

use std::io;
use std::net::IpAddr;

pub mod handshake;
pub mod reject;
pub mod server;

pub use handshake::{HandshakeAuthorizer, HandshakeRejection, LoginHandshake};
pub use reject::RejectCode;
pub use server::Gateway;

use crate::admission::SourceKey;

/// Why a connection never reached the tunnel.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("source address {0} is not IPv4")]
    UnsupportedAddress(IpAddr),
    #[error("too many connection attempts from {key} ({attempts})")]
    AttemptsExceeded { key: SourceKey, attempts: usize },
    #[error("failed to read handshake: {0}")]
    HandshakeRead(#[source] io::Error),
    #[error("no handshake received in time")]
    HandshakeTimeout,
    #[error("handshake rejected: {0}")]
    Handshake(#[from] HandshakeRejection),
    #[error("backend {address} unreachable: {source}")]
    BackendUnreachable { address: String, source: io::Error },
    #[error("backend {address} did not accept in time")]
    BackendTimeout { address: String },
    #[error("failed to forward handshake to backend: {0}")]
    Forward(#[source] io::Error),
}

impl SessionError {
    /// Code written to the client before closing.
    pub fn reject_code(&self) -> RejectCode {
        match self {
            SessionError::UnsupportedAddress(_)
            | SessionError::HandshakeRead(_)
            | SessionError::HandshakeTimeout => RejectCode::RejectedSession,
            SessionError::AttemptsExceeded { .. } => RejectCode::AttemptsExceeded,
            SessionError::Handshake(rejection) => rejection.reject_code(),
            SessionError::BackendUnreachable { .. } | SessionError::BackendTimeout { .. } => {
                RejectCode::UnableToConnect
            }
            SessionError::Forward(_) => RejectCode::NoResponse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv6Addr;

    #[test]
    fn backend_failures_map_to_unable_to_connect() {
        let timeout = SessionError::BackendTimeout {
            address: "10.0.0.1:43595".into(),
        };
        let refused = SessionError::BackendUnreachable {
            address: "10.0.0.1:43595".into(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(timeout.reject_code(), RejectCode::UnableToConnect);
        assert_eq!(refused.reject_code(), RejectCode::UnableToConnect);
    }

    #[test]
    fn session_failures_map_to_codes() {
        let cases = [
            (SessionError::UnsupportedAddress(Ipv6Addr::LOCALHOST.into()), RejectCode::RejectedSession),
            (SessionError::HandshakeTimeout, RejectCode::RejectedSession),
            (
                SessionError::HandshakeRead(io::Error::from(io::ErrorKind::ConnectionReset)),
                RejectCode::RejectedSession,
            ),
            (SessionError::Handshake(HandshakeRejection::Empty), RejectCode::RejectedSession),
            (
                SessionError::Handshake(HandshakeRejection::UnexpectedOpcode { opcode: 1 }),
                RejectCode::MalformedLogin,
            ),
            (
                SessionError::Forward(io::Error::from(io::ErrorKind::BrokenPipe)),
                RejectCode::NoResponse,
            ),
        ];
        for (error, code) in cases {
            assert_eq!(error.reject_code(), code, "{error}");
        }
    }
}
