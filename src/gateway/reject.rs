//! Client-facing rejection codes.
//!
//! A rejected client receives exactly one byte, then the connection closes
//! after a short delay so the client has time to read it.

use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Single-byte codes written to a client before closing.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
    UnableToConnect = 8,
    RejectedSession = 11,
    AttemptsExceeded = 16,
    MalformedLogin = 27,
    NoResponse = 28,
}

impl RejectCode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// Label used in logs and metrics.
    pub fn reason(self) -> &'static str {
        match self {
            RejectCode::UnableToConnect => "unable_to_connect",
            RejectCode::RejectedSession => "rejected_session",
            RejectCode::AttemptsExceeded => "attempts_exceeded",
            RejectCode::MalformedLogin => "malformed_login",
            RejectCode::NoResponse => "no_response",
        }
    }
}

impl TryFrom<u8> for RejectCode {
    type Error = u8;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            8 => Ok(RejectCode::UnableToConnect),
            11 => Ok(RejectCode::RejectedSession),
            16 => Ok(RejectCode::AttemptsExceeded),
            27 => Ok(RejectCode::MalformedLogin),
            28 => Ok(RejectCode::NoResponse),
            other => Err(other),
        }
    }
}

/// Write `code`, wait `delay`, then shut the stream down.
///
/// Failures are ignored: the client may already be gone.
pub async fn send_rejection<S>(stream: &mut S, code: RejectCode, delay: Duration)
where
    S: AsyncWrite + Unpin,
{
    if let Err(e) = stream.write_all(&[code.as_byte()]).await {
        tracing::debug!(error = %e, code = code.reason(), "Failed to write rejection code");
        return;
    }
    let _ = stream.flush().await;
    tokio::time::sleep(delay).await;
    let _ = stream.shutdown().await;
}
