//! First-message authorization.
//!
//! The gateway reads the client's first message once and asks a
//! [`HandshakeAuthorizer`] whether to admit it. Nothing past the first
//! message is ever decoded.

use super::reject::RejectCode;

/// Why a first message was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeRejection {
    #[error("client closed before sending a handshake")]
    Empty,
    #[error("handshake too long: {len} bytes")]
    Oversized { len: usize },
    #[error("unexpected opcode {opcode}")]
    UnexpectedOpcode { opcode: u8 },
}

impl HandshakeRejection {
    pub fn reject_code(&self) -> RejectCode {
        match self {
            HandshakeRejection::Empty => RejectCode::RejectedSession,
            HandshakeRejection::Oversized { .. } | HandshakeRejection::UnexpectedOpcode { .. } => {
                RejectCode::MalformedLogin
            }
        }
    }
}

/// Decides whether a client's first message may open a session.
pub trait HandshakeAuthorizer: Send + Sync {
    /// Validate `first_message` and return the bytes to forward to the
    /// backend. The gateway prefixes them with the client's address.
    fn authorize(&self, first_message: &[u8]) -> Result<Vec<u8>, HandshakeRejection>;
}

/// Accepts a single-byte login request carrying the expected opcode.
#[derive(Debug, Clone, Copy)]
pub struct LoginHandshake {
    opcode: u8,
}

impl LoginHandshake {
    pub fn new(opcode: u8) -> Self {
        Self { opcode }
    }
}

impl HandshakeAuthorizer for LoginHandshake {
    fn authorize(&self, first_message: &[u8]) -> Result<Vec<u8>, HandshakeRejection> {
        match first_message {
            [] => Err(HandshakeRejection::Empty),
            [opcode] if *opcode == self.opcode => Ok(vec![*opcode]),
            [opcode] => Err(HandshakeRejection::UnexpectedOpcode { opcode: *opcode }),
            longer => Err(HandshakeRejection::Oversized { len: longer.len() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_expected_opcode() {
        assert_eq!(LoginHandshake::new(14).authorize(&[14]), Ok(vec![14]));
    }

    #[test]
    fn extra_bytes_are_malformed() {
        let rejection = LoginHandshake::new(14).authorize(&[14, 0]).unwrap_err();
        assert_eq!(rejection, HandshakeRejection::Oversized { len: 2 });
        assert_eq!(rejection.reject_code(), RejectCode::MalformedLogin);
    }

    #[test]
    fn wrong_opcode_is_malformed() {
        let rejection = LoginHandshake::new(14).authorize(&[15]).unwrap_err();
        assert_eq!(rejection.reject_code(), RejectCode::MalformedLogin);
    }

    #[test]
    fn empty_message_is_rejected_session() {
        let rejection = LoginHandshake::new(14).authorize(&[]).unwrap_err();
        assert_eq!(rejection.reject_code(), RejectCode::RejectedSession);
    }
}
