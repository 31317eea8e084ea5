//! Error types for GlobalPlatform operations

use bytes::Bytes;
use gpcard_apdu_core::{StatusWord, TransportError, response::error::ResponseError};
use iso7816_tlv::TlvError;
use thiserror::Error;

/// Result type for GlobalPlatform operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for GlobalPlatform operations
#[derive(Debug, Error)]
pub enum Error {
    /// Byte layout matches none of the seven command APDU cases
    #[error("Malformed APDU: {}", hex::encode_upper(.0))]
    MalformedApdu(Bytes),

    /// Transport-related errors
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response-related errors
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Status word outside the set a command accepts
    #[error("{command} ({p1:02X}{p2:02X}) failed with status {status}: {}", status.description())]
    CardStatus {
        /// Command name
        command: &'static str,
        /// First parameter byte
        p1: u8,
        /// Second parameter byte
        p2: u8,
        /// Status word returned by the card
        status: StatusWord,
    },

    /// Key material of the wrong size
    #[error("Crypto precondition failed: {0}")]
    CryptoPrecondition(&'static str),

    /// Card authentication failed
    #[error("Card authentication failed: {0}")]
    AuthenticationFailure(&'static str),

    /// Operation not allowed in the current secure channel state
    #[error("Invalid secure channel state: {0}")]
    SessionState(&'static str),

    /// Command or response data could not be encoded or parsed
    #[error("Parse error: {0}")]
    Parse(&'static str),

    /// BER-TLV encoding or decoding failed
    #[error("TlvError: {0}")]
    Tlv(TlvError),
}

impl Error {
    /// Create a card status error for a command
    pub const fn card_status(command: &'static str, p1: u8, p2: u8, status: StatusWord) -> Self {
        Self::CardStatus {
            command,
            p1,
            p2,
            status,
        }
    }

    /// Status word carried by the error, if any
    pub const fn status(&self) -> Option<StatusWord> {
        match self {
            Self::CardStatus { status, .. } => Some(*status),
            Self::Response(ResponseError::Status(error)) => Some(error.status),
            _ => None,
        }
    }
}

impl From<TlvError> for Error {
    fn from(error: TlvError) -> Self {
        Self::Tlv(error)
    }
}

impl From<gpcard_apdu_core::Error> for Error {
    fn from(error: gpcard_apdu_core::Error) -> Self {
        match error {
            gpcard_apdu_core::Error::MalformedApdu(bytes) => Self::MalformedApdu(bytes),
            gpcard_apdu_core::Error::InvalidCommandLength(_) => {
                Self::Parse("command data exceeds an extended length field")
            }
            gpcard_apdu_core::Error::Transport(error) => Self::Transport(error),
            gpcard_apdu_core::Error::Response(error) => Self::Response(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_status_display() {
        let err = Error::card_status("GET DATA", 0x00, 0xE0, StatusWord::new(0x6A, 0x88));
        assert_eq!(
            err.to_string(),
            "GET DATA (00E0) failed with status 6A88: Referenced data not found"
        );
        assert_eq!(err.status(), Some(StatusWord::new(0x6A, 0x88)));
    }

    #[test]
    fn test_from_core_error() {
        let err = Error::from(gpcard_apdu_core::Error::malformed(&[0x00, 0xA4]));
        assert!(matches!(err, Error::MalformedApdu(bytes) if bytes.as_ref() == [0x00, 0xA4]));

        let err = Error::from(gpcard_apdu_core::Error::Transport(TransportError::Timeout));
        assert!(matches!(err, Error::Transport(TransportError::Timeout)));
        assert_eq!(err.status(), None);
    }
}
