//! Core error type for APDU operations
//!
//! Transport and response failures bubble up through this type so callers only need to
//! handle a single error when encoding, chaining or exchanging APDUs.

use bytes::Bytes;

use crate::response::error::ResponseError;
use crate::transport::TransportError;

/// Result type for core APDU operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type that encompasses all possible errors in the crate
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Byte layout matches none of the seven command APDU cases
    #[error("Malformed APDU: {}", hex::encode_upper(.0))]
    MalformedApdu(Bytes),

    /// Command data does not fit in an extended length field
    #[error("Invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// Error raised by the card transport
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Error while interpreting response bytes
    #[error(transparent)]
    Response(#[from] ResponseError),
}

impl Error {
    /// Create a malformed APDU error carrying the offending bytes
    pub fn malformed(apdu: &[u8]) -> Self {
        Self::MalformedApdu(Bytes::copy_from_slice(apdu))
    }
}
