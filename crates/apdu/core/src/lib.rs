//! Core types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types for exchanging command and response APDUs
//! with a smart card according to ISO/IEC 7816-4.
//!
//! ## Overview
//!
//! - [`Command`] encodes and decodes all seven command length cases, short and extended
//! - [`Response`] splits response bytes into payload and [`StatusWord`]
//! - [`CardTransport`] is the blocking "bytes in, bytes out" link to a card
//! - [`chain`] splits commands that exceed one transport unit into chained pieces
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod chain;
pub mod command;
pub mod response;
pub mod transport;

mod error;
pub use error::{Error, Result};

pub use chain::{ChainMode, split_command, transmit_chain};
pub use command::{ApduCase, Command, ExpectedLength};
pub use response::status::StatusWord;
pub use response::{Response, utils};
pub use transport::{CardTransport, TransportError};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        ApduCase, Bytes, BytesMut, ChainMode, Command, Error, ExpectedLength, Response, Result,
        response::status::{StatusWord, common as status},
        transport::{CardTransport, TransportError},
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        assert_eq!(cmd.cla, 0x00);
        assert_eq!(cmd.ins, 0xA4);
        assert_eq!(cmd.case(), ApduCase::Case1);

        let resp = Response::success(Bytes::from_static(&[0x01, 0x02, 0x03]));
        assert!(resp.is_success());
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}
