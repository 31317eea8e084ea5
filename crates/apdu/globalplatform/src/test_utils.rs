//! Recording transport shared by the unit tests

use bytes::Bytes;
use gpcard_apdu_core::{CardTransport, TransportError};
use hex_literal::hex;

/// INITIALIZE UPDATE answer of a real card holding key version 0x20 of the default key
pub(crate) const CARD_INIT_UPDATE: [u8; 30] =
    hex!("000002650183039536622002000de9c62ba1c4c8e55fcb91b6654ce49000");

/// Host challenge that produced [`CARD_INIT_UPDATE`]
pub(crate) const HOST_CHALLENGE: [u8; 8] = hex!("f0467f908e5ca23f");

#[derive(Debug, Default)]
pub(crate) struct TestMockTransport {
    pub(crate) commands: Vec<Vec<u8>>,
    pub(crate) responses: Vec<Bytes>,
    pub(crate) disconnected: Option<bool>,
}

impl TestMockTransport {
    /// Replay `responses` in order, reusing the last one once the others are consumed
    pub(crate) fn with_responses<I, R>(responses: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: AsRef<[u8]>,
    {
        Self {
            responses: responses
                .into_iter()
                .map(|r| Bytes::copy_from_slice(r.as_ref()))
                .collect(),
            ..Default::default()
        }
    }

    /// Commands sent so far as upper-case hex
    pub(crate) fn sent_hex(&self) -> Vec<String> {
        self.commands.iter().map(hex::encode_upper).collect()
    }
}

impl CardTransport for TestMockTransport {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.commands.push(command.to_vec());

        if self.responses.is_empty() {
            return Err(TransportError::Transmission);
        }

        // Either return the next response or keep reusing the last one
        if self.responses.len() == 1 {
            Ok(self.responses[0].clone())
        } else {
            Ok(self.responses.remove(0))
        }
    }

    fn is_connected(&self) -> bool {
        self.disconnected.is_none()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn disconnect(&mut self, reset: bool) -> Result<(), TransportError> {
        self.disconnected = Some(reset);
        Ok(())
    }
}
