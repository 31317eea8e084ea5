//! INITIALIZE UPDATE command for GlobalPlatform
//!
//! This command is used to start a secure channel session.

use derive_more::{Deref, Into};
use gpcard_apdu_core::{Command, command::MAX_SHORT_LE};
use rand::RngCore;

use crate::constants::{cla, ins};
use crate::crypto::{CardChallenge, Cryptogram, HostChallenge, SequenceCounter};
use crate::keys::KeyData;
use crate::{Error, Result};

/// INITIALIZE UPDATE command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct InitializeUpdateCommand(Command);

impl InitializeUpdateCommand {
    /// Create a new INITIALIZE UPDATE command with a host challenge
    pub fn with_challenge(key_version: u8, host_challenge: &HostChallenge) -> Self {
        Self(Command::new_with_data_and_le(
            cla::GP,
            ins::INITIALIZE_UPDATE,
            key_version,
            0x00,
            host_challenge.to_vec(),
            MAX_SHORT_LE,
        ))
    }

    /// Create a new INITIALIZE UPDATE command with random host challenge
    pub fn with_random_challenge(key_version: u8) -> (Self, HostChallenge) {
        let mut challenge = [0u8; 8];
        rand::rng().fill_bytes(&mut challenge);
        (Self::with_challenge(key_version, &challenge), challenge)
    }
}

/// Successful INITIALIZE UPDATE response data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializeUpdateResponse {
    /// Key diversification data
    pub key_diversification_data: KeyData,
    /// Key version number in use on the card
    pub key_version: u8,
    /// Secure channel protocol identifier
    pub scp_version: u8,
    /// Sequence counter
    pub sequence_counter: SequenceCounter,
    /// Card challenge
    pub card_challenge: CardChallenge,
    /// Card cryptogram
    pub card_cryptogram: Cryptogram,
}

impl InitializeUpdateResponse {
    /// Length of the response data
    pub const LEN: usize = 28;

    /// Parse the response data (without status word)
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        if payload.len() < Self::LEN {
            return Err(Error::Parse("INITIALIZE UPDATE response data too short"));
        }

        let mut response = Self {
            key_diversification_data: [0u8; 10],
            key_version: payload[10],
            scp_version: payload[11],
            sequence_counter: [0u8; 2],
            card_challenge: [0u8; 6],
            card_cryptogram: [0u8; 8],
        };
        response
            .key_diversification_data
            .copy_from_slice(&payload[0..10]);
        response.sequence_counter.copy_from_slice(&payload[12..14]);
        response.card_challenge.copy_from_slice(&payload[14..20]);
        response.card_cryptogram.copy_from_slice(&payload[20..28]);

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_initialize_update_command() {
        let cmd = InitializeUpdateCommand::with_challenge(0x00, &hex!("f0467f908e5ca23f"));
        assert_eq!(cmd.to_bytes().as_ref(), hex!("8050000008f0467f908e5ca23f00"));

        let (cmd, challenge) = InitializeUpdateCommand::with_random_challenge(0x20);
        assert_eq!(cmd.p1, 0x20);
        assert_eq!(cmd.data(), challenge);
    }

    #[test]
    fn test_parse_response() {
        let response = InitializeUpdateResponse::from_payload(&hex!(
            "000002650183039536622002000de9c62ba1c4c8e55fcb91b6654ce4"
        ))
        .unwrap();

        assert_eq!(response.key_diversification_data, hex!("00000265018303953662"));
        assert_eq!(response.key_version, 0x20);
        assert_eq!(response.scp_version, 0x02);
        assert_eq!(response.sequence_counter, hex!("000d"));
        assert_eq!(response.card_challenge, hex!("e9c62ba1c4c8"));
        assert_eq!(response.card_cryptogram, hex!("e55fcb91b6654ce4"));

        assert!(matches!(
            InitializeUpdateResponse::from_payload(&[0u8; 27]),
            Err(Error::Parse(_))
        ));
    }
}
