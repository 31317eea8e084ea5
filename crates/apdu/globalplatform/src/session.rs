//! SCP02 session state
//!
//! A [`Session`] exists while a secure channel is being established or is open. It owns the
//! three session keys and the MAC chaining value, which is the only state that changes
//! between commands.

use std::fmt;

use tracing::debug;

use crate::commands::initialize_update::InitializeUpdateResponse;
use crate::constants::{MAX_APDU_DATA_LEN, MAC_LEN, external_auth_p1};
use crate::crypto::{
    CardChallenge, Cryptogram, DERIVATION_DEK, DERIVATION_ENC, DERIVATION_MAC, HostChallenge,
    Icv, Scp02Mac, SequenceCounter, calculate_cryptogram, derive_key, mac_full_3des, next_icv,
};
use crate::keys::KeySet;
use crate::{Error, Result};

/// Secure messaging options applied to commands of an open session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SecurityLevel {
    /// Commands carry a MAC
    pub mac: bool,
    /// Command data is encrypted
    pub encryption: bool,
}

impl SecurityLevel {
    /// No secure messaging
    pub const NONE: Self = Self::new(false, false);
    /// MAC only
    pub const MAC: Self = Self::new(true, false);
    /// Encryption only
    pub const ENC: Self = Self::new(false, true);
    /// MAC and encryption
    pub const MAC_ENC: Self = Self::new(true, true);

    /// Create a security level
    pub const fn new(mac: bool, encryption: bool) -> Self {
        Self { mac, encryption }
    }

    /// P1 of EXTERNAL AUTHENTICATE requesting this level
    pub const fn p1(self) -> u8 {
        let mut p1 = 0;
        if self.mac {
            p1 |= external_auth_p1::CMAC;
        }
        if self.encryption {
            p1 |= external_auth_p1::CDECRYPTION;
        }
        p1
    }

    /// Whether any secure messaging applies
    pub const fn is_secure(self) -> bool {
        self.mac || self.encryption
    }

    /// Largest plain data field per command, leaving room for padding and MAC
    pub const fn max_data_len(self) -> usize {
        let mut len = MAX_APDU_DATA_LEN;
        if self.mac {
            len -= MAC_LEN;
        }
        if self.encryption {
            len -= MAC_LEN;
        }
        len
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.mac, self.encryption) {
            (true, true) => write!(f, "MAC+ENC"),
            (true, false) => write!(f, "MAC"),
            (false, true) => write!(f, "ENC"),
            (false, false) => write!(f, "none"),
        }
    }
}

/// Session keys and MAC chaining state of one secure channel
pub struct Session {
    keys: KeySet,
    icv: Icv,
    level: SecurityLevel,
    key_version: u8,
    sequence_counter: SequenceCounter,
    card_challenge: CardChallenge,
    host_challenge: HostChallenge,
}

impl Session {
    /// Derive session keys and verify the card cryptogram
    ///
    /// `static_keys` are the card keys for the key version the card reported.
    pub fn new(
        static_keys: &KeySet,
        response: &InitializeUpdateResponse,
        host_challenge: HostChallenge,
    ) -> Result<Self> {
        let seq = response.sequence_counter;
        let keys = KeySet::new(
            derive_key(static_keys.enc(), &seq, &DERIVATION_ENC).into(),
            derive_key(static_keys.mac(), &seq, &DERIVATION_MAC).into(),
            derive_key(static_keys.dek(), &seq, &DERIVATION_DEK).into(),
        );

        let expected = calculate_cryptogram(
            keys.enc(),
            &seq,
            &response.card_challenge,
            &host_challenge,
            false,
        );
        if expected != response.card_cryptogram {
            debug!("Card cryptogram mismatch");
            return Err(Error::AuthenticationFailure("card cryptogram mismatch"));
        }

        Ok(Self {
            keys,
            icv: [0u8; 8],
            level: SecurityLevel::NONE,
            key_version: response.key_version,
            sequence_counter: seq,
            card_challenge: response.card_challenge,
            host_challenge,
        })
    }

    /// Session over already derived keys, skipping the cryptogram exchange
    #[cfg(test)]
    pub(crate) fn with_session_keys(keys: KeySet) -> Self {
        Self {
            keys,
            icv: [0u8; 8],
            level: SecurityLevel::NONE,
            key_version: 0,
            sequence_counter: [0u8; 2],
            card_challenge: [0u8; 6],
            host_challenge: [0u8; 8],
        }
    }

    /// Host cryptogram sent with EXTERNAL AUTHENTICATE
    pub fn host_cryptogram(&self) -> Cryptogram {
        calculate_cryptogram(
            self.keys.enc(),
            &self.sequence_counter,
            &self.card_challenge,
            &self.host_challenge,
            true,
        )
    }

    /// Compute the MAC of `data` and advance the chaining value
    pub fn compute_mac(&mut self, data: &[u8]) -> Scp02Mac {
        let mac = mac_full_3des(self.keys.mac(), &self.icv, data);
        self.icv = next_icv(self.keys.mac(), &mac);
        mac
    }

    /// Session keys
    pub const fn keys(&self) -> &KeySet {
        &self.keys
    }

    /// Current MAC chaining value
    pub const fn icv(&self) -> &Icv {
        &self.icv
    }

    /// Negotiated security level
    pub const fn security_level(&self) -> SecurityLevel {
        self.level
    }

    pub(crate) const fn set_security_level(&mut self, level: SecurityLevel) {
        self.level = level;
    }

    /// Key version reported by the card
    pub const fn key_version(&self) -> u8 {
        self.key_version
    }

    /// Sequence counter reported by the card
    pub const fn sequence_counter(&self) -> &SequenceCounter {
        &self.sequence_counter
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("level", &self.level)
            .field("key_version", &self.key_version)
            .field("sequence_counter", &hex::encode_upper(self.sequence_counter))
            .finish_non_exhaustive()
    }
}
