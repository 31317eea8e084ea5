//! PUT KEY command for GlobalPlatform
//!
//! Replaces the ENC, MAC and DEK keys of key identifier 1. Each key travels as a key part
//! record encrypted under the session DEK:
//!
//! ```text
//! 80  10  3DES-ECB(session DEK, key)  03  KCV(3)
//! ```

use cipher::Key;
use derive_more::{Deref, Into};
use gpcard_apdu_core::{Command, command::MAX_SHORT_LE};

use crate::Result;
use crate::constants::{cla, ins, put_key_p2, tags};
use crate::crypto::{Scp02, encrypt_ecb, key_check_value};
use crate::keys::{KEY_LEN, KeyPart, KeySet};

/// Length of one key part record
pub const KEY_PART_LEN: usize = 2 + KEY_LEN + 1 + 3;

/// PUT KEY command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct PutKeyCommand(Command);

impl PutKeyCommand {
    /// Replace the keys of `current_version` with `keys` under `new_version`
    ///
    /// `keys` are sent as given; callers apply odd parity beforehand.
    pub fn with_keys(
        current_version: u8,
        new_version: u8,
        keys: &KeySet,
        session_dek: &Key<Scp02>,
    ) -> Result<Self> {
        let mut data = Vec::with_capacity(1 + 3 * KEY_PART_LEN);
        data.push(new_version);
        for part in KeyPart::ALL {
            data.extend_from_slice(&key_part(keys.get(part), session_dek)?);
        }

        Ok(Self(Command::new_with_data_and_le(
            cla::GP,
            ins::PUT_KEY,
            current_version,
            put_key_p2::MULTIPLE_KEYS_ID_1,
            data,
            MAX_SHORT_LE,
        )))
    }
}

/// Build the key part record for one key
pub fn key_part(key: &Key<Scp02>, session_dek: &Key<Scp02>) -> Result<[u8; KEY_PART_LEN]> {
    let wrapped = encrypt_ecb(session_dek, key)?;
    let kcv = key_check_value(key);

    let mut part = [0u8; KEY_PART_LEN];
    part[0] = tags::KEY_TYPE_DES;
    part[1] = KEY_LEN as u8;
    part[2..18].copy_from_slice(&wrapped);
    part[18] = kcv.len() as u8;
    part[19..22].copy_from_slice(&kcv);
    Ok(part)
}
