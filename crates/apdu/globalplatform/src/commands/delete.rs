//! DELETE command for GlobalPlatform
//!
//! Deletes an application, load file or key from the card.

use derive_more::{Deref, Into};
use gpcard_apdu_core::{Command, command::MAX_SHORT_LE};

use super::push_lv;
use crate::Result;
use crate::constants::{cla, ins, tags};

/// DELETE command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct DeleteCommand(Command);

impl DeleteCommand {
    /// Delete the object identified by `aid`
    pub fn with_aid(aid: &[u8]) -> Result<Self> {
        let mut data = vec![tags::AID];
        push_lv(&mut data, aid)?;
        Ok(Self(Command::new_with_data(
            cla::GP,
            ins::DELETE,
            0x00,
            0x00,
            data,
        )))
    }

    /// Delete a key by identifier and version
    pub fn with_key(key_id: u8, key_version: u8) -> Self {
        Self(Command::new_with_data_and_le(
            cla::GP,
            ins::DELETE,
            0x00,
            0x00,
            vec![tags::KEY_ID, 0x01, key_id, tags::KEY_VERSION, 0x01, key_version],
            MAX_SHORT_LE,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_delete_object() {
        let cmd = DeleteCommand::with_aid(&hex!("A0000000030000")).unwrap();
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80E40000094F07A0000000030000"));

        assert!(DeleteCommand::with_aid(&[0u8; 256]).is_err());
    }

    #[test]
    fn test_delete_key() {
        let cmd = DeleteCommand::with_key(0x01, 0x21);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80E4000006D00101D2012100"));
    }
}
