//! GET DATA command for GlobalPlatform
//!
//! Retrieves a data object identified by P1P2. The key information template (`00E0`) is
//! decoded into [`KeyInfo`] entries.

use std::fmt;

use derive_more::{Deref, Into};
use gpcard_apdu_core::{Command, command::MAX_SHORT_LE};
use iso7816_tlv::ber::{Tlv, Value};

use crate::constants::{cla, get_data, ins};
use crate::{Error, Result};

/// GET DATA command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct GetDataCommand(Command);

impl GetDataCommand {
    /// Get the data object identified by `p1p2`
    pub const fn with_tag(p1p2: u16) -> Self {
        let [p1, p2] = p1p2.to_be_bytes();
        Self(Command::new_with_le(
            cla::GP,
            ins::GET_DATA,
            p1,
            p2,
            MAX_SHORT_LE,
        ))
    }

    /// Get the key information template
    pub const fn key_information() -> Self {
        Self::with_tag(get_data::KEY_INFORMATION)
    }
}

/// Identifier and version of one key on the card
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInfo {
    /// Key identifier
    pub id: u8,
    /// Key version number
    pub version: u8,
}

impl fmt::Display for KeyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.version)
    }
}

impl KeyInfo {
    /// Parse a key information template
    ///
    /// Each nested TLV of the template yields one entry from its first two value bytes.
    pub fn parse_template(data: &[u8]) -> Result<Vec<Self>> {
        let template = Tlv::from_bytes(data)?;
        let Value::Constructed(entries) = template.value() else {
            return Err(Error::Parse("key information template is not constructed"));
        };

        entries
            .iter()
            .map(|entry| match entry.value() {
                Value::Primitive(value) if value.len() >= 2 => Ok(Self {
                    id: value[0],
                    version: value[1],
                }),
                _ => Err(Error::Parse("malformed key information entry")),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_get_data_command() {
        let cmd = GetDataCommand::key_information();
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80CA00E000"));

        let cmd = GetDataCommand::with_tag(get_data::CPLC);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80CA9F7F00"));
    }

    #[test]
    fn test_parse_key_information() {
        let data = hex!("E012C00401208810C00402208810C00403208810");
        let keys = KeyInfo::parse_template(&data).unwrap();

        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0], KeyInfo { id: 1, version: 0x20 });
        assert_eq!(
            keys.iter().map(ToString::to_string).collect::<Vec<_>>(),
            ["1/32", "2/32", "3/32"]
        );
    }

    #[test]
    fn test_parse_malformed_key_information() {
        assert!(matches!(
            KeyInfo::parse_template(&hex!("C0020120")),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            KeyInfo::parse_template(&hex!("E003C00101")),
            Err(Error::Parse(_))
        ));
        assert!(KeyInfo::parse_template(&hex!("E012C004")).is_err());
    }
}
