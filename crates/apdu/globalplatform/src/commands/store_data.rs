//! STORE DATA command for GlobalPlatform
//!
//! Data longer than one command is chained by the secure channel transmit path.

use bytes::Bytes;
use derive_more::{Deref, Into};
use gpcard_apdu_core::Command;

use crate::constants::{cla, ins};

/// STORE DATA command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct StoreDataCommand(Command);

impl StoreDataCommand {
    /// Store `data`, with P1 and P2 taken from `p1p2`
    pub fn new(p1p2: u16, data: impl Into<Bytes>) -> Self {
        let [p1, p2] = p1p2.to_be_bytes();
        Self(Command::new_with_data(cla::GP, ins::STORE_DATA, p1, p2, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_store_data_command() {
        let cmd = StoreDataCommand::new(0x80CF, hex!("0102030405").to_vec());
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80DA80CF050102030405"));
        assert!(cmd.le.is_none());
    }
}
