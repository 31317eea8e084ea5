//! SELECT command for GlobalPlatform
//!
//! This command is used to select an application or security domain by AID.

use bytes::Bytes;
use derive_more::{Deref, Into};
use gpcard_apdu_core::{Command, command::MAX_SHORT_LE};

use crate::constants::{cla, ins, select_p1};

/// SELECT command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct SelectCommand(Command);

impl SelectCommand {
    /// Select an application by AID
    pub fn with_aid(aid: impl Into<Bytes>) -> Self {
        Self(Command::new_with_data_and_le(
            cla::ISO7816,
            ins::SELECT,
            select_p1::BY_NAME,
            0x00,
            aid,
            MAX_SHORT_LE,
        ))
    }

    /// Select the Issuer Security Domain
    pub fn with_security_domain() -> Self {
        Self::with_aid(crate::constants::SECURITY_DOMAIN_AID)
    }
}
