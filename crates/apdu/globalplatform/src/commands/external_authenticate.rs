//! EXTERNAL AUTHENTICATE command for GlobalPlatform
//!
//! This command is used to authenticate the host to the card. P1 carries the requested
//! security level.

use derive_more::{Deref, Into};
use gpcard_apdu_core::Command;

use crate::constants::{cla, ins};
use crate::crypto::Cryptogram;
use crate::session::SecurityLevel;

/// EXTERNAL AUTHENTICATE command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct ExternalAuthenticateCommand(Command);

impl ExternalAuthenticateCommand {
    /// Create an EXTERNAL AUTHENTICATE command carrying the host cryptogram
    pub fn with_host_cryptogram(level: SecurityLevel, host_cryptogram: &Cryptogram) -> Self {
        Self(Command::new_with_data(
            cla::GP,
            ins::EXTERNAL_AUTHENTICATE,
            level.p1(),
            0x00,
            host_cryptogram.to_vec(),
        ))
    }
}
