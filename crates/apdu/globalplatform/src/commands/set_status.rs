//! SET STATUS command for GlobalPlatform

use bytes::Bytes;
use derive_more::{Deref, Into};
use gpcard_apdu_core::Command;

use crate::constants::{cla, ins};

/// SET STATUS command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct SetStatusCommand(Command);

impl SetStatusCommand {
    /// Set the life cycle state of the object identified by `aid`
    pub fn new(status_type: u8, state_control: u8, aid: impl Into<Bytes>) -> Self {
        Self(Command::new_with_data(
            cla::GP,
            ins::SET_STATUS,
            status_type,
            state_control,
            aid,
        ))
    }
}
