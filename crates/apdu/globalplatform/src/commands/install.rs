//! INSTALL command for GlobalPlatform
//!
//! Covers the two forms used for application deployment: [for load] before LOAD, and
//! [for install and make selectable] to create an application instance.

use derive_more::{Deref, Into};
use gpcard_apdu_core::Command;

use super::push_lv;
use crate::Result;
use crate::constants::{cla, ins, install_p1, tags};

/// INSTALL command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct InstallCommand(Command);

impl InstallCommand {
    /// INSTALL [for load]
    ///
    /// Data: `len lfAid len sdAid 00 00 00` (no hash, load parameters or token).
    pub fn for_load(load_file_aid: &[u8], security_domain_aid: &[u8]) -> Result<Self> {
        let mut data = Vec::with_capacity(5 + load_file_aid.len() + security_domain_aid.len());
        push_lv(&mut data, load_file_aid)?;
        push_lv(&mut data, security_domain_aid)?;
        data.extend_from_slice(&[0x00, 0x00, 0x00]);

        Ok(Self(Command::new_with_data(
            cla::GP,
            ins::INSTALL,
            install_p1::FOR_LOAD,
            0x00,
            data,
        )))
    }

    /// INSTALL [for install and make selectable]
    ///
    /// The install parameters are wrapped in a `C9` tag; no install token is sent.
    pub fn for_install(
        load_file_aid: &[u8],
        module_aid: &[u8],
        application_aid: &[u8],
        privileges: u8,
        install_params: &[u8],
    ) -> Result<Self> {
        let mut params = vec![tags::INSTALL_PARAMETERS];
        push_lv(&mut params, install_params)?;

        let mut data = Vec::new();
        push_lv(&mut data, load_file_aid)?;
        push_lv(&mut data, module_aid)?;
        push_lv(&mut data, application_aid)?;
        push_lv(&mut data, &[privileges])?;
        push_lv(&mut data, &params)?;
        data.push(0x00);

        Ok(Self(Command::new_with_data(
            cla::GP,
            ins::INSTALL,
            install_p1::FOR_INSTALL_AND_MAKE_SELECTABLE,
            0x00,
            data,
        )))
    }
}
