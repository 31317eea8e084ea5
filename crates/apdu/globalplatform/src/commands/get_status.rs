//! GET STATUS command for GlobalPlatform
//!
//! The three sub-queries return back to back records of the form
//!
//! ```text
//! len  AID  life-cycle  privileges                      (ISD, applications)
//! len  AID  life-cycle  privileges  n  (len AID) * n    (load files and modules)
//! ```
//!
//! Parsers take the full response including the status word and stop two bytes before its
//! end.

use std::fmt;

use bytes::Bytes;
use derive_more::{Deref, Into};
use gpcard_apdu_core::{Command, command::MAX_SHORT_LE};

use crate::constants::{cla, get_status_p1, ins, tags};
use crate::{Error, Result};

/// GET STATUS command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct GetStatusCommand(Command);

impl GetStatusCommand {
    /// Get the status of the objects selected by `p1`, matching any AID
    pub fn all_with_type(p1: u8) -> Self {
        Self(Command::new_with_data_and_le(
            cla::GP,
            ins::GET_STATUS,
            p1,
            0x00,
            Bytes::from_static(&[tags::AID, 0x00]),
            MAX_SHORT_LE,
        ))
    }

    /// Issuer Security Domain only
    pub fn issuer_security_domain() -> Self {
        Self::all_with_type(get_status_p1::ISSUER_SECURITY_DOMAIN)
    }

    /// Applications and supplementary security domains
    pub fn applications() -> Self {
        Self::all_with_type(get_status_p1::APPLICATIONS)
    }

    /// Executable load files and their modules
    pub fn load_files() -> Self {
        Self::all_with_type(get_status_p1::EXEC_LOAD_FILES_AND_MODULES)
    }
}

/// Issuer Security Domain or application record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    /// Application identifier
    pub aid: Vec<u8>,
    /// Life cycle state
    pub life_cycle: u8,
    /// Privileges byte
    pub privileges: u8,
}

/// Executable load file record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFileInfo {
    /// Load file AID
    pub aid: Vec<u8>,
    /// Life cycle state
    pub life_cycle: u8,
    /// Privileges byte
    pub privileges: u8,
    /// Executable module AIDs
    pub modules: Vec<Vec<u8>>,
}

/// Cursor over the record part of a GET STATUS response
struct Records<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Records<'a> {
    fn new(response: &'a [u8]) -> Result<Self> {
        let end = response
            .len()
            .checked_sub(2)
            .ok_or(Error::Parse("GET STATUS response without status word"))?;
        Ok(Self {
            data: &response[..end],
            offset: 0,
        })
    }

    const fn has_more(&self) -> bool {
        self.offset < self.data.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self
            .data
            .get(self.offset..self.offset + len)
            .ok_or(Error::Parse("GET STATUS record overruns response"))?;
        self.offset += len;
        Ok(bytes)
    }

    fn byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn aid(&mut self) -> Result<Vec<u8>> {
        let len = self.byte()?;
        Ok(self.take(usize::from(len))?.to_vec())
    }

    fn application(&mut self) -> Result<ApplicationInfo> {
        Ok(ApplicationInfo {
            aid: self.aid()?,
            life_cycle: self.byte()?,
            privileges: self.byte()?,
        })
    }

    fn load_file(&mut self) -> Result<LoadFileInfo> {
        let aid = self.aid()?;
        let life_cycle = self.byte()?;
        let privileges = self.byte()?;
        let count = self.byte()?;
        let modules = (0..count)
            .map(|_| self.aid())
            .collect::<Result<Vec<_>>>()?;

        Ok(LoadFileInfo {
            aid,
            life_cycle,
            privileges,
            modules,
        })
    }
}

/// Parse the Issuer Security Domain record
pub fn parse_issuer_security_domain(response: &[u8]) -> Result<ApplicationInfo> {
    Records::new(response)?.application()
}

/// Parse application records
pub fn parse_applications(response: &[u8]) -> Result<Vec<ApplicationInfo>> {
    let mut records = Records::new(response)?;
    let mut apps = Vec::new();
    while records.has_more() {
        apps.push(records.application()?);
    }
    Ok(apps)
}

/// Parse load file records with their modules
pub fn parse_load_files(response: &[u8]) -> Result<Vec<LoadFileInfo>> {
    let mut records = Records::new(response)?;
    let mut files = Vec::new();
    while records.has_more() {
        files.push(records.load_file()?);
    }
    Ok(files)
}

const PRIVILEGE_MASKS: [u8; 8] = [0x80, 0xC1, 0xA0, 0x10, 0x08, 0x04, 0x02, 0xC1];
const PRIVILEGE_EXPECTED: [u8; 8] = [0x80, 0xC0, 0xA0, 0x10, 0x08, 0x04, 0x02, 0xC1];
const PRIVILEGE_NAMES: [&str; 8] = [
    "Security Domain",
    "DAP Verification",
    "Delegated Management",
    "Card lock",
    "Card terminate",
    "Default Selected",
    "CVM management",
    "Mandated DAP Verification",
];

/// Names of the privileges set in `privileges`, joined with `|`
pub fn privilege_list(privileges: u8) -> String {
    PRIVILEGE_MASKS
        .iter()
        .zip(PRIVILEGE_EXPECTED)
        .zip(PRIVILEGE_NAMES)
        .filter(|((mask, expected), _)| privileges & **mask == *expected)
        .map(|(_, name)| name)
        .collect::<Vec<_>>()
        .join("|")
}

/// Description of a well-known AID, given as upper-case hex
pub fn aid_description(aid: &str) -> &'static str {
    match aid {
        "A0000000030000" => "visa.openplatform",
        "A0000000035350" => "Security Domain",
        "A000000018434D00" => "Gemalto Card Manager",
        "A0000000620001" => "java.lang",
        "A0000000620002" => "java.io",
        "A0000000620003" => "java.rmi",
        "A0000000620101" => "javacard.framework",
        "A000000062010101" => "javacard.framework.service",
        "A0000000620102" => "javacard.security",
        "A0000000620201" => "javacardx.crypto",
        "A00000015100" => "org.globalplatform",
        "E82881C11702" => "ISO24727 Alpha",
        _ => "",
    }
}

/// Issuer Security Domain life cycle name
pub const fn isd_life_cycle(state: u8) -> &'static str {
    match state {
        0x01 => "OP_READY",
        0x07 => "INITIALIZED",
        0x0F => "SECURED",
        0xEF => "CARD_LOCKED",
        0xFF => "TERMINATED",
        _ => "?",
    }
}

/// Application life cycle name
pub const fn application_life_cycle(state: u8) -> &'static str {
    if state == 0x03 {
        "INSTALLED"
    } else if state & 0x85 == 0x05 {
        "SELECTABLE"
    } else if state & 0x83 == 0x83 {
        "LOCKED"
    } else {
        "?"
    }
}

/// Load file life cycle name
pub const fn load_file_life_cycle(state: u8) -> &'static str {
    if state == 0x01 { "LOADED" } else { "?" }
}

/// Combined result of the three GET STATUS sub-queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetStatusResult {
    /// Issuer Security Domain
    pub isd: ApplicationInfo,
    /// Applications and supplementary security domains
    pub applications: Vec<ApplicationInfo>,
    /// Executable load files
    pub load_files: Vec<LoadFileInfo>,
}

impl fmt::Display for GetStatusResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let aid = hex::encode_upper(&self.isd.aid);
        writeln!(
            f,
            "{:>12} : {:<11} : {:<18} : {:<26} : {}",
            "Card Manager",
            isd_life_cycle(self.isd.life_cycle),
            aid,
            aid_description(&aid),
            privilege_list(self.isd.privileges)
        )?;

        for app in &self.applications {
            let aid = hex::encode_upper(&app.aid);
            writeln!(
                f,
                "{:>12} : {:<11} : {:<18} : {:<26} : {}",
                "Application",
                application_life_cycle(app.life_cycle),
                aid,
                aid_description(&aid),
                privilege_list(app.privileges)
            )?;
        }

        for file in &self.load_files {
            let aid = hex::encode_upper(&file.aid);
            writeln!(
                f,
                "{:>12} : {:<11} : {:<18} : {:<26}",
                "Load File",
                load_file_life_cycle(file.life_cycle),
                aid,
                aid_description(&aid)
            )?;
            for module in &file.modules {
                writeln!(
                    f,
                    "{:>12} : {:<11} : {:<18}",
                    "Module",
                    "",
                    hex::encode_upper(module)
                )?;
            }
        }

        Ok(())
    }
}
