//! Constants used in GlobalPlatform operations
//!
//! This module contains the class bytes, instruction codes, parameter values and well-known
//! AIDs used by the card management commands.

/// GlobalPlatform command classes
pub mod cla {
    /// ISO7816 command class
    pub const ISO7816: u8 = 0x00;
    /// GlobalPlatform command class
    pub const GP: u8 = 0x80;
    /// Secure messaging indication bit
    pub const SECURE_MESSAGING: u8 = 0x04;
}

/// GlobalPlatform instruction codes
pub mod ins {
    /// SELECT command
    pub const SELECT: u8 = 0xA4;
    /// INITIALIZE UPDATE command
    pub const INITIALIZE_UPDATE: u8 = 0x50;
    /// EXTERNAL AUTHENTICATE command
    pub const EXTERNAL_AUTHENTICATE: u8 = 0x82;
    /// GET STATUS command
    pub const GET_STATUS: u8 = 0xF2;
    /// DELETE command
    pub const DELETE: u8 = 0xE4;
    /// GET DATA command
    pub const GET_DATA: u8 = 0xCA;
    /// PUT KEY command
    pub const PUT_KEY: u8 = 0xD8;
    /// INSTALL command
    pub const INSTALL: u8 = 0xE6;
    /// LOAD command
    pub const LOAD: u8 = 0xE8;
    /// SET STATUS command
    pub const SET_STATUS: u8 = 0xF0;
    /// STORE DATA command
    pub const STORE_DATA: u8 = 0xDA;
}

/// Parameter values for SELECT command (P1)
pub mod select_p1 {
    /// Select by DF name
    pub const BY_NAME: u8 = 0x04;
}

/// Parameter values for EXTERNAL AUTHENTICATE command (P1)
pub mod external_auth_p1 {
    /// Command MAC requested
    pub const CMAC: u8 = 0x01;
    /// Command decryption requested
    pub const CDECRYPTION: u8 = 0x02;
}

/// Parameter values for INSTALL command (P1)
pub mod install_p1 {
    /// Install for load
    pub const FOR_LOAD: u8 = 0x02;
    /// Install for install
    pub const FOR_INSTALL: u8 = 0x04;
    /// Install for make selectable
    pub const FOR_MAKE_SELECTABLE: u8 = 0x08;
    /// Install for install and make selectable
    pub const FOR_INSTALL_AND_MAKE_SELECTABLE: u8 = FOR_INSTALL | FOR_MAKE_SELECTABLE;
}

/// Parameter values for LOAD command (P1)
pub mod load_p1 {
    /// More blocks to follow
    pub const MORE_BLOCKS: u8 = 0x00;
    /// Last block
    pub const LAST_BLOCK: u8 = 0x80;
}

/// Parameter values for GET STATUS command (P1)
pub mod get_status_p1 {
    /// Get status of issuer security domain
    pub const ISSUER_SECURITY_DOMAIN: u8 = 0x80;
    /// Get status of applications and security domains
    pub const APPLICATIONS: u8 = 0x40;
    /// Get status of executable load files and their modules
    pub const EXEC_LOAD_FILES_AND_MODULES: u8 = 0x10;
}

/// Status types for SET STATUS command (P1)
pub mod set_status_p1 {
    /// Issuer security domain
    pub const ISSUER_SECURITY_DOMAIN: u8 = 0x80;
    /// Application or supplementary security domain
    pub const APPLICATION: u8 = 0x40;
    /// Security domain and its associated applications
    pub const SECURITY_DOMAIN_AND_APPLICATIONS: u8 = 0x60;
}

/// Parameter values for PUT KEY command (P2)
pub mod put_key_p2 {
    /// Multiple keys, starting with key identifier 1
    pub const MULTIPLE_KEYS_ID_1: u8 = 0x81;
}

/// Tags used in GlobalPlatform commands and responses
pub mod tags {
    /// AID tag for DELETE and GET STATUS
    pub const AID: u8 = 0x4F;
    /// Key identifier tag for DELETE KEY
    pub const KEY_ID: u8 = 0xD0;
    /// Key version tag for DELETE KEY
    pub const KEY_VERSION: u8 = 0xD2;
    /// Load file data block tag
    pub const LOAD_FILE_DATA_BLOCK: u8 = 0xC4;
    /// Application specific install parameters
    pub const INSTALL_PARAMETERS: u8 = 0xC9;
    /// Key type for DES keys in PUT KEY
    pub const KEY_TYPE_DES: u8 = 0x80;
}

/// GET DATA parameters (P1P2)
pub mod get_data {
    /// Key information template
    pub const KEY_INFORMATION: u16 = 0x00E0;
    /// Card production life cycle data
    pub const CPLC: u16 = 0x9F7F;
}

/// Secure Channel Protocol (SCP) versions
pub mod scp {
    /// SCP02 protocol version
    pub const SCP02: u8 = 0x02;
}

/// Largest data field of a short command APDU
pub const MAX_APDU_DATA_LEN: usize = 255;

/// Length of a SCP02 MAC
pub const MAC_LEN: usize = 8;

/// Default GlobalPlatform test key
pub const DEFAULT_KEY: [u8; 16] = [
    0x40, 0x41, 0x42, 0x43, 0x44, 0x45, 0x46, 0x47, 0x48, 0x49, 0x4A, 0x4B, 0x4C, 0x4D, 0x4E, 0x4F,
];

/// Security domain AID (ISD)
pub const SECURITY_DOMAIN_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x01, 0x51, 0x00, 0x00, 0x00];

/// Card manager AID used when locking a card
pub const CARD_MANAGER_AID: &[u8] = &[0xA0, 0x00, 0x00, 0x00, 0x18, 0x43, 0x4D, 0x00];
