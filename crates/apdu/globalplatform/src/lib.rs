//! GlobalPlatform implementation for smart card management
//!
//! This crate provides the SCP02 secure channel of GlobalPlatform 2.1.1 together with the
//! card management commands that run over it: content loading and installation, key
//! replacement, status queries and data storage.
//!
//! The main entry point is the [`GlobalPlatform`] struct, which owns a
//! [`CardTransport`](gpcard_apdu_core::CardTransport) and routes every command through the
//! chaining and secure messaging path of its [`SecureChannel`].
//!
//! The lower layers are usable on their own:
//!
//! - [`crypto`] holds the stateless SCP02 primitives (session key derivation, cryptograms,
//!   the retail MAC and its ICV chaining)
//! - [`keys`] holds static key sets and EMV CPS v1.1 diversification
//! - [`secure_messaging`] wraps single commands for an open [`Session`]
//! - [`commands`] builds the individual command APDUs and parses their responses
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub mod application;
pub mod commands;
pub mod constants;
pub mod crypto;
pub mod keys;
pub mod secure_channel;
pub mod secure_messaging;
pub mod session;

mod error;
pub use error::{Error, Result};

#[cfg(test)]
mod test_utils;

// Re-exports
pub use application::GlobalPlatform;
pub use keys::{KeySet, StaticKeys};
pub use secure_channel::{ChannelState, SecureChannel};
pub use session::{SecurityLevel, Session};

// Export main commands
pub use commands::{
    DeleteCommand, ExternalAuthenticateCommand, GetDataCommand, GetStatusCommand,
    GetStatusResult, InitializeUpdateCommand, InitializeUpdateResponse, InstallCommand,
    KeyInfo, LoadCommand, PutKeyCommand, SelectCommand, SetStatusCommand, StoreDataCommand,
};

/// Prelude module containing commonly used types
pub mod prelude {
    pub use crate::{
        ChannelState, Error, GlobalPlatform, KeySet, Result, SecurityLevel, StaticKeys,
        constants::{CARD_MANAGER_AID, DEFAULT_KEY, SECURITY_DOMAIN_AID},
    };
    pub use gpcard_apdu_core::prelude::*;
}
