//! SCP02 secure channel state machine
//!
//! ```text
//! Closed --establish--> Establishing --EXTERNAL AUTHENTICATE 9000--> Open
//!    ^                       |                                       |
//!    +------- failure -------+                                       |
//!    +------------------- terminate / SELECT -----------------------+
//! ```
//!
//! While open, every command is split into pieces that fit the negotiated level and each
//! piece is wrapped with [`wrap_command`] before transmission.

use gpcard_apdu_core::{
    CardTransport, Command, Response, response::error::ResponseError, split_command,
};
use tracing::{Level, debug, info, warn};

use crate::commands::{
    ExternalAuthenticateCommand, InitializeUpdateCommand, InitializeUpdateResponse,
};
use crate::constants::scp;
use crate::crypto::HostChallenge;
use crate::keys::StaticKeys;
use crate::secure_messaging::wrap_command;
use crate::session::{SecurityLevel, Session};
use crate::{Error, Result};

/// Lifecycle of a secure channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, derive_more::Display)]
pub enum ChannelState {
    /// No session
    #[default]
    #[display("closed")]
    Closed,
    /// Authentication in progress
    #[display("establishing")]
    Establishing,
    /// Session keys available, secure messaging applies
    #[display("open")]
    Open,
}

/// SCP02 secure channel
#[derive(Debug, Default)]
pub struct SecureChannel {
    state: ChannelState,
    session: Option<Session>,
}

impl SecureChannel {
    /// Create a closed secure channel
    pub const fn new() -> Self {
        Self {
            state: ChannelState::Closed,
            session: None,
        }
    }

    /// Current state
    pub const fn state(&self) -> ChannelState {
        self.state
    }

    /// Whether a session is open
    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    /// Open session, if any
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Negotiated security level, [`SecurityLevel::NONE`] when closed
    pub fn security_level(&self) -> SecurityLevel {
        self.session
            .as_ref()
            .map_or(SecurityLevel::NONE, Session::security_level)
    }

    /// Largest data field per physical command under the current level
    pub fn max_data_len(&self) -> usize {
        self.security_level().max_data_len()
    }

    /// Authenticate with the card and open a session
    ///
    /// A random host challenge is generated when none is given. On any failure the
    /// channel is left closed.
    pub fn establish<T: CardTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        key_version: u8,
        level: SecurityLevel,
        keys: &StaticKeys,
        host_challenge: Option<HostChallenge>,
    ) -> Result<()> {
        if self.is_open() {
            return Err(Error::SessionState("secure channel already open"));
        }

        self.state = ChannelState::Establishing;
        self.session = None;

        match Self::authenticate(transport, key_version, level, keys, host_challenge) {
            Ok(session) => {
                info!(level = %level, key_version = session.key_version(), "Secure channel established");
                self.session = Some(session);
                self.state = ChannelState::Open;
                Ok(())
            }
            Err(e) => {
                self.terminate();
                Err(e)
            }
        }
    }

    fn authenticate<T: CardTransport + ?Sized>(
        transport: &mut T,
        key_version: u8,
        level: SecurityLevel,
        keys: &StaticKeys,
        host_challenge: Option<HostChallenge>,
    ) -> Result<Session> {
        let (command, host_challenge) = match host_challenge {
            Some(challenge) => (
                InitializeUpdateCommand::with_challenge(key_version, &challenge),
                challenge,
            ),
            None => InitializeUpdateCommand::with_random_challenge(key_version),
        };
        let response = exchange(transport, &command)?;
        if !response.is_success() {
            return Err(Error::card_status(
                "INITIALIZE UPDATE",
                command.p1,
                command.p2,
                response.status(),
            ));
        }

        let init = InitializeUpdateResponse::from_payload(response.payload())?;
        debug!(
            keydata = %hex::encode_upper(init.key_diversification_data),
            key_version = init.key_version,
            scp = init.scp_version,
            seq = %hex::encode_upper(init.sequence_counter),
            card_challenge = %hex::encode_upper(init.card_challenge),
            "INITIALIZE UPDATE"
        );
        if init.scp_version != scp::SCP02 {
            warn!(scp = init.scp_version, "Card reports SCP other than SCP02");
        }

        let static_keys = keys.resolve(&init.key_diversification_data)?;
        let mut session = Session::new(&static_keys, &init, host_challenge)?;

        let command =
            ExternalAuthenticateCommand::with_host_cryptogram(level, &session.host_cryptogram());
        let wrapped = wrap_command(&mut session, &command, SecurityLevel::MAC)?;
        let response = exchange(transport, &wrapped)?;
        if !response.is_success() {
            return Err(Error::card_status(
                "EXTERNAL AUTHENTICATE",
                command.p1,
                command.p2,
                response.status(),
            ));
        }

        session.set_security_level(level);
        Ok(session)
    }

    /// Drop the session and its keys
    pub fn terminate(&mut self) {
        if self.session.take().is_some() {
            debug!("Secure channel terminated");
        }
        self.state = ChannelState::Closed;
    }

    /// Send a logical command, chaining and wrapping it as needed
    ///
    /// Returns the response of the last piece sent. Transmission stops at the first piece
    /// that is not answered with 90 00.
    pub fn transmit<T: CardTransport + ?Sized>(
        &mut self,
        transport: &mut T,
        command: &Command,
    ) -> Result<Response> {
        command.check_length()?;

        let pieces = split_command(command, self.max_data_len());
        if pieces.len() > 1 {
            debug!(pieces = pieces.len(), ins = command.ins, "Chaining command");
        }

        let mut last = None;
        for piece in pieces {
            let piece = match (&mut self.session, self.state) {
                (Some(session), ChannelState::Open) => {
                    let level = session.security_level();
                    wrap_command(session, &piece, level)?
                }
                _ => piece,
            };

            let response = exchange(transport, &piece)?;
            let rejected = !response.is_success();
            last = Some(response);
            if rejected {
                break;
            }
        }

        last.ok_or(Error::Response(ResponseError::Incomplete))
    }
}

/// Exchange one physical command
pub(crate) fn exchange<T: CardTransport + ?Sized>(
    transport: &mut T,
    command: &Command,
) -> Result<Response> {
    let raw = transport.transmit_raw(&command.to_bytes())?;
    let response = Response::from_bytes(&raw)?;
    let sw = response.status();
    let level = sw.tracing_level();
    if level == Level::DEBUG {
        debug!(ins = command.ins, %sw, "Command exchanged");
    } else if level == Level::INFO {
        info!(ins = command.ins, %sw, "Command completed with warning");
    } else {
        warn!(ins = command.ins, %sw, reason = sw.description(), "Command failed");
    }
    Ok(response)
}
