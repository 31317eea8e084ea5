//! GlobalPlatform application implementation
//!
//! This module provides the main card management interface. It owns the transport and the
//! secure channel, and every command it sends goes through the channel's chaining and
//! secure messaging path.

use bytes::Bytes;
use gpcard_apdu_core::response::status::common::{
    MORE_RECORDS, REFERENCED_DATA_NOT_FOUND, SUCCESS,
};
use gpcard_apdu_core::{CardTransport, Command, Response, StatusWord};
use tracing::{debug, info, warn};

use crate::commands::get_status::{
    parse_applications, parse_issuer_security_domain, parse_load_files,
};
use crate::commands::{
    DeleteCommand, GetDataCommand, GetStatusCommand, GetStatusResult, InitializeUpdateCommand,
    InstallCommand, KeyInfo, LoadCommand, PutKeyCommand, SelectCommand, SetStatusCommand,
    StoreDataCommand,
};
use crate::constants::{CARD_MANAGER_AID, SECURITY_DOMAIN_AID, get_data};
use crate::crypto::{HostChallenge, encrypt_ecb};
use crate::keys::{KeyData, KeySet, StaticKeys, keydata_from_iin_cin};
use crate::secure_channel::{ChannelState, SecureChannel};
use crate::session::{SecurityLevel, Session};
use crate::{Error, Result};


/// GlobalPlatform card management application
#[derive(Debug)]
pub struct GlobalPlatform<T: CardTransport> {
    /// Card transport
    transport: T,
    /// SCP02 secure channel
    channel: SecureChannel,
    /// Key version learned from INITIALIZE UPDATE or set by PUT KEY
    current_key_version: Option<u8>,
    /// Upper-case hex AID of the last successful SELECT
    current_selected: Option<String>,
    /// Upper bound on INITIALIZE UPDATE rounds when locking a card
    lock_limit: Option<usize>,
}

impl<T: CardTransport> GlobalPlatform<T> {
    /// Create a new GlobalPlatform instance
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            channel: SecureChannel::new(),
            current_key_version: None,
            current_selected: None,
            lock_limit: None,
        }
    }

    /// Bound the number of INITIALIZE UPDATE rounds [`Self::lock_card`] may send
    pub const fn with_lock_limit(mut self, limit: usize) -> Self {
        self.lock_limit = Some(limit);
        self
    }

    /// Underlying transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub const fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the application and return the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Key version of the current keys, if known
    pub const fn current_key_version(&self) -> Option<u8> {
        self.current_key_version
    }

    /// AID of the currently selected application as upper-case hex
    pub fn current_selected(&self) -> Option<&str> {
        self.current_selected.as_deref()
    }

    /// State of the secure channel
    pub const fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Negotiated security level, [`SecurityLevel::NONE`] when no session is open
    pub fn security_level(&self) -> SecurityLevel {
        self.channel.security_level()
    }

    /// Largest data field one command may carry under the current security level
    pub fn max_data_len(&self) -> usize {
        self.channel.max_data_len()
    }

    /// Current session, if one is open
    pub const fn session(&self) -> Option<&Session> {
        self.channel.session()
    }

    /// Select an application by AID
    ///
    /// Any open secure channel is terminated first.
    pub fn select(&mut self, aid: &[u8]) -> Result<Response> {
        debug!(aid = %hex::encode_upper(aid), "SELECT");
        self.channel.terminate();

        let command = SelectCommand::with_aid(Bytes::copy_from_slice(aid));
        let response = self.transmit_expecting(&command, "SELECT", &[SUCCESS])?;
        self.current_selected = Some(hex::encode_upper(aid));
        Ok(response)
    }

    /// Select the issuer security domain
    pub fn select_security_domain(&mut self) -> Result<Response> {
        self.select(SECURITY_DOMAIN_AID)
    }

    /// Select the card manager used when locking cards
    pub fn select_card_manager(&mut self) -> Result<Response> {
        self.select(CARD_MANAGER_AID)
    }

    /// Open an SCP02 secure channel with a random host challenge
    pub fn open_secure_channel(
        &mut self,
        key_version: u8,
        level: SecurityLevel,
        keys: &StaticKeys,
    ) -> Result<()> {
        self.open_secure_channel_with_challenge(key_version, level, keys, None)
    }

    /// Open an SCP02 secure channel, optionally with a fixed host challenge
    pub fn open_secure_channel_with_challenge(
        &mut self,
        key_version: u8,
        level: SecurityLevel,
        keys: &StaticKeys,
        host_challenge: Option<HostChallenge>,
    ) -> Result<()> {
        debug!(key_version, level = %level, keys = ?keys, "Opening secure channel");
        self.channel
            .establish(&mut self.transport, key_version, level, keys, host_challenge)?;

        if let Some(session) = self.channel.session() {
            self.current_key_version = Some(session.key_version());
        }
        Ok(())
    }

    /// Terminate the secure channel, keeping the card connection
    pub fn terminate_secure_channel(&mut self) {
        self.channel.terminate();
    }

    /// Terminate the secure channel and disconnect from the card with a reset
    pub fn close(&mut self) -> Result<()> {
        self.channel.terminate();
        self.transport.disconnect(true)?;
        Ok(())
    }

    /// Send a command through the secure channel
    ///
    /// The response of the last piece is returned whatever its status word.
    pub fn transmit(&mut self, command: &Command) -> Result<Response> {
        self.channel.transmit(&mut self.transport, command)
    }

    /// Decode a raw APDU and send it through the secure channel
    pub fn transmit_apdu(&mut self, apdu: &[u8]) -> Result<Response> {
        let command = Command::from_bytes(apdu)?;
        self.transmit(&command)
    }

    fn transmit_expecting(
        &mut self,
        command: &Command,
        name: &'static str,
        accepted: &[StatusWord],
    ) -> Result<Response> {
        let response = self.transmit(command)?;
        if accepted.contains(&response.status()) {
            Ok(response)
        } else {
            Err(Error::card_status(
                name,
                command.p1,
                command.p2,
                response.status(),
            ))
        }
    }

    /// Exhaust the card's authentication counter
    ///
    /// Selects the card manager, then repeats INITIALIZE UPDATE with an all-zero host
    /// challenge while the card keeps answering 90 00. Returns the number of rounds the card
    /// accepted. A card that locks this way can never open a secure channel again.
    pub fn lock_card(&mut self) -> Result<usize> {
        debug!("Locking card");
        self.select_card_manager()?;

        let command = InitializeUpdateCommand::with_challenge(0x00, &[0u8; 8]);
        let mut rounds = 0;
        loop {
            if self.lock_limit.is_some_and(|limit| rounds >= limit) {
                warn!(rounds, "Lock limit reached before the card locked");
                break;
            }
            if !self.transmit(&command)?.is_success() {
                break;
            }
            rounds += 1;
        }

        info!(rounds, "Card locked");
        Ok(rounds)
    }

    /// Delete the object identified by `aid`
    ///
    /// A rejection by the card is logged and otherwise ignored.
    pub fn delete(&mut self, aid: &[u8]) -> Result<()> {
        debug!(aid = %hex::encode_upper(aid), "DELETE");
        let command = DeleteCommand::with_aid(aid)?;
        let status = self.transmit(&command)?.status();
        if status.is_referenced_data_not_found() {
            warn!(aid = %hex::encode_upper(aid), "Data not found to delete, continuing");
        } else if !status.is_success() {
            warn!(aid = %hex::encode_upper(aid), sw = %status, "DELETE rejected, continuing");
        }
        Ok(())
    }

    /// Delete a key
    ///
    /// A rejection by the card is logged and otherwise ignored.
    pub fn delete_key(&mut self, key_id: u8, key_version: u8) -> Result<()> {
        debug!(key_id, key_version, "DELETE KEY");
        let status = self.transmit(&DeleteCommand::with_key(key_id, key_version))?.status();
        if status.is_referenced_data_not_found() {
            warn!(key_id, key_version, "Key not found to delete, continuing");
        } else if !status.is_success() {
            warn!(key_id, key_version, sw = %status, "DELETE KEY rejected, continuing");
        }
        Ok(())
    }

    /// Read a data object with GET DATA
    pub fn get_data(&mut self, p1p2: u16) -> Result<Bytes> {
        debug!(p1p2 = format_args!("{p1p2:04X}"), "GET DATA");
        let response =
            self.transmit_expecting(&GetDataCommand::with_tag(p1p2), "GET DATA", &[SUCCESS])?;
        Ok(response.payload().clone())
    }

    /// Read the key information template
    pub fn get_key_info(&mut self) -> Result<Vec<KeyInfo>> {
        let data = self.get_data(get_data::KEY_INFORMATION)?;
        KeyInfo::parse_template(&data)
    }

    /// Gather the issuer security domain, application and load file records
    pub fn get_status(&mut self) -> Result<GetStatusResult> {
        debug!("GET STATUS");

        let response = self.transmit_expecting(
            &GetStatusCommand::issuer_security_domain(),
            "GET STATUS",
            &[SUCCESS],
        )?;
        let isd = parse_issuer_security_domain(&response.to_bytes())?;

        let response = self.transmit_expecting(
            &GetStatusCommand::applications(),
            "GET STATUS",
            &[SUCCESS, REFERENCED_DATA_NOT_FOUND],
        )?;
        let applications = parse_applications(&response.to_bytes())?;

        let response = self.transmit_expecting(
            &GetStatusCommand::load_files(),
            "GET STATUS",
            &[SUCCESS, MORE_RECORDS],
        )?;
        if response.status().is_more_records() {
            debug!("Card holds more load file records than one response carries");
        }
        let load_files = parse_load_files(&response.to_bytes())?;

        let result = GetStatusResult {
            isd,
            applications,
            load_files,
        };
        debug!("Card status\n{result}");
        Ok(result)
    }

    /// INSTALL [for load]
    pub fn install_for_load(
        &mut self,
        load_file_aid: &[u8],
        security_domain_aid: &[u8],
    ) -> Result<()> {
        debug!(
            load_file = %hex::encode_upper(load_file_aid),
            security_domain = %hex::encode_upper(security_domain_aid),
            "INSTALL for load"
        );
        let command = InstallCommand::for_load(load_file_aid, security_domain_aid)?;
        self.transmit_expecting(&command, "INSTALL for load", &[SUCCESS])?;
        Ok(())
    }

    /// INSTALL [for install and make selectable]
    pub fn install_for_install(
        &mut self,
        load_file_aid: &[u8],
        module_aid: &[u8],
        application_aid: &[u8],
        privileges: u8,
        install_params: &[u8],
    ) -> Result<()> {
        debug!(
            load_file = %hex::encode_upper(load_file_aid),
            module = %hex::encode_upper(module_aid),
            application = %hex::encode_upper(application_aid),
            privileges = format_args!("{privileges:02X}"),
            params = %hex::encode_upper(install_params),
            "INSTALL for install"
        );
        let command = InstallCommand::for_install(
            load_file_aid,
            module_aid,
            application_aid,
            privileges,
            install_params,
        )?;
        self.transmit_expecting(&command, "INSTALL for install", &[SUCCESS])?;
        Ok(())
    }

    /// Load an executable load file image in blocks sized for the current session
    pub fn load(&mut self, image: &[u8]) -> Result<()> {
        let blocks = LoadCommand::blocks(image, self.max_data_len())?;
        debug!(len = image.len(), blocks = blocks.len(), "LOAD");

        for block in &blocks {
            self.transmit_expecting(block, "LOAD", &[SUCCESS])?;
        }
        Ok(())
    }

    /// PUT KEY with keys diversified from `master_key` and `keydata`
    pub fn put_key_from_master(
        &mut self,
        current_version: u8,
        new_version: u8,
        master_key: &[u8],
        keydata: &[u8],
    ) -> Result<()> {
        debug!(
            current_version,
            new_version,
            keydata = %hex::encode_upper(keydata),
            "PUT KEY from master key"
        );
        let keys = KeySet::diversified(master_key, keydata)?;
        self.put_key_set(current_version, new_version, &keys)
    }

    /// PUT KEY with keys diversified from `master_key`, keydata built from IIN and CIN
    pub fn put_key_from_iin_cin(
        &mut self,
        current_version: u8,
        new_version: u8,
        master_key: &[u8],
        iin: &[u8],
        cin: &[u8],
    ) -> Result<()> {
        let keydata: KeyData = keydata_from_iin_cin(iin, cin)?;
        self.put_key_from_master(current_version, new_version, master_key, &keydata)
    }

    /// PUT KEY with explicit ENC, MAC and DEK keys
    ///
    /// Odd parity is applied to each key before it is sent.
    pub fn put_key(
        &mut self,
        current_version: u8,
        new_version: u8,
        enc: &[u8],
        mac: &[u8],
        dek: &[u8],
    ) -> Result<()> {
        debug!(current_version, new_version, "PUT KEY");
        let keys = KeySet::from_slices(enc, mac, dek)?.with_odd_parity();
        self.put_key_set(current_version, new_version, &keys)
    }

    fn put_key_set(&mut self, current_version: u8, new_version: u8, keys: &KeySet) -> Result<()> {
        let session = self
            .channel
            .session()
            .ok_or(Error::SessionState("PUT KEY requires an open secure channel"))?;
        let command =
            PutKeyCommand::with_keys(current_version, new_version, keys, session.keys().dek())?;

        self.transmit_expecting(&command, "PUT KEY", &[SUCCESS])?;
        self.current_key_version = Some(new_version);
        Ok(())
    }

    /// SET STATUS of the object identified by `aid`
    pub fn set_status(&mut self, status_type: u8, state_control: u8, aid: &[u8]) -> Result<()> {
        debug!(
            status_type = format_args!("{status_type:02X}"),
            state_control = format_args!("{state_control:02X}"),
            aid = %hex::encode_upper(aid),
            "SET STATUS"
        );
        let command =
            SetStatusCommand::new(status_type, state_control, Bytes::copy_from_slice(aid));
        self.transmit_expecting(&command, "SET STATUS", &[SUCCESS])?;
        Ok(())
    }

    /// STORE DATA, chained when longer than one command allows
    pub fn store_data(&mut self, p1p2: u16, data: &[u8]) -> Result<()> {
        debug!(
            p1p2 = format_args!("{p1p2:04X}"),
            len = data.len(),
            "STORE DATA"
        );
        let command = StoreDataCommand::new(p1p2, Bytes::copy_from_slice(data));
        self.transmit_expecting(&command, "STORE DATA", &[SUCCESS])?;
        Ok(())
    }

    /// Encrypt `data` with 3DES-ECB under the session DEK
    ///
    /// `data` must be a multiple of 8 bytes long.
    pub fn wrap_data(&self, data: &[u8]) -> Result<Vec<u8>> {
        let session = self
            .channel
            .session()
            .ok_or(Error::SessionState("no secure channel open"))?;
        encrypt_ecb(session.keys().dek(), data)
    }
}
