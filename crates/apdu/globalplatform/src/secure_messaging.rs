//! SCP02 command wrapping
//!
//! When MAC is enabled the MAC is computed over the plain command with the secure messaging
//! bit set and `Lc` already counting the MAC:
//!
//! ```text
//! CLA|04  INS  P1  P2  Lc+8  data  80 00 ..
//! ```
//!
//! Encryption then replaces the data with its padded 3DES-CBC ciphertext. The MAC follows
//! the (possibly encrypted) data and the original `Le`, if any, is kept.

use gpcard_apdu_core::Command;

use crate::constants::{MAC_LEN, cla};
use crate::crypto::encrypt_cbc;
use crate::session::{SecurityLevel, Session};
use crate::{Error, Result};

/// Wrap one command piece for transmission inside `session`
///
/// With neither MAC nor encryption the command is returned unchanged.
pub fn wrap_command(session: &mut Session, command: &Command, level: SecurityLevel) -> Result<Command> {
    if !level.is_secure() {
        return Ok(command.clone());
    }

    let data = command.data();
    let cla = command.cla | cla::SECURE_MESSAGING;

    let mac = if level.mac {
        let lc = u8::try_from(data.len() + MAC_LEN)
            .map_err(|_| Error::SessionState("command data too long for secure messaging"))?;

        let mut mac_input = Vec::with_capacity(5 + data.len());
        mac_input.extend_from_slice(&[cla, command.ins, command.p1, command.p2, lc]);
        mac_input.extend_from_slice(data);
        Some(session.compute_mac(&mac_input))
    } else {
        None
    };

    let mut body = if level.encryption {
        encrypt_cbc(session.keys().enc(), data)
    } else {
        data.to_vec()
    };
    if let Some(mac) = mac {
        body.extend_from_slice(&mac);
    }

    if body.len() > u8::MAX as usize {
        return Err(Error::SessionState(
            "command data too long for secure messaging",
        ));
    }

    Ok(Command::new(cla, command.ins, command.p1, command.p2)
        .with_data(body)
        .with_optional_le(command.le))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::initialize_update::InitializeUpdateResponse;
    use crate::crypto::{Scp02Mac, mac_full_3des, next_icv};
    use crate::keys::KeySet;
    use hex_literal::hex;

    /// Session for the card answering INITIALIZE UPDATE with key version 0x20
    fn card_session() -> Session {
        let response = InitializeUpdateResponse::from_payload(&hex!(
            "000002650183039536622002000de9c62ba1c4c8e55fcb91b6654ce4"
        ))
        .unwrap();
        Session::new(&KeySet::default(), &response, hex!("f0467f908e5ca23f")).unwrap()
    }

    fn external_authenticate(session: &mut Session, level: SecurityLevel) -> Vec<u8> {
        let command = Command::new_with_data(0x80, 0x82, level.p1(), 0x00, hex!("3ce060483aace927").to_vec());
        wrap_command(session, &command, SecurityLevel::MAC)
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    fn get_status() -> Command {
        Command::new_with_data_and_le(0x80, 0xF2, 0x80, 0x00, hex!("4F00").to_vec(), 256)
    }

    fn get_key_info() -> Command {
        Command::new_with_le(0x80, 0xCA, 0x00, 0xE0, 256)
    }

    #[test]
    fn test_wrap_with_known_mac_key() {
        let keys = KeySet::from_single_key(hex!("2983ba77d709c2daa1e6000abccac951"));
        let mut session = Session::with_session_keys(keys);

        let command = Command::new_with_data(0x80, 0x82, 0x01, 0x00, hex!("1d4de92eaf7a2c9f").to_vec());
        let wrapped = wrap_command(&mut session, &command, SecurityLevel::MAC).unwrap();
        assert_eq!(
            wrapped.to_bytes().as_ref(),
            hex!("84820100101d4de92eaf7a2c9f8f9b0df681c1d3ec")
        );

        let command = Command::new_with_data_and_le(0x80, 0xF2, 0x80, 0x02, hex!("4F00").to_vec(), 256);
        let wrapped = wrap_command(&mut session, &command, SecurityLevel::MAC).unwrap();
        assert_eq!(wrapped.to_bytes().as_ref(), hex!("84f280020a4f0030f149209e17b39700"));
    }

    #[test]
    fn test_mac_only_session() {
        let mut session = card_session();
        assert_eq!(
            external_authenticate(&mut session, SecurityLevel::MAC),
            hex!("84820100103ce060483aace927a3cda954b0e88839")
        );

        let wrapped = wrap_command(&mut session, &get_status(), SecurityLevel::MAC).unwrap();
        assert_eq!(wrapped.to_bytes().as_ref(), hex!("84f280000a4f009fc6676ae41508e200"));

        let wrapped = wrap_command(&mut session, &get_key_info(), SecurityLevel::MAC).unwrap();
        assert_eq!(wrapped.to_bytes().as_ref(), hex!("84ca00e0085e19d1521015b54000"));
    }

    #[test]
    fn test_mac_chains_across_commands() {
        let mut session = card_session();
        external_authenticate(&mut session, SecurityLevel::MAC);

        let first = wrap_command(&mut session, &get_key_info(), SecurityLevel::MAC).unwrap();
        let second = wrap_command(&mut session, &get_key_info(), SecurityLevel::MAC).unwrap();

        assert_eq!(first.to_bytes().as_ref(), hex!("84ca00e008da0ef9868b70bb2300"));
        assert_eq!(second.to_bytes().as_ref(), hex!("84ca00e00836787ef329b8574b00"));
    }

    #[test]
    fn test_next_mac_uses_encrypted_previous_mac() {
        let mut session = card_session();
        external_authenticate(&mut session, SecurityLevel::MAC);
        let mac_key = *session.keys().mac();

        let first = wrap_command(&mut session, &get_key_info(), SecurityLevel::MAC).unwrap();
        let second = wrap_command(&mut session, &get_key_info(), SecurityLevel::MAC).unwrap();
        let first_mac: Scp02Mac = first.data().try_into().unwrap();
        let second_mac: Scp02Mac = second.data().try_into().unwrap();

        let header = hex!("84ca00e008");
        let icv = next_icv(&mac_key, &first_mac);
        assert_eq!(mac_full_3des(&mac_key, &icv, &header), second_mac);
        assert_ne!(mac_full_3des(&mac_key, &first_mac, &header), second_mac);
        assert_eq!(session.icv(), &next_icv(&mac_key, &second_mac));
    }

    #[test]
    fn test_mac_and_encryption() {
        let mut session = card_session();
        assert_eq!(
            external_authenticate(&mut session, SecurityLevel::MAC_ENC),
            hex!("84820300103ce060483aace9273e21b1f6c415651b")
        );

        let wrapped = wrap_command(&mut session, &get_status(), SecurityLevel::MAC_ENC).unwrap();
        assert_eq!(
            wrapped.to_bytes().as_ref(),
            hex!("84f280001073a3e36bc7a2a6f5f6c6a5a2131df78c00")
        );

        // Empty data still yields one encrypted padding block
        let wrapped = wrap_command(&mut session, &get_key_info(), SecurityLevel::MAC_ENC).unwrap();
        assert_eq!(
            wrapped.to_bytes().as_ref(),
            hex!("84ca00e01073b5873faef426af987145a35db17e7200")
        );
    }

    #[test]
    fn test_encryption_only() {
        let mut session = card_session();
        assert_eq!(
            external_authenticate(&mut session, SecurityLevel::ENC),
            hex!("84820200103ce060483aace927fc3a4d893bfd3760")
        );

        let wrapped = wrap_command(&mut session, &get_status(), SecurityLevel::ENC).unwrap();
        assert_eq!(wrapped.to_bytes().as_ref(), hex!("84f280000873a3e36bc7a2a6f500"));
    }

    #[test]
    fn test_no_secure_messaging() {
        let mut session = card_session();
        assert_eq!(
            external_authenticate(&mut session, SecurityLevel::NONE),
            hex!("84820000103ce060483aace927be1a4733452dec7a")
        );

        let icv = *session.icv();
        let wrapped = wrap_command(&mut session, &get_status(), SecurityLevel::NONE).unwrap();
        assert_eq!(wrapped, get_status());
        assert_eq!(session.icv(), &icv);
    }

    #[test]
    fn test_oversized_data_is_rejected() {
        let mut session = card_session();
        let command = Command::new_with_data(0x80, 0xDA, 0x00, 0x00, vec![0u8; 248]);
        assert!(matches!(
            wrap_command(&mut session, &command, SecurityLevel::MAC),
            Err(Error::SessionState(_))
        ));
    }
}
