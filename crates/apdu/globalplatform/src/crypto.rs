//! Cryptographic operations for GlobalPlatform SCP02 protocol
//!
//! Every primitive here is stateless: keys and chaining values are passed in per call and
//! new buffers are returned. Keys are double-length (2-key) triple-DES keys of 16 bytes,
//! expanded to 24 bytes by repeating the first 8 bytes.

use cbc_mac::{CbcMac, Mac};
use cipher::{
    BlockEncrypt, BlockEncryptMut, IvSizeUser, Key, KeyInit, KeyIvInit, KeySizeUser,
    block_padding::{Iso7816, RawPadding},
    consts::{U8, U16},
    generic_array::GenericArray,
};
use des::{Des, TdesEde3};

use crate::{Error, Result};

/// Key derivation constant prefixed to the sequence counter
pub type Purpose = [u8; 2];
/// Card sequence counter from INITIALIZE UPDATE
pub type SequenceCounter = [u8; 2];
/// Card challenge from INITIALIZE UPDATE
pub type CardChallenge = [u8; 6];
/// Host challenge sent with INITIALIZE UPDATE
pub type HostChallenge = [u8; 8];
/// Card or host authentication cryptogram
pub type Cryptogram = [u8; 8];
/// Command MAC (C-MAC) appended to a wrapped command
pub type Scp02Mac = [u8; 8];
/// MAC chaining value carried between commands of one session
pub type Icv = [u8; 8];

/// Derivation purpose for encryption key
pub const DERIVATION_ENC: Purpose = [0x01, 0x82];
/// Derivation purpose for MAC key
pub const DERIVATION_MAC: Purpose = [0x01, 0x01];
/// Derivation purpose for data encryption (key wrapping) key
pub const DERIVATION_DEK: Purpose = [0x01, 0x81];

/// DES block length
pub const BLOCK_LEN: usize = 8;

/// Placeholder struct for defining SCP02 cryptographic parameters
#[allow(missing_debug_implementations)]
pub struct Scp02;

impl KeySizeUser for Scp02 {
    type KeySize = U16;
}

impl IvSizeUser for Scp02 {
    type IvSize = U8;
}

/// Force odd parity on a single key byte
pub const fn odd_parity(byte: u8) -> u8 {
    if byte.count_ones() % 2 == 0 {
        byte ^ 0x01
    } else {
        byte
    }
}

/// Return a copy of `buf` with odd parity forced on every byte
pub fn set_odd_parity(buf: &[u8]) -> Vec<u8> {
    buf.iter().copied().map(odd_parity).collect()
}

/// Return a copy of a 16 byte key with odd parity forced on every byte
pub fn with_odd_parity(key: &Key<Scp02>) -> Key<Scp02> {
    let mut result = *key;
    result.iter_mut().for_each(|b| *b = odd_parity(*b));
    result
}

/// Derive a session key from a static card key
///
/// The derivation block is `purpose || seq || 00 * 12`, encrypted with 3DES-CBC under the
/// static key and a zero IV. The result carries odd parity.
///
/// # Arguments
///
/// * `card_key` - The static card key (16 bytes)
/// * `seq` - The sequence counter from INITIALIZE UPDATE
/// * `purpose` - One of [`DERIVATION_ENC`], [`DERIVATION_MAC`] or [`DERIVATION_DEK`]
///
/// # Returns
///
/// The session key (16 bytes)
pub fn derive_key(card_key: &Key<Scp02>, seq: &SequenceCounter, purpose: &Purpose) -> Key<Scp02> {
    let mut blocks = [GenericArray::default(), GenericArray::default()];
    blocks[0][0..2].copy_from_slice(purpose);
    blocks[0][2..4].copy_from_slice(seq);

    let mut encryptor =
        cbc::Encryptor::<TdesEde3>::new(&resize_key(card_key), &Default::default());
    encryptor.encrypt_blocks_mut(&mut blocks);

    let mut result = Key::<Scp02>::default();
    result[0..8].copy_from_slice(blocks[0].as_slice());
    result[8..16].copy_from_slice(blocks[1].as_slice());

    with_odd_parity(&result)
}

/// Calculate a card or host cryptogram using 3DES in CBC mode
///
/// Card cryptogram input: host challenge, sequence counter, card challenge.
/// Host cryptogram input: sequence counter, card challenge, host challenge.
/// Both are padded with `80 00 .. 00` to 24 bytes and the last ciphertext block is returned.
///
/// # Arguments
///
/// * `enc_key` - The session encryption key
/// * `for_host` - Whether to calculate the host cryptogram instead of the card cryptogram
pub fn calculate_cryptogram(
    enc_key: &Key<Scp02>,
    sequence_counter: &SequenceCounter,
    card_challenge: &CardChallenge,
    host_challenge: &HostChallenge,
    for_host: bool,
) -> Cryptogram {
    let mut blocks = [GenericArray::default(); 3];

    if for_host {
        blocks[0][0..2].copy_from_slice(sequence_counter);
        blocks[0][2..8].copy_from_slice(card_challenge);
        blocks[1][0..8].copy_from_slice(host_challenge);
    } else {
        blocks[0][0..8].copy_from_slice(host_challenge);
        blocks[1][0..2].copy_from_slice(sequence_counter);
        blocks[1][2..8].copy_from_slice(card_challenge);
    }
    Iso7816::raw_pad(&mut blocks[2], 0);

    let mut cipher = cbc::Encryptor::<TdesEde3>::new(&resize_key(enc_key), &Default::default());
    cipher.encrypt_blocks_mut(&mut blocks);
    blocks[blocks.len() - 1].into()
}

/// Calculate a full 3DES MAC for SCP02
///
/// The data is padded with `80 00 .. 00`. All blocks except the last are chained with
/// single DES under the first half of the key, and the last block is encrypted with 3DES.
///
/// # Arguments
///
/// * `key` - The session MAC key (16 bytes)
/// * `iv` - The current chaining value (8 bytes)
/// * `data` - The data to MAC
///
/// # Returns
///
/// The MAC value (8 bytes)
pub fn mac_full_3des(key: &Key<Scp02>, iv: &Icv, data: &[u8]) -> Scp02Mac {
    let full_len = data.len() - data.len() % BLOCK_LEN;
    let mut head: Vec<GenericArray<u8, U8>> = data[..full_len]
        .chunks_exact(BLOCK_LEN)
        .map(GenericArray::clone_from_slice)
        .collect();

    let mut last = GenericArray::<u8, U8>::default();
    last[..data.len() - full_len].copy_from_slice(&data[full_len..]);
    Iso7816::raw_pad(&mut last, data.len() - full_len);

    let iv = GenericArray::from(*iv);
    cbc::Encryptor::<Des>::new(GenericArray::from_slice(&key[..8]), &iv)
        .encrypt_blocks_mut(&mut head);
    let chain = head.last().copied().unwrap_or(iv);

    cbc::Encryptor::<TdesEde3>::new(&resize_key(key), &chain).encrypt_block_mut(&mut last);
    last.into()
}

/// Next MAC chaining value: single DES of the last MAC under the first half of the MAC key
pub fn next_icv(mac_key: &Key<Scp02>, mac: &Scp02Mac) -> Icv {
    let key = GenericArray::from_slice(&mac_key[..8]);
    let mut cbc_mac = <CbcMac<Des> as Mac>::new(key);
    cbc_mac.update(mac);
    cbc_mac.finalize().into_bytes().into()
}

/// Encrypt command data with 3DES-CBC and a zero IV
///
/// Data is always padded with `80 00 .. 00`, so empty data yields one block.
pub fn encrypt_cbc(key: &Key<Scp02>, data: &[u8]) -> Vec<u8> {
    cbc::Encryptor::<TdesEde3>::new(&resize_key(key), &Default::default())
        .encrypt_padded_vec_mut::<Iso7816>(data)
}

/// Encrypt block-aligned data with 3DES-ECB
pub fn encrypt_ecb(key: &Key<Scp02>, data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % BLOCK_LEN != 0 {
        return Err(Error::CryptoPrecondition(
            "data length must be a multiple of 8",
        ));
    }

    let cipher = TdesEde3::new(&resize_key(key));
    let mut out = data.to_vec();
    for block in out.chunks_exact_mut(BLOCK_LEN) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    Ok(out)
}

/// Key check value: first 3 bytes of the key's encryption of a zero block
pub fn key_check_value(key: &Key<Scp02>) -> [u8; 3] {
    let mut block = GenericArray::default();
    TdesEde3::new(&resize_key(key)).encrypt_block(&mut block);
    [block[0], block[1], block[2]]
}

/// Resize the SCP02 16-byte key to 24 bytes for 3DES
///
/// This copies the first 8 bytes to the end of the key.
pub fn resize_key(key: &Key<Scp02>) -> Key<TdesEde3> {
    let mut result = Key::<TdesEde3>::default();
    result[..16].copy_from_slice(key);
    result[16..24].copy_from_slice(&key[..8]);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn key(bytes: [u8; 16]) -> Key<Scp02> {
        Key::<Scp02>::from(bytes)
    }

    #[test]
    fn test_odd_parity() {
        assert_eq!(odd_parity(0x40), 0x40);
        assert_eq!(odd_parity(0x41), 0x40);
        assert_eq!(odd_parity(0x00), 0x01);
        assert_eq!(odd_parity(0xFE), 0xFE);

        let input = hex!("404142434445464748494a4b4c4d4e4f");
        let output = set_odd_parity(&input);
        assert_eq!(output, hex!("404043434545464649494a4a4c4c4f4f"));
        // The input is left untouched
        assert_eq!(input, hex!("404142434445464748494a4b4c4d4e4f"));
        assert!(output.iter().all(|b| b.count_ones() % 2 == 1));
    }

    #[test]
    fn test_derive_key() {
        let card_key = key(hex!("404142434445464748494a4b4c4d4e4f"));
        let derived = derive_key(&card_key, &hex!("0065"), &DERIVATION_ENC);
        assert_eq!(derived.as_slice(), hex!("85e62aae46864319a202bf5ef891dc20"));
    }

    #[test]
    fn test_derive_session_keys() {
        let card_key = key(hex!("404142434445464748494a4b4c4d4e4f"));
        let seq = hex!("000d");

        assert_eq!(
            derive_key(&card_key, &seq, &DERIVATION_ENC).as_slice(),
            hex!("207abf8cc47394b3401970f280d6524f")
        );
        assert_eq!(
            derive_key(&card_key, &seq, &DERIVATION_MAC).as_slice(),
            hex!("07efcdea0bb0cd01a22f0de0e0e394f8")
        );
        assert_eq!(
            derive_key(&card_key, &seq, &DERIVATION_DEK).as_slice(),
            hex!("bff2832f9bb9da02ad37b5e6e040c407")
        );
    }

    #[test]
    fn test_calculate_cryptogram() {
        let enc_key = key(hex!("16b5867ff50be7239c2bf1245b83a362"));
        let host_challenge = hex!("32da078d7aac1cff");
        let sequence_counter = hex!("0072");
        let card_challenge = hex!("84f64a7d6465");

        let cryptogram = calculate_cryptogram(
            &enc_key,
            &sequence_counter,
            &card_challenge,
            &host_challenge,
            false,
        );
        assert_eq!(cryptogram, hex!("05c4bb8a86014e22"));
    }

    #[test]
    fn test_card_and_host_cryptograms() {
        let senc = key(hex!("207abf8cc47394b3401970f280d6524f"));
        let seq = hex!("000d");
        let card_challenge = hex!("e9c62ba1c4c8");
        let host_challenge = hex!("f0467f908e5ca23f");

        let card = calculate_cryptogram(&senc, &seq, &card_challenge, &host_challenge, false);
        assert_eq!(card, hex!("e55fcb91b6654ce4"));

        let host = calculate_cryptogram(&senc, &seq, &card_challenge, &host_challenge, true);
        assert_eq!(host, hex!("3ce060483aace927"));
    }

    #[test]
    fn test_mac_full_3des() {
        let mac_key = key(hex!("5b02e75ad63190aece0622936f11abab"));
        let data = hex!("8482010010810b098a8fbb88da");
        let mac = mac_full_3des(&mac_key, &[0u8; 8], &data);
        assert_eq!(mac, hex!("5271d7174a5a166a"));
    }

    #[test]
    fn test_mac_full_3des_padding_boundaries() {
        let mac_key = key(hex!("5b02e75ad63190aece0622936f11abab"));
        // Padding only: a single 3DES block
        assert_eq!(mac_full_3des(&mac_key, &[0u8; 8], &[]), hex!("a1925553479085a6"));
        // Aligned input gains a whole padding block
        assert_eq!(
            mac_full_3des(&mac_key, &[0u8; 8], &hex!("0102030405060708")),
            hex!("e8aa488140dc5982")
        );
        assert_eq!(
            mac_full_3des(
                &mac_key,
                &hex!("1122334455667788"),
                &hex!("000102030405060708090a0b0c0d0e0f")
            ),
            hex!("a3db2b5f1de69311")
        );
    }

    #[test]
    fn test_next_icv() {
        let mac_key = key(hex!("07efcdea0bb0cd01a22f0de0e0e394f8"));
        let icv = next_icv(&mac_key, &hex!("a3cda954b0e88839"));
        assert_eq!(icv, hex!("40b577bf4e5d3215"));
    }

    #[test]
    fn test_encrypt_cbc_pads() {
        let senc = key(hex!("207abf8cc47394b3401970f280d6524f"));
        assert_eq!(encrypt_cbc(&senc, &hex!("4f00")), hex!("73a3e36bc7a2a6f5"));
        assert_eq!(encrypt_cbc(&senc, &[]).len(), 8);
        assert_eq!(encrypt_cbc(&senc, &[0u8; 8]).len(), 16);
    }

    #[test]
    fn test_encrypt_ecb() {
        let dek = key(hex!("bff2832f9bb9da02ad37b5e6e040c407"));
        assert_eq!(
            encrypt_ecb(&dek, &hex!("0102030405060708")).unwrap(),
            hex!("741289477af97950")
        );
        assert!(matches!(
            encrypt_ecb(&dek, &[0u8; 7]),
            Err(Error::CryptoPrecondition(_))
        ));
    }

    #[test]
    fn test_key_check_value() {
        let default_key = key(hex!("404142434445464748494a4b4c4d4e4f"));
        assert_eq!(key_check_value(&default_key), hex!("8baf47"));
    }

    #[test]
    fn test_resize_key() {
        let resized = resize_key(&key(hex!("404142434445464748494a4b4c4d4e4f")));
        assert_eq!(
            resized.as_slice(),
            hex!("404142434445464748494a4b4c4d4e4f4041424344454647")
        );
    }
}
