//! Static card keys and EMV CPS v1.1 key diversification

use std::fmt;

use cipher::Key;
#[cfg(feature = "zeroize")]
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::DEFAULT_KEY;
use crate::crypto::{Scp02, encrypt_ecb, odd_parity};
use crate::{Error, Result};

/// Length of a double-length 3DES key
pub const KEY_LEN: usize = 16;
/// Length of the key diversification data returned by INITIALIZE UPDATE
pub const KEYDATA_LEN: usize = 10;

/// Raw double-length key bytes
pub type KeyBytes = [u8; KEY_LEN];
/// Key diversification data
pub type KeyData = [u8; KEYDATA_LEN];

/// Position of a key inside a key set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyPart {
    /// Encryption key
    Enc = 1,
    /// MAC key
    Mac = 2,
    /// Data encryption key
    Dek = 3,
}

impl KeyPart {
    /// All parts in key set order
    pub const ALL: [Self; 3] = [Self::Enc, Self::Mac, Self::Dek];
}

/// ENC, MAC and DEK keys of one key version
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "zeroize", derive(Zeroize, ZeroizeOnDrop))]
pub struct KeySet {
    enc: KeyBytes,
    mac: KeyBytes,
    dek: KeyBytes,
}

impl KeySet {
    /// Create a key set from three keys
    pub const fn new(enc: KeyBytes, mac: KeyBytes, dek: KeyBytes) -> Self {
        Self { enc, mac, dek }
    }

    /// Use one key for ENC, MAC and DEK
    pub const fn from_single_key(key: KeyBytes) -> Self {
        Self::new(key, key, key)
    }

    /// Create a key set from slices, each exactly 16 bytes
    pub fn from_slices(enc: &[u8], mac: &[u8], dek: &[u8]) -> Result<Self> {
        Ok(Self::new(key_bytes(enc)?, key_bytes(mac)?, key_bytes(dek)?))
    }

    /// Derive the three card keys from a master key
    pub fn diversified(master: &[u8], keydata: &[u8]) -> Result<Self> {
        Ok(Self::new(
            diversify(master, keydata, KeyPart::Enc)?,
            diversify(master, keydata, KeyPart::Mac)?,
            diversify(master, keydata, KeyPart::Dek)?,
        ))
    }

    /// Copy of this key set with odd parity forced on every byte
    pub fn with_odd_parity(&self) -> Self {
        Self::new(
            self.enc.map(odd_parity),
            self.mac.map(odd_parity),
            self.dek.map(odd_parity),
        )
    }

    /// Encryption key
    pub fn enc(&self) -> &Key<Scp02> {
        Key::<Scp02>::from_slice(&self.enc)
    }

    /// MAC key
    pub fn mac(&self) -> &Key<Scp02> {
        Key::<Scp02>::from_slice(&self.mac)
    }

    /// Data encryption key
    pub fn dek(&self) -> &Key<Scp02> {
        Key::<Scp02>::from_slice(&self.dek)
    }

    /// Key at the given position
    pub fn get(&self, part: KeyPart) -> &Key<Scp02> {
        match part {
            KeyPart::Enc => self.enc(),
            KeyPart::Mac => self.mac(),
            KeyPart::Dek => self.dek(),
        }
    }
}

impl Default for KeySet {
    fn default() -> Self {
        Self::from_single_key(DEFAULT_KEY)
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySet").finish_non_exhaustive()
    }
}

/// Source of the static keys used to open a secure channel
#[derive(Clone)]
pub enum StaticKeys {
    /// Master key, diversified per card
    Master {
        /// 16 byte master key
        key: KeyBytes,
        /// Diversification data, defaults to the data returned by INITIALIZE UPDATE
        keydata: Option<KeyData>,
    },
    /// Already derived card keys
    Keys(KeySet),
}

impl StaticKeys {
    /// Master key diversified with the card's own key data
    pub const fn master(key: KeyBytes) -> Self {
        Self::Master { key, keydata: None }
    }

    /// Resolve the card's static keys, using `card_keydata` when no keydata was given
    ///
    /// The returned keys carry odd parity.
    pub fn resolve(&self, card_keydata: &KeyData) -> Result<KeySet> {
        match self {
            Self::Master { key, keydata } => {
                KeySet::diversified(key, keydata.as_ref().unwrap_or(card_keydata))
            }
            Self::Keys(keys) => Ok(keys.with_odd_parity()),
        }
    }
}

impl Default for StaticKeys {
    fn default() -> Self {
        Self::Keys(KeySet::default())
    }
}

impl From<KeySet> for StaticKeys {
    fn from(keys: KeySet) -> Self {
        Self::Keys(keys)
    }
}

impl fmt::Debug for StaticKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master { keydata, .. } => f
                .debug_struct("Master")
                .field("keydata", &keydata.map(hex::encode_upper))
                .finish_non_exhaustive(),
            Self::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
        }
    }
}

#[cfg(feature = "zeroize")]
impl Drop for StaticKeys {
    fn drop(&mut self) {
        if let Self::Master { key, .. } = self {
            key.zeroize();
        }
    }
}

/// Diversify a master key for one key part (EMV CPS v1.1)
///
/// The block `kd[4..10] F0 part kd[4..10] 0F part` is encrypted with 3DES-ECB under the
/// master key and odd parity is forced on the result.
pub fn diversify(master: &[u8], keydata: &[u8], part: KeyPart) -> Result<KeyBytes> {
    let master = key_bytes(master)?;
    if keydata.len() != KEYDATA_LEN {
        return Err(Error::CryptoPrecondition("keydata must be 10 bytes"));
    }

    let part = part as u8;
    let mut block = [0u8; KEY_LEN];
    block[0..6].copy_from_slice(&keydata[4..10]);
    block[6] = 0xF0;
    block[7] = part;
    block[8..14].copy_from_slice(&keydata[4..10]);
    block[14] = 0x0F;
    block[15] = part;

    let encrypted = encrypt_ecb(Key::<Scp02>::from_slice(&master), &block)?;
    let mut key = key_bytes(&encrypted)?;
    key.iter_mut().for_each(|b| *b = odd_parity(*b));
    Ok(key)
}

/// Build diversification data from the card's IIN and CIN
///
/// The result is `00000000 || iin[-2..] || cin[-4..]`.
pub fn keydata_from_iin_cin(iin: &[u8], cin: &[u8]) -> Result<KeyData> {
    if iin.len() < 2 || cin.len() < 4 {
        return Err(Error::CryptoPrecondition(
            "IIN needs at least 2 bytes and CIN at least 4",
        ));
    }

    let mut keydata = [0u8; KEYDATA_LEN];
    keydata[4..6].copy_from_slice(&iin[iin.len() - 2..]);
    keydata[6..10].copy_from_slice(&cin[cin.len() - 4..]);
    Ok(keydata)
}

fn key_bytes(key: &[u8]) -> Result<KeyBytes> {
    key.try_into()
        .map_err(|_| Error::CryptoPrecondition("key must be 16 bytes"))
}
