//! APDU command definitions
//!
//! This module provides the command APDU type together with its encoder and decoder for the
//! seven ISO/IEC 7816-4 length cases:
//!
//! ```text
//! case 1:  |CLA|INS|P1 |P2 |                                 len = 4
//! case 2s: |CLA|INS|P1 |P2 |LE |                             len = 5
//! case 3s: |CLA|INS|P1 |P2 |LC |...BODY...|                  len = 6..260
//! case 4s: |CLA|INS|P1 |P2 |LC |...BODY...|LE |              len = 7..261
//! case 2e: |CLA|INS|P1 |P2 |00 |LE1|LE2|                     len = 7
//! case 3e: |CLA|INS|P1 |P2 |00 |LC1|LC2|...BODY...|          len = 8..65542
//! case 4e: |CLA|INS|P1 |P2 |00 |LC1|LC2|...BODY...|LE1|LE2|  len = 10..65544
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use derive_more::Display;

use crate::{Error, Result};

/// Expected response length (Ne), in the range `1..=65536`
///
/// An encoded Le byte of `00` decodes to 256, and an extended `0000` decodes to 65536.
pub type ExpectedLength = u32;

/// Largest expected length that fits in a short Le field
pub const MAX_SHORT_LE: ExpectedLength = 256;

/// Largest expected length that fits in an extended Le field
pub const MAX_EXTENDED_LE: ExpectedLength = 65536;

/// Largest data field that fits in a short Lc field
pub const MAX_SHORT_DATA: usize = 255;

/// Largest data field that fits in an extended Lc field
pub const MAX_EXTENDED_DATA: usize = 65535;

/// The seven command APDU length cases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ApduCase {
    /// Header only
    #[display("case 1")]
    Case1,
    /// Header and a single Le byte
    #[display("case 2s")]
    Case2Short,
    /// Header, single byte Lc and data
    #[display("case 3s")]
    Case3Short,
    /// Header, single byte Lc, data and a single Le byte
    #[display("case 4s")]
    Case4Short,
    /// Header, zero byte and a two byte Le
    #[display("case 2e")]
    Case2Extended,
    /// Header, three byte Lc and data
    #[display("case 3e")]
    Case3Extended,
    /// Header, three byte Lc, data and a two byte Le
    #[display("case 4e")]
    Case4Extended,
}

impl ApduCase {
    /// Whether the case uses extended length fields
    pub const fn is_extended(self) -> bool {
        matches!(
            self,
            Self::Case2Extended | Self::Case3Extended | Self::Case4Extended
        )
    }
}

/// Generic APDU command structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data, never empty when present
    pub data: Option<Bytes>,
    /// Expected length (optional)
    pub le: Option<ExpectedLength>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    ///
    /// An Le of 0 is stored as 256, the value its `00` encoding decodes to.
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: ExpectedLength) -> Self {
        Self::new(cla, ins, p1, p2).with_le(le)
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self::new(cla, ins, p1, p2).with_data(data)
    }

    /// Create a new command with both data and expected length
    pub fn new_with_data_and_le<T: Into<Bytes>>(
        cla: u8,
        ins: u8,
        p1: u8,
        p2: u8,
        data: T,
        le: ExpectedLength,
    ) -> Self {
        Self::new(cla, ins, p1, p2).with_data(data).with_le(le)
    }

    /// Set the data field, an empty payload clears it
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        let data = data.into();
        self.data = (!data.is_empty()).then_some(data);
        self
    }

    /// Set the expected length field, 0 meaning 256
    pub const fn with_le(mut self, le: ExpectedLength) -> Self {
        self.le = Some(normalize_le(le));
        self
    }

    /// Set or clear the expected length field
    pub const fn with_optional_le(mut self, le: Option<ExpectedLength>) -> Self {
        self.le = match le {
            Some(le) => Some(normalize_le(le)),
            None => None,
        };
        self
    }

    /// The four header bytes
    pub const fn header(&self) -> [u8; 4] {
        [self.cla, self.ins, self.p1, self.p2]
    }

    /// Command payload data, empty when absent
    pub fn data(&self) -> &[u8] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Length of the command payload
    pub fn data_len(&self) -> usize {
        self.data.as_ref().map_or(0, Bytes::len)
    }

    /// Length case used when encoding this command
    ///
    /// The short form is used unless the data or the expected length does not fit it.
    pub fn case(&self) -> ApduCase {
        let lc = self.data_len();
        let extended = lc > MAX_SHORT_DATA || self.le.is_some_and(|le| le > MAX_SHORT_LE);

        match (lc, self.le.is_some(), extended) {
            (0, false, _) => ApduCase::Case1,
            (0, true, false) => ApduCase::Case2Short,
            (0, true, true) => ApduCase::Case2Extended,
            (_, false, false) => ApduCase::Case3Short,
            (_, true, false) => ApduCase::Case4Short,
            (_, false, true) => ApduCase::Case3Extended,
            (_, true, true) => ApduCase::Case4Extended,
        }
    }

    /// Check the command fits the extended length fields
    pub fn check_length(&self) -> Result<()> {
        let lc = self.data_len();
        if lc > MAX_EXTENDED_DATA {
            return Err(Error::InvalidCommandLength(lc));
        }
        match self.le {
            Some(le) if le == 0 || le > MAX_EXTENDED_LE => {
                Err(Error::InvalidCommandLength(le as usize))
            }
            _ => Ok(()),
        }
    }

    /// Calculate length of serialized command
    pub fn command_length(&self) -> usize {
        let lc = self.data_len();
        match self.case() {
            ApduCase::Case1 => 4,
            ApduCase::Case2Short => 5,
            ApduCase::Case3Short => 5 + lc,
            ApduCase::Case4Short => 6 + lc,
            ApduCase::Case2Extended => 7,
            ApduCase::Case3Extended => 7 + lc,
            ApduCase::Case4Extended => 9 + lc,
        }
    }

    /// Convert to raw APDU bytes
    pub fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(self.command_length());
        buffer.put_slice(&self.header());

        let data = self.data();
        let le = self.le.unwrap_or_default();
        match self.case() {
            ApduCase::Case1 => {}
            ApduCase::Case2Short => buffer.put_u8(le as u8),
            ApduCase::Case3Short => {
                buffer.put_u8(data.len() as u8);
                buffer.put_slice(data);
            }
            ApduCase::Case4Short => {
                buffer.put_u8(data.len() as u8);
                buffer.put_slice(data);
                buffer.put_u8(le as u8);
            }
            ApduCase::Case2Extended => {
                buffer.put_u8(0x00);
                buffer.put_u16(le as u16);
            }
            ApduCase::Case3Extended => {
                buffer.put_u8(0x00);
                buffer.put_u16(data.len() as u16);
                buffer.put_slice(data);
            }
            ApduCase::Case4Extended => {
                buffer.put_u8(0x00);
                buffer.put_u16(data.len() as u16);
                buffer.put_slice(data);
                buffer.put_u16(le as u16);
            }
        }

        buffer.freeze()
    }

    /// Parse a command from raw bytes
    ///
    /// Any layout that matches none of the seven cases is an [`Error::MalformedApdu`].
    pub fn from_bytes(apdu: &[u8]) -> Result<Self> {
        let len = apdu.len();
        if len < 4 {
            return Err(Error::malformed(apdu));
        }

        let command = Self::new(apdu[0], apdu[1], apdu[2], apdu[3]);

        // case 1 and 2s
        match len {
            4 => return Ok(command),
            5 => return Ok(command.with_le(short_le(apdu[4]))),
            _ => {}
        }

        // case 3s and 4s
        let lc = apdu[4] as usize;
        if lc != 0 {
            let data = Bytes::copy_from_slice(apdu.get(5..5 + lc).unwrap_or_default());
            return if len == 5 + lc {
                Ok(command.with_data(data))
            } else if len == 6 + lc {
                Ok(command.with_data(data).with_le(short_le(apdu[len - 1])))
            } else {
                Err(Error::malformed(apdu))
            };
        }

        if len < 7 {
            return Err(Error::malformed(apdu));
        }

        // case 2e
        let field = u16::from_be_bytes([apdu[5], apdu[6]]);
        if len == 7 {
            return Ok(command.with_le(extended_le(field)));
        }

        // case 3e and 4e
        let lc = field as usize;
        if lc == 0 {
            return Err(Error::malformed(apdu));
        }
        let data = Bytes::copy_from_slice(apdu.get(7..7 + lc).unwrap_or_default());
        if len == 7 + lc {
            Ok(command.with_data(data))
        } else if len == 9 + lc {
            let le = u16::from_be_bytes([apdu[len - 2], apdu[len - 1]]);
            Ok(command.with_data(data).with_le(extended_le(le)))
        } else {
            Err(Error::malformed(apdu))
        }
    }
}

/// Map an Le of 0 to the 256 its short encoding stands for
const fn normalize_le(le: ExpectedLength) -> ExpectedLength {
    if le == 0 { MAX_SHORT_LE } else { le }
}

/// Decode a single byte Le field
const fn short_le(le: u8) -> ExpectedLength {
    if le == 0 { MAX_SHORT_LE } else { le as ExpectedLength }
}

/// Decode a two byte Le field
const fn extended_le(le: u16) -> ExpectedLength {
    if le == 0 {
        MAX_EXTENDED_LE
    } else {
        le as ExpectedLength
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_command_serialization() {
        let data = Bytes::from_static(&[0xA0, 0x00, 0x00, 0x01, 0x51, 0x00]);
        let cmd = Command::new_with_data_and_le(0x00, 0xA4, 0x04, 0x00, data, 256);
        let bytes = cmd.to_bytes();

        assert_eq!(cmd.case(), ApduCase::Case4Short);
        assert_eq!(bytes.as_ref(), hex!("00A4040006A0000001510000"));
    }

    #[test]
    fn test_command_length() {
        let cmd1 = Command::new(0x00, 0xB0, 0x00, 0x00);
        assert_eq!(cmd1.command_length(), 4);

        let cmd2 = Command::new_with_le(0x00, 0xB0, 0x00, 0x00, 0xFF);
        assert_eq!(cmd2.command_length(), 5);

        let data = Bytes::from_static(&[0x01, 0x02, 0x03]);
        let cmd3 = Command::new_with_data(0x00, 0xD6, 0x00, 0x00, data.clone());
        assert_eq!(cmd3.command_length(), 8);

        let cmd4 = Command::new_with_data_and_le(0x00, 0xD6, 0x00, 0x00, data, 0xFF);
        assert_eq!(cmd4.command_length(), 9);

        let cmd5 = Command::new_with_data(0x00, 0xD6, 0x00, 0x00, vec![0u8; 300]).with_le(1000);
        assert_eq!(cmd5.command_length(), 309);
        assert_eq!(cmd5.to_bytes().len(), 309);
    }

    #[test]
    fn test_empty_data_is_absent() {
        let cmd = Command::new_with_data(0x80, 0xCA, 0x00, 0xE0, Vec::new());
        assert!(cmd.data.is_none());
        assert_eq!(cmd.case(), ApduCase::Case1);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("80CA00E0"));
    }

    #[test]
    fn test_decode_short_cases() {
        let cmd = Command::from_bytes(&hex!("00A40400")).unwrap();
        assert_eq!(cmd, Command::new(0x00, 0xA4, 0x04, 0x00));

        let cmd = Command::from_bytes(&hex!("00B0000010")).unwrap();
        assert_eq!(cmd.le, Some(0x10));
        assert_eq!(cmd.case(), ApduCase::Case2Short);

        // Le=00 means 256
        let cmd = Command::from_bytes(&hex!("00B0000000")).unwrap();
        assert_eq!(cmd.le, Some(256));
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00B0000000"));

        let cmd = Command::from_bytes(&hex!("00A4040003010203")).unwrap();
        assert_eq!(cmd.data(), &hex!("010203"));
        assert!(cmd.le.is_none());
        assert_eq!(cmd.case(), ApduCase::Case3Short);

        let cmd = Command::from_bytes(&hex!("00A4040003010203FF")).unwrap();
        assert_eq!(cmd.data(), &hex!("010203"));
        assert_eq!(cmd.le, Some(0xFF));
        assert_eq!(cmd.case(), ApduCase::Case4Short);
    }

    #[test]
    fn test_decode_extended_cases() {
        // case 2e
        let cmd = Command::from_bytes(&hex!("00B00000000400")).unwrap();
        assert!(cmd.data.is_none());
        assert_eq!(cmd.le, Some(0x0400));
        assert_eq!(cmd.case(), ApduCase::Case2Extended);
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00B00000000400"));

        let cmd = Command::from_bytes(&hex!("00B00000000000")).unwrap();
        assert_eq!(cmd.le, Some(MAX_EXTENDED_LE));
        assert_eq!(cmd.to_bytes().as_ref(), hex!("00B00000000000"));

        // case 3e
        let mut apdu = hex!("80DA0000000120").to_vec();
        apdu.extend((0..0x120).map(|i| i as u8));
        let cmd = Command::from_bytes(&apdu).unwrap();
        assert_eq!(cmd.data_len(), 0x120);
        assert!(cmd.le.is_none());
        assert_eq!(cmd.case(), ApduCase::Case3Extended);
        assert_eq!(cmd.to_bytes().as_ref(), apdu.as_slice());

        // case 4e
        apdu.extend(hex!("0200"));
        let cmd = Command::from_bytes(&apdu).unwrap();
        assert_eq!(cmd.data_len(), 0x120);
        assert_eq!(cmd.le, Some(0x200));
        assert_eq!(cmd.case(), ApduCase::Case4Extended);
        assert_eq!(cmd.to_bytes().as_ref(), apdu.as_slice());
    }

    #[test]
    fn test_decode_extended_with_short_payload() {
        let cmd = Command::from_bytes(&hex!("00000000000005AABBCCDDEE")).unwrap();
        assert_eq!(cmd.data(), &hex!("AABBCCDDEE"));
        assert!(cmd.le.is_none());

        // re-encoded in the shortest form
        assert_eq!(cmd.to_bytes().as_ref(), hex!("0000000005AABBCCDDEE"));
    }

    #[test]
    fn test_decode_malformed() {
        for apdu in [
            &hex!("00A404")[..],
            &hex!("00A40400030102")[..],
            &hex!("00A404000301020304FF")[..],
            &hex!("00A404000001")[..],
            &hex!("00A404000000000000")[..],
            &hex!("00A404000000030102")[..],
            &hex!("00A4040000000301020304")[..],
        ] {
            let err = Command::from_bytes(apdu).unwrap_err();
            assert!(
                matches!(&err, Error::MalformedApdu(bytes) if bytes.as_ref() == apdu),
                "{apdu:02X?} -> {err:?}"
            );
        }
    }

    #[test]
    fn test_round_trip_per_case() {
        let commands = [
            Command::new(0x80, 0xCA, 0x00, 0x66),
            Command::new_with_le(0x80, 0xCA, 0x00, 0x66, 256),
            Command::new_with_data(0x80, 0xE2, 0x80, 0x00, vec![0x5A; 255]),
            Command::new_with_data_and_le(0x00, 0xA4, 0x04, 0x00, vec![0xA0; 16], 1),
            Command::new_with_le(0x00, 0xB0, 0x00, 0x00, 65536),
            Command::new_with_data(0x80, 0xE8, 0x00, 0x01, vec![0xC4; 4096]),
            Command::new_with_data_and_le(0x80, 0xE8, 0x80, 0x02, vec![0x11; 256], 300),
        ];

        let cases: Vec<_> = commands.iter().map(Command::case).collect();
        assert_eq!(
            cases,
            [
                ApduCase::Case1,
                ApduCase::Case2Short,
                ApduCase::Case3Short,
                ApduCase::Case4Short,
                ApduCase::Case2Extended,
                ApduCase::Case3Extended,
                ApduCase::Case4Extended,
            ]
        );

        for command in commands {
            let decoded = Command::from_bytes(&command.to_bytes()).unwrap();
            assert_eq!(decoded, command);
        }
    }

    #[test]
    fn test_zero_le_means_256() {
        let command = Command::new_with_le(0x00, 0xCA, 0x00, 0x00, 0);
        assert_eq!(command.le, Some(MAX_SHORT_LE));
        assert_eq!(command.to_bytes().as_ref(), hex!("00CA000000"));
        assert_eq!(Command::from_bytes(&command.to_bytes()).unwrap(), command);
        assert!(command.check_length().is_ok());

        let command = Command::new_with_data_and_le(0x80, 0xE2, 0x00, 0x00, vec![0x01], 0);
        assert_eq!(command.to_bytes().as_ref(), hex!("80E20000010100"));
        assert_eq!(Command::from_bytes(&command.to_bytes()).unwrap(), command);

        assert_eq!(
            Command::new(0x80, 0xCA, 0x00, 0x66).with_optional_le(Some(0)),
            Command::new_with_le(0x80, 0xCA, 0x00, 0x66, 256)
        );
        assert_eq!(Command::new(0x80, 0xCA, 0x00, 0x66).with_optional_le(None).le, None);
    }

    #[test]
    fn test_check_length() {
        assert!(Command::new_with_le(0x00, 0xB0, 0x00, 0x00, 65536).check_length().is_ok());
        assert!(matches!(
            Command::new_with_le(0x00, 0xB0, 0x00, 0x00, 65537).check_length(),
            Err(Error::InvalidCommandLength(65537))
        ));
        assert!(matches!(
            Command::new_with_data(0x00, 0xD6, 0x00, 0x00, vec![0u8; 65536]).check_length(),
            Err(Error::InvalidCommandLength(65536))
        ));
    }
}
