//! LOAD command for GlobalPlatform
//!
//! A load file image is wrapped in a `C4` TLV with a BER length and sent in consecutive
//! blocks. P2 numbers the blocks and P1 marks the last one.

use bytes::Bytes;
use derive_more::{Deref, Into};
use gpcard_apdu_core::Command;
use iso7816_tlv::ber::{Tag, Tlv, Value};

use crate::constants::{MAX_APDU_DATA_LEN, cla, ins, load_p1, tags};
use crate::{Error, Result};

/// LOAD command for GlobalPlatform
#[derive(Debug, Clone, PartialEq, Eq, Deref, Into)]
pub struct LoadCommand(Command);

impl LoadCommand {
    /// Create a LOAD command for one block
    pub fn with_block(block_number: u8, last: bool, block: impl Into<Bytes>) -> Self {
        let p1 = if last {
            load_p1::LAST_BLOCK
        } else {
            load_p1::MORE_BLOCKS
        };
        Self(Command::new_with_data(cla::GP, ins::LOAD, p1, block_number, block))
    }

    /// Split a load file image into LOAD commands of at most `max_block_len` bytes
    pub fn blocks(image: &[u8], max_block_len: usize) -> Result<Vec<Self>> {
        let file = Tlv::new(
            Tag::try_from(tags::LOAD_FILE_DATA_BLOCK)?,
            Value::Primitive(image.to_vec()),
        )?
        .to_vec();

        let max_block_len = max_block_len.clamp(1, MAX_APDU_DATA_LEN);
        let count = file.len().div_ceil(max_block_len);
        if count > usize::from(u8::MAX) + 1 {
            return Err(Error::Parse("load file needs more than 256 blocks"));
        }

        let file = Bytes::from(file);
        Ok((0..count)
            .map(|index| {
                let start = index * max_block_len;
                let end = (start + max_block_len).min(file.len());
                Self::with_block(index as u8, index + 1 == count, file.slice(start..end))
            })
            .collect())
    }
}
