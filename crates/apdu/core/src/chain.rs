//! Command chaining
//!
//! A command whose data does not fit one transport unit is split into pieces. Every piece
//! but the last carries exactly `max_data_len` bytes and the chaining bit in its class byte.
//! The last piece carries the remainder and the expected length, capped at the short
//! maximum of 256.

use bytes::Bytes;
use tracing::debug;

use crate::command::{Command, ExpectedLength, MAX_SHORT_LE};
use crate::response::error::ResponseError;
use crate::response::utils::status_of;
use crate::transport::CardTransport;
use crate::{Error, Result};

/// Class byte bit signalling that more command data follows
pub const CLA_CHAINING: u8 = 0x10;

/// Early-abort rule applied while transmitting chained pieces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChainMode {
    /// Continue only while the card answers 90 00
    #[default]
    Command,
    /// Also continue while the card signals more response data (61 XX)
    Response,
}

impl ChainMode {
    /// Whether a piece answered with `response` lets the next piece go out
    pub fn should_continue(self, response: &[u8]) -> bool {
        status_of(response).is_some_and(|status| match self {
            Self::Command => status.is_success(),
            Self::Response => status.is_success() || status.is_more_data_available(),
        })
    }
}

/// Number of pieces needed for `data_len` bytes, at least one
pub const fn piece_count(data_len: usize, max_data_len: usize) -> usize {
    if data_len == 0 || max_data_len == 0 {
        1
    } else {
        data_len.div_ceil(max_data_len)
    }
}

/// Split a command into chained pieces of at most `max_data_len` data bytes
///
/// Pieces are always short form, so `max_data_len` is clamped to 255.
pub fn split_command(command: &Command, max_data_len: usize) -> Vec<Command> {
    let max_data_len = max_data_len.clamp(1, 255);
    let data = command.data.clone().unwrap_or_default();
    let count = piece_count(data.len(), max_data_len);

    let mut pieces = Vec::with_capacity(count);
    for index in 0..count {
        let start = index * max_data_len;
        let last = index + 1 == count;
        let end = if last {
            data.len()
        } else {
            start + max_data_len
        };

        let mut piece = Command::new(command.cla, command.ins, command.p1, command.p2)
            .with_data(data.slice(start..end));

        if last {
            piece.cla &= !CLA_CHAINING;
            piece.le = command.le.map(short_le);
        } else {
            piece.cla |= CLA_CHAINING;
        }
        pieces.push(piece);
    }

    pieces
}

/// Chain a raw APDU, returning the encoded pieces
///
/// An APDU that fits one piece is returned unchanged.
pub fn chain_apdu(apdu: &[u8], max_data_len: usize) -> Result<Vec<Bytes>> {
    let command = Command::from_bytes(apdu)?;
    let pieces = split_command(&command, max_data_len);
    if pieces.len() == 1 {
        return Ok(vec![Bytes::copy_from_slice(apdu)]);
    }

    debug!(pieces = pieces.len(), "Chaining APDU");
    Ok(pieces.iter().map(Command::to_bytes).collect())
}

/// Send a raw APDU as chained pieces, returning the last response
///
/// Transmission stops at the first piece whose status is rejected by `mode`, and that
/// response is returned.
pub fn transmit_chain<T: CardTransport + ?Sized>(
    transport: &mut T,
    apdu: &[u8],
    max_data_len: usize,
    mode: ChainMode,
) -> Result<Bytes> {
    let pieces = chain_apdu(apdu, max_data_len)?;

    let mut response = Bytes::new();
    for piece in pieces {
        response = transport.transmit_raw(&piece)?;
        if !mode.should_continue(&response) {
            break;
        }
    }

    if status_of(&response).is_none() {
        return Err(Error::Response(ResponseError::Incomplete));
    }
    Ok(response)
}

/// Expected length carried by the last piece
///
/// A short piece holds one Le byte, so an extended value becomes the short maximum (`00`).
const fn short_le(le: ExpectedLength) -> ExpectedLength {
    if le <= MAX_SHORT_LE { le } else { MAX_SHORT_LE }
}
