//! Utility functions for APDU response handling

use tracing::debug;

use crate::response::error::ResponseError;
use crate::response::status::StatusWord;

/// Split raw response bytes into the payload and the trailing status word
///
/// # Errors
/// Returns an error if the data is too short to contain a valid status word.
pub fn extract_status_and_payload(data: &[u8]) -> Result<(StatusWord, &[u8]), ResponseError> {
    let Some(split) = data.len().checked_sub(2) else {
        debug!("Response too short: {} bytes", data.len());
        return Err(ResponseError::Incomplete);
    };

    let (payload, sw) = data.split_at(split);
    Ok((StatusWord::new(sw[0], sw[1]), payload))
}

/// Status word of raw response bytes, if present
pub fn status_of(data: &[u8]) -> Option<StatusWord> {
    extract_status_and_payload(data).ok().map(|(status, _)| status)
}
