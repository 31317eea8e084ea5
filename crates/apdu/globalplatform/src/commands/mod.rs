//! GlobalPlatform command definitions
//!
//! Each command is a thin newtype over [`gpcard_apdu_core::Command`] with builders for the
//! data layouts GlobalPlatform defines. Response parsers live next to the command that
//! produces the response.

pub mod delete;
pub mod external_authenticate;
pub mod get_data;
pub mod get_status;
pub mod initialize_update;
pub mod install;
pub mod load;
pub mod put_key;
pub mod select;
pub mod set_status;
pub mod store_data;

pub use delete::DeleteCommand;
pub use external_authenticate::ExternalAuthenticateCommand;
pub use get_data::{GetDataCommand, KeyInfo};
pub use get_status::{ApplicationInfo, GetStatusCommand, GetStatusResult, LoadFileInfo};
pub use initialize_update::{InitializeUpdateCommand, InitializeUpdateResponse};
pub use install::InstallCommand;
pub use load::LoadCommand;
pub use put_key::PutKeyCommand;
pub use select::SelectCommand;
pub use set_status::SetStatusCommand;
pub use store_data::StoreDataCommand;

use crate::{Error, Result};

/// Append a one byte length followed by `value`
pub(crate) fn push_lv(buf: &mut Vec<u8>, value: &[u8]) -> Result<()> {
    let len = u8::try_from(value.len())
        .map_err(|_| Error::Parse("length-value field longer than 255 bytes"))?;
    buf.push(len);
    buf.extend_from_slice(value);
    Ok(())
}
