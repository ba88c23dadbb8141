//! Input/output helpers.
//!
//! - mixed-format date parsing (`dates`)
//! - price history CSV ingest + export (`prices`)
//! - event catalog CSV ingest (`events`)
//! - change-point record JSON read/write (`record`)

use std::fs::File;
use std::path::Path;

use crate::error::{ChangePointError, Result};

pub mod dates;
pub mod events;
pub mod prices;
pub mod record;

pub use dates::*;
pub use events::*;
pub use prices::*;
pub use record::*;

pub(crate) fn open_file(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| ChangePointError::File {
        path: path.to_path_buf(),
        source,
    })
}

pub(crate) fn create_file(path: &Path) -> Result<File> {
    File::create(path).map_err(|source| ChangePointError::File {
        path: path.to_path_buf(),
        source,
    })
}
