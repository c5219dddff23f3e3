//! Promotion of the working folder to its final name.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{StageError, StageResult};

/// What [`promote`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    /// The working folder was renamed; `replaced` reports whether an existing
    /// final folder was removed first.
    Renamed {
        /// An existing final folder was deleted.
        replaced: bool,
    },
    /// The working folder already carries the final name.
    AlreadyInPlace,
}

/// Rename `working` to `final_folder`.
///
/// # Errors
///
/// Returns [`StageError::DestinationExists`] when the final folder exists and
/// `force_replace` is false, and [`StageError::Io`] when removal or rename fails.
pub fn promote(working: &Path, final_folder: &Path, force_replace: bool) -> StageResult<Promotion> {
    if working == final_folder {
        return Ok(Promotion::AlreadyInPlace);
    }

    let mut replaced = false;
    if final_folder.exists() {
        if !force_replace {
            return Err(StageError::DestinationExists {
                path: final_folder.to_path_buf(),
            });
        }
        fs::remove_dir_all(final_folder)
            .map_err(|err| StageError::io("promote.remove_existing", final_folder, err))?;
        replaced = true;
    }

    fs::rename(working, final_folder)
        .map_err(|err| StageError::io("promote.rename", working, err))?;
    info!(
        from = %working.display(),
        to = %final_folder.display(),
        replaced,
        "promoted working folder"
    );
    Ok(Promotion::Renamed { replaced })
}
