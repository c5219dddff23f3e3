//! Post-processing of the working folder.
//!
//! Three sub-steps run in order, each finishing before the next starts:
//! folders are created, literal files are written, then objects are renamed.
//! A failure stops the current loop; earlier operations are not rolled back.

use std::fs::{self, OpenOptions};
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use appstage_config::AppDescriptor;

use crate::error::{StageError, StageResult};
use crate::paths::{make_writable, sanitize_relative};

/// Counts of applied post-processing operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostProcessSummary {
    /// Folders created or already present.
    pub folders: usize,
    /// Files written.
    pub files: usize,
    /// Objects renamed.
    pub moves: usize,
}

impl PostProcessSummary {
    /// Whether nothing was declared.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.folders == 0 && self.files == 0 && self.moves == 0
    }
}

/// Apply the descriptor's folder, file and move declarations to `working`.
///
/// # Errors
///
/// Returns the first filesystem or path error encountered.
pub fn apply_post_processing(
    working: &Path,
    descriptor: &AppDescriptor,
) -> StageResult<PostProcessSummary> {
    Ok(PostProcessSummary {
        folders: create_folders(working, &descriptor.create_folders)?,
        files: create_files(working, &descriptor.create_files)?,
        moves: move_objects(working, &descriptor.move_objects)?,
    })
}

/// Create each relative folder, including intermediate directories.
///
/// # Errors
///
/// Returns [`StageError::Io`] when a folder cannot be created.
pub fn create_folders(working: &Path, folders: &[String]) -> StageResult<usize> {
    for folder in folders {
        let path = working.join(sanitize_relative("create_folders", folder)?);
        fs::create_dir_all(&path)
            .map_err(|err| StageError::io("post_process.create_folder", &path, err))?;
        debug!(path = %path.display(), "created folder");
    }
    Ok(folders.len())
}

/// Write each `(relative path -> content)` pair, replacing existing files,
/// including read-only ones.
///
/// Parent directories are not created. On Unix the files are created with
/// mode `0o777` subject to the process umask.
///
/// # Errors
///
/// Returns [`StageError::Io`] when a file cannot be written.
pub fn create_files(working: &Path, files: &IndexMap<String, String>) -> StageResult<usize> {
    for (name, body) in files {
        let path = working.join(sanitize_relative("create_files", name)?);
        make_writable("post_process.unlock", &path)?;
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o777);
        let mut file = options
            .open(&path)
            .map_err(|err| StageError::io("post_process.create_file", &path, err))?;
        file.write_all(body.as_bytes())
            .map_err(|err| StageError::io("post_process.write_file", &path, err))?;
        debug!(path = %path.display(), bytes = body.len(), "wrote file");
    }
    Ok(files.len())
}

/// Rename `working/source` to `working/destination` for each
/// `(destination -> source)` pair.
///
/// # Errors
///
/// Returns [`StageError::Io`] when a rename fails.
pub fn move_objects(working: &Path, moves: &IndexMap<String, String>) -> StageResult<usize> {
    for (destination, source) in moves {
        let from = working.join(sanitize_relative("move_objects", source)?);
        let to = working.join(sanitize_relative("move_objects", destination)?);
        fs::rename(&from, &to).map_err(|err| StageError::io("post_process.move", &from, err))?;
        debug!(from = %from.display(), to = %to.display(), "moved object");
    }
    Ok(moves.len())
}
