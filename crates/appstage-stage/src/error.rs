//! # Design
//!
//! - Constant messages, structured context (operation, path, pattern) in fields.
//! - Archive open/decode failures are distinct from later filesystem failures so
//!   the caller can report them separately.
//! - Installer failures carry the program and exit code rather than output text.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for staging operations.
pub type StageResult<T> = Result<T, StageError>;

/// Errors produced while extracting and arranging staged files.
#[derive(Debug, Error)]
pub enum StageError {
    /// IO failures while interacting with the filesystem.
    #[error("stage io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// Directory traversal failures.
    #[error("stage walkdir failure")]
    Walkdir {
        /// Operation that triggered the walk failure.
        operation: &'static str,
        /// Root of the traversal.
        path: PathBuf,
        /// Underlying walkdir error.
        source: walkdir::Error,
    },
    /// The archive file could not be opened.
    #[error("archive could not be opened")]
    ArchiveOpen {
        /// Archive path.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The archive is not a readable zip container.
    #[error("archive could not be decoded")]
    ArchiveDecode {
        /// Archive path.
        path: PathBuf,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// An individual archive entry could not be read.
    #[error("archive entry could not be read")]
    ArchiveEntry {
        /// Archive path.
        path: PathBuf,
        /// Entry index within the archive.
        index: usize,
        /// Underlying zip error.
        source: zip::result::ZipError,
    },
    /// The archive has no entries to derive a root folder from.
    #[error("root folder not found in archive")]
    RootFolderNotFound {
        /// Archive path.
        path: PathBuf,
    },
    /// The combined extraction pattern does not compile.
    #[error("invalid extraction pattern")]
    PatternSyntax {
        /// Combined pattern.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// An archive entry or declared path escapes its root.
    #[error("unsafe relative path")]
    UnsafeEntry {
        /// Field or source of the path.
        field: &'static str,
        /// Static reason for the rejection.
        reason: &'static str,
        /// Offending path.
        value: String,
    },
    /// The final folder exists and replacement was not requested.
    #[error("destination folder already exists")]
    DestinationExists {
        /// Existing folder.
        path: PathBuf,
    },
    /// Required input for the selected branch is missing.
    #[error("stage missing input")]
    MissingInput {
        /// Field that was missing.
        field: &'static str,
    },
    /// The installer program could not be started.
    #[error("installer launch failed")]
    InstallerLaunch {
        /// Program that was launched.
        program: String,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The installer exited unsuccessfully.
    #[error("installer exited with failure")]
    InstallerExit {
        /// Program that was launched.
        program: String,
        /// Exit code when the process was not terminated by a signal.
        code: Option<i32>,
    },
    /// The installer did not finish in time and was killed.
    #[error("installer timed out")]
    InstallerTimeout {
        /// Program that was launched.
        program: String,
        /// Timeout that elapsed, in seconds.
        timeout_secs: u64,
    },
}

impl StageError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn walkdir(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: walkdir::Error,
    ) -> Self {
        Self::Walkdir {
            operation,
            path: path.into(),
            source,
        }
    }
}
