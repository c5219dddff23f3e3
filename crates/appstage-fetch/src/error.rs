//! # Design
//!
//! - Separate version-page failures from artifact download failures; callers
//!   report them under different categories.
//! - Keep messages constant and carry URL, path, and pattern as fields.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors produced while resolving versions or downloading archives.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("http client construction failed")]
    Client {
        /// Underlying client error.
        source: reqwest::Error,
    },
    /// Requesting the version page failed.
    #[error("version page request failed")]
    PageRequest {
        /// Page URL.
        url: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// The version page answered with a non-success status.
    #[error("version page returned an error status")]
    PageStatus {
        /// Page URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The version pattern is not a valid regular expression.
    #[error("invalid version pattern")]
    PatternSyntax {
        /// Offending pattern.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },
    /// The version pattern declares no capture group.
    #[error("version pattern has no capture group")]
    MissingCaptureGroup {
        /// Offending pattern.
        pattern: String,
    },
    /// The version pattern did not match the page body.
    #[error("version not found on page")]
    PatternNotFound {
        /// Page URL.
        url: String,
        /// Pattern applied to the body.
        pattern: String,
    },
    /// Neither an override, explicit version, nor version check is available.
    #[error("no version source configured")]
    NoVersionSource,
    /// Requesting the archive failed.
    #[error("archive download request failed")]
    DownloadRequest {
        /// Archive URL.
        url: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },
    /// The archive URL answered with a non-success status.
    #[error("archive download returned an error status")]
    DownloadStatus {
        /// Archive URL.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// No body bytes arrived within the idle timeout.
    #[error("archive download stalled")]
    DownloadStalled {
        /// Archive URL.
        url: String,
        /// Idle timeout that elapsed, in seconds.
        idle_secs: u64,
    },
    /// Local file operations failed.
    #[error("fetch io failure")]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}
