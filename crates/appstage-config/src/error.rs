//! # Design
//!
//! - Keep error messages constant; carry the offending field and value as context.
//! - Report unsupported archive extensions separately from malformed descriptors so
//!   callers can classify them independently.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias for descriptor operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating an application descriptor.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading the descriptor from disk failed.
    #[error("descriptor io failure")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path of the descriptor.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
    /// The descriptor was not valid JSON or had mistyped fields.
    #[error("descriptor json failure")]
    Json {
        /// Path of the descriptor when loaded from disk.
        path: Option<PathBuf>,
        /// Underlying JSON error.
        source: serde_json::Error,
    },
    /// A descriptor field contained an invalid value.
    #[error("invalid descriptor field")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Static reason for the failure.
        reason: &'static str,
        /// Offending value when available.
        value: Option<String>,
    },
    /// Neither an explicit version, a version check, nor an override was supplied.
    #[error("descriptor has no version source")]
    MissingVersionSource,
    /// The download extension is not one of the supported archive kinds.
    #[error("unsupported archive extension")]
    UnsupportedExtension {
        /// Extension supplied by the descriptor.
        value: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: &'static str, value: Option<&str>) -> Self {
        Self::InvalidField {
            field,
            reason,
            value: value.map(str::to_string),
        }
    }
}
