//! # Design
//!
//! - Wrap each crate's error with the operation that failed.
//! - Classify every failure into exactly one [`FailureKind`], which fixes the
//!   process exit status.
//! - Keep messages constant; the display message is the source chain.

use std::error::Error as StdError;

use thiserror::Error;

use appstage_config::ConfigError;
use appstage_fetch::FetchError;
use appstage_stage::StageError;
use appstage_telemetry::TelemetryError;

/// Result alias for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Descriptor loading or validation failed.
    #[error("configuration operation failed")]
    Config {
        /// Operation identifier.
        operation: &'static str,
        /// Source configuration error.
        source: ConfigError,
    },
    /// Version resolution or archive download failed.
    #[error("fetch operation failed")]
    Fetch {
        /// Operation identifier.
        operation: &'static str,
        /// Source fetch error.
        source: FetchError,
    },
    /// Extraction, post-processing or promotion failed.
    #[error("staging operation failed")]
    Stage {
        /// Operation identifier.
        operation: &'static str,
        /// Source staging error.
        source: StageError,
    },
    /// Logging or metrics setup failed.
    #[error("telemetry operation failed")]
    Telemetry {
        /// Operation identifier.
        operation: &'static str,
        /// Source telemetry error.
        source: TelemetryError,
    },
}

/// Failure categories reported to the caller through the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Telemetry or output plumbing failed.
    Internal,
    /// Malformed or incomplete descriptor.
    Config,
    /// Version page could not be fetched.
    RemoteFetch,
    /// Version pattern matched nothing or captures nothing.
    PatternNotFound,
    /// Archive download failed.
    Transport,
    /// Archive missing or unreadable.
    ArchiveOpen,
    /// Archive root folder could not be determined.
    RootFolderNotFound,
    /// Extraction pattern does not compile.
    PatternSyntax,
    /// Create, write, rename or remove failed.
    Filesystem,
    /// External installer failed.
    ExternalTool,
    /// Archive extension is not supported.
    UnsupportedFormat,
}

impl FailureKind {
    /// Process exit status for this category.
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Internal => 1,
            Self::Config => 2,
            Self::RemoteFetch => 3,
            Self::PatternNotFound => 4,
            Self::Transport => 5,
            Self::ArchiveOpen => 6,
            Self::RootFolderNotFound => 7,
            Self::PatternSyntax => 8,
            Self::Filesystem => 9,
            Self::ExternalTool => 10,
            Self::UnsupportedFormat => 11,
        }
    }

    /// Stable label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Internal => "internal",
            Self::Config => "config",
            Self::RemoteFetch => "remote_fetch",
            Self::PatternNotFound => "pattern_not_found",
            Self::Transport => "transport",
            Self::ArchiveOpen => "archive_open",
            Self::RootFolderNotFound => "root_folder_not_found",
            Self::PatternSyntax => "pattern_syntax",
            Self::Filesystem => "filesystem",
            Self::ExternalTool => "external_tool",
            Self::UnsupportedFormat => "unsupported_format",
        }
    }
}

impl AppError {
    pub(crate) const fn config(operation: &'static str, source: ConfigError) -> Self {
        Self::Config { operation, source }
    }

    pub(crate) const fn fetch(operation: &'static str, source: FetchError) -> Self {
        Self::Fetch { operation, source }
    }

    pub(crate) const fn stage(operation: &'static str, source: StageError) -> Self {
        Self::Stage { operation, source }
    }

    pub(crate) const fn telemetry(operation: &'static str, source: TelemetryError) -> Self {
        Self::Telemetry { operation, source }
    }

    /// Operation that failed.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::Config { operation, .. }
            | Self::Fetch { operation, .. }
            | Self::Stage { operation, .. }
            | Self::Telemetry { operation, .. } => *operation,
        }
    }

    /// Category of this failure.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Config { source, .. } => match source {
                ConfigError::UnsupportedExtension { .. } => FailureKind::UnsupportedFormat,
                _ => FailureKind::Config,
            },
            Self::Fetch { source, .. } => match source {
                FetchError::PageRequest { .. } | FetchError::PageStatus { .. } => {
                    FailureKind::RemoteFetch
                }
                FetchError::PatternNotFound { .. } | FetchError::MissingCaptureGroup { .. } => {
                    FailureKind::PatternNotFound
                }
                FetchError::PatternSyntax { .. } => FailureKind::PatternSyntax,
                FetchError::NoVersionSource => FailureKind::Config,
                FetchError::Client { .. }
                | FetchError::DownloadRequest { .. }
                | FetchError::DownloadStatus { .. }
                | FetchError::DownloadStalled { .. } => FailureKind::Transport,
                FetchError::Io { .. } => FailureKind::Filesystem,
            },
            Self::Stage { source, .. } => match source {
                StageError::ArchiveOpen { .. }
                | StageError::ArchiveDecode { .. }
                | StageError::ArchiveEntry { .. } => FailureKind::ArchiveOpen,
                StageError::RootFolderNotFound { .. } => FailureKind::RootFolderNotFound,
                StageError::PatternSyntax { .. } => FailureKind::PatternSyntax,
                StageError::MissingInput { .. } => FailureKind::Config,
                StageError::InstallerLaunch { .. }
                | StageError::InstallerExit { .. }
                | StageError::InstallerTimeout { .. } => FailureKind::ExternalTool,
                StageError::Io { .. }
                | StageError::Walkdir { .. }
                | StageError::UnsafeEntry { .. }
                | StageError::DestinationExists { .. } => FailureKind::Filesystem,
            },
            Self::Telemetry { .. } => FailureKind::Internal,
        }
    }

    /// Process exit status for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    /// Human-readable message built from the error and its sources.
    #[must_use]
    pub fn display_message(&self) -> String {
        let mut message = format!("{}: {self}", self.operation());
        let mut source = self.source();
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}
