//! Summary of a finished run.

use std::path::{Path, PathBuf};

use serde::Serialize;

use appstage_config::AppDescriptor;
use appstage_fetch::ResolvedVersion;

use crate::steps::StepRecord;

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The application was downloaded, extracted and promoted.
    Staged,
    /// The archive was already present; nothing was changed.
    UpToDate,
}

impl RunOutcome {
    /// Stable label used in metrics and tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Staged => "staged",
            Self::UpToDate => "up_to_date",
        }
    }
}

/// Serializable result of [`crate::Orchestrator::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Run outcome.
    pub outcome: RunOutcome,
    /// Descriptor application name template.
    pub application: String,
    /// Resolved version.
    pub version: String,
    /// Origin of the version (`override`, `explicit` or `remote`).
    pub version_source: &'static str,
    /// Local archive path.
    pub archive_path: PathBuf,
    /// Final folder path.
    pub final_folder: PathBuf,
    /// Bytes written by the download.
    pub bytes_downloaded: u64,
    /// Whether an existing archive was used instead of downloading.
    pub archive_reused: bool,
    /// Pipeline steps in execution order.
    pub steps: Vec<StepRecord>,
}

impl RunReport {
    pub(crate) fn new(
        outcome: RunOutcome,
        descriptor: &AppDescriptor,
        resolved: &ResolvedVersion,
    ) -> Self {
        Self {
            outcome,
            application: descriptor.name.clone(),
            version: resolved.version.clone(),
            version_source: resolved.source.as_str(),
            archive_path: PathBuf::new(),
            final_folder: PathBuf::new(),
            bytes_downloaded: 0,
            archive_reused: false,
            steps: Vec::new(),
        }
    }

    pub(crate) fn with_paths(mut self, archive_path: &Path, final_folder: &Path) -> Self {
        self.archive_path = archive_path.to_path_buf();
        self.final_folder = final_folder.to_path_buf();
        self
    }

    pub(crate) const fn with_download(mut self, bytes: u64, reused: bool) -> Self {
        self.bytes_downloaded = bytes;
        self.archive_reused = reused;
        self
    }

    pub(crate) fn with_steps(mut self, steps: Vec<StepRecord>) -> Self {
        self.steps = steps;
        self
    }
}
