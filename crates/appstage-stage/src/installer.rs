//! Administrative extraction of installer packages.
//!
//! # Design
//! - [`PackageInstaller`] is the seam between the extraction engine and the
//!   external tool, so tests can substitute an in-process implementation.
//! - [`MsiExec`] runs `<program> /a <package> /qn TARGETDIR=<dir>` and kills the
//!   child when the timeout elapses.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{StageError, StageResult};

/// Program used for administrative extraction when none is configured.
pub const DEFAULT_INSTALLER_PROGRAM: &str = "msiexec";

/// Unpacks an installer package into a directory without installing it.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Extract `package` into the absolute directory `target`.
    async fn administrative_extract(&self, package: &Path, target: &Path) -> StageResult<()>;
}

/// [`PackageInstaller`] backed by an `msiexec`-compatible program.
#[derive(Debug, Clone)]
pub struct MsiExec {
    program: String,
    timeout: Duration,
}

impl MsiExec {
    /// Configure the program and the time it is allowed to run.
    #[must_use]
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

}

impl Default for MsiExec {
    fn default() -> Self {
        Self::new(DEFAULT_INSTALLER_PROGRAM, Duration::from_secs(600))
    }
}

#[async_trait]
impl PackageInstaller for MsiExec {
    async fn administrative_extract(&self, package: &Path, target: &Path) -> StageResult<()> {
        let mut target_arg = std::ffi::OsString::from("TARGETDIR=");
        target_arg.push(target.as_os_str());

        info!(
            program = %self.program,
            package = %package.display(),
            target = %target.display(),
            "running administrative extraction"
        );
        let mut child = Command::new(&self.program)
            .arg("/a")
            .arg(package)
            .arg("/qn")
            .arg(target_arg)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| StageError::InstallerLaunch {
                program: self.program.clone(),
                source,
            })?;

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let status = match waited {
            Ok(status) => status.map_err(|source| StageError::InstallerLaunch {
                program: self.program.clone(),
                source,
            })?,
            Err(_) => {
                if let Err(err) = child.kill().await {
                    warn!(error = %err, program = %self.program, "failed to kill timed out installer");
                }
                return Err(StageError::InstallerTimeout {
                    program: self.program.clone(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        if !status.success() {
            return Err(StageError::InstallerExit {
                program: self.program.clone(),
                code: status.code(),
            });
        }
        debug!(program = %self.program, "administrative extraction finished");
        Ok(())
    }
}
