//! Run orchestrator.
//!
//! # Design
//! - Linear pipeline: validate, resolve version, check existing artifacts,
//!   fetch, extract, post-process, promote. The first failure ends the run.
//! - An existing archive without `force_refresh` is treated as "up to date" and
//!   ends the run successfully before any network access.
//! - An existing final folder without `force_refresh` fails the run before the
//!   download starts.
//! - The resolved version must render into plain single-component names
//!   before any path under `base_dir` is touched.
//! - Nothing is retried and partial results are not rolled back.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use appstage_config::{AppDescriptor, ArchiveKind, validate_descriptor, validate_rendered_names};
use appstage_fetch::{
    FetchSettings, HttpFetcher, ResolvedVersion, ensure_local_archive, resolve_version,
};
use appstage_stage::{
    EntryFilter, ExtractRequest, MsiExec, PackageInstaller, Promotion, StageError,
    apply_post_processing, extract_archive, promote,
};
use appstage_telemetry::{ByteSize, Metrics};

use crate::error::{AppError, AppResult};
use crate::report::{RunOutcome, RunReport};
use crate::steps::{StepKind, StepLog, StepOutcome};

/// Options that apply to a single invocation.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory receiving the archive and the staged folders.
    pub base_dir: PathBuf,
    /// Re-fetch, re-extract and replace an existing final folder.
    pub force_refresh: bool,
    /// With `force_refresh`, keep an existing local archive.
    pub reuse_archive: bool,
    /// Version that takes precedence over every other source.
    pub version_override: Option<String>,
    /// Connect timeout and version page timeout.
    pub http_timeout: Duration,
    /// Longest allowed gap between two download chunks.
    pub download_idle_timeout: Duration,
    /// Longest allowed installer run.
    pub installer_timeout: Duration,
    /// Installer program for packages.
    pub installer_program: String,
}

impl Default for RunOptions {
    fn default() -> Self {
        let fetch = FetchSettings::default();
        Self {
            base_dir: PathBuf::from("."),
            force_refresh: false,
            reuse_archive: false,
            version_override: None,
            http_timeout: fetch.http_timeout,
            download_idle_timeout: fetch.download_idle_timeout,
            installer_timeout: Duration::from_secs(600),
            installer_program: appstage_stage::DEFAULT_INSTALLER_PROGRAM.to_string(),
        }
    }
}

impl RunOptions {
    const fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            http_timeout: self.http_timeout,
            download_idle_timeout: self.download_idle_timeout,
        }
    }
}

/// Names and paths derived once the version is known.
#[derive(Debug, Clone)]
struct RunState {
    resolved: ResolvedVersion,
    folder_name: String,
    download_url: String,
    archive_path: PathBuf,
    final_folder: PathBuf,
}

impl RunState {
    fn derive(descriptor: &AppDescriptor, resolved: ResolvedVersion, base_dir: &Path) -> Self {
        let version = resolved.version.as_str();
        Self {
            folder_name: descriptor.folder_name(version),
            download_url: descriptor.download_url_for(version),
            archive_path: base_dir.join(descriptor.archive_file_name(version)),
            final_folder: base_dir.join(descriptor.final_folder_name(version)),
            resolved,
        }
    }
}

/// Executes staging runs with shared network, installer and metrics handles.
pub struct Orchestrator {
    fetcher: HttpFetcher,
    installer: Arc<dyn PackageInstaller>,
    metrics: Metrics,
}

impl Orchestrator {
    /// Assemble an orchestrator from explicit collaborators.
    #[must_use]
    pub fn new(fetcher: HttpFetcher, installer: Arc<dyn PackageInstaller>, metrics: Metrics) -> Self {
        Self {
            fetcher,
            installer,
            metrics,
        }
    }

    /// Build the default collaborators for `options`.
    ///
    /// # Errors
    ///
    /// Returns an error when the HTTP client cannot be constructed.
    pub fn from_options(options: &RunOptions, metrics: Metrics) -> AppResult<Self> {
        let fetcher = HttpFetcher::new(options.fetch_settings())
            .map_err(|source| AppError::fetch("http_client", source))?;
        let installer = MsiExec::new(options.installer_program.clone(), options.installer_timeout);
        Ok(Self::new(fetcher, Arc::new(installer), metrics))
    }

    /// Stage `descriptor` according to `options`.
    ///
    /// # Errors
    ///
    /// Returns the first failure of any pipeline step.
    pub async fn run(&self, descriptor: &AppDescriptor, options: &RunOptions) -> AppResult<RunReport> {
        let span = info_span!(
            "run",
            run_id = %Uuid::new_v4(),
            application = %descriptor.name
        );
        let result = self.run_pipeline(descriptor, options).instrument(span).await;
        let outcome = match &result {
            Ok(report) => report.outcome.as_str(),
            Err(_) => "failed",
        };
        self.metrics.inc_run(outcome);
        result
    }

    async fn run_pipeline(
        &self,
        descriptor: &AppDescriptor,
        options: &RunOptions,
    ) -> AppResult<RunReport> {
        let mut steps = StepLog::new(self.metrics.clone());
        let version_override = options.version_override.as_deref();

        let kind = steps.execute(StepKind::Validate, || {
            let kind = validate_descriptor(descriptor, version_override.is_some())
                .map_err(|source| AppError::config("validate", source))?;
            Ok((kind, StepOutcome::Completed(Some(kind.as_str().to_string()))))
        })?;

        steps.begin(StepKind::ResolveVersion);
        let resolved = resolve_version(&self.fetcher, descriptor, version_override)
            .await
            .map_err(|source| AppError::fetch("resolve_version", source))
            .and_then(|resolved| {
                validate_rendered_names(descriptor, &resolved.version)
                    .map_err(|source| AppError::config("resolve_version.names", source))?;
                let detail = format!("{} ({})", resolved.version, resolved.source.as_str());
                Ok((resolved, StepOutcome::Completed(Some(detail))))
            });
        let resolved = steps.settle(StepKind::ResolveVersion, resolved)?;
        let state = RunState::derive(descriptor, resolved, &options.base_dir);
        info!(
            version = %state.resolved.version,
            archive = %state.archive_path.display(),
            final_folder = %state.final_folder.display(),
            "run state derived"
        );

        let up_to_date = steps.execute(StepKind::CheckExisting, || {
            check_existing(&state, options.force_refresh)
        })?;
        if up_to_date {
            info!(archive = %state.archive_path.display(), "archive already present; nothing to do");
            return Ok(RunReport::new(RunOutcome::UpToDate, descriptor, &state.resolved)
                .with_paths(&state.archive_path, &state.final_folder)
                .with_download(0, true)
                .with_steps(steps.into_records()));
        }

        steps.begin(StepKind::Fetch);
        let download = ensure_local_archive(
            &self.fetcher,
            &state.download_url,
            &state.archive_path,
            !options.reuse_archive,
        )
        .await
        .map(|download| {
            self.metrics.add_download_bytes(download.bytes);
            let outcome = if download.reused {
                StepOutcome::Skipped(Some("archive reused".to_string()))
            } else {
                StepOutcome::Completed(Some(ByteSize(download.bytes).to_string()))
            };
            (download, outcome)
        })
        .map_err(|source| AppError::fetch("fetch", source));
        let download = steps.settle(StepKind::Fetch, download)?;

        steps.begin(StepKind::Extract);
        let extraction = self.extract(descriptor, kind, &state, options).await;
        let working_folder = steps.settle(StepKind::Extract, extraction)?;

        steps.execute(StepKind::PostProcess, || {
            let summary = apply_post_processing(&working_folder, descriptor)
                .map_err(|source| AppError::stage("post_process", source))?;
            let outcome = if summary.is_empty() {
                StepOutcome::Skipped(None)
            } else {
                StepOutcome::Completed(Some(format!(
                    "{} folders, {} files, {} moves",
                    summary.folders, summary.files, summary.moves
                )))
            };
            Ok(((), outcome))
        })?;

        steps.execute(StepKind::Promote, || {
            let promotion = promote(&working_folder, &state.final_folder, options.force_refresh)
                .map_err(|source| AppError::stage("promote", source))?;
            let outcome = match promotion {
                Promotion::Renamed { replaced: true } => {
                    StepOutcome::Completed(Some("replaced existing folder".to_string()))
                }
                Promotion::Renamed { replaced: false } => StepOutcome::Completed(None),
                Promotion::AlreadyInPlace => {
                    StepOutcome::Skipped(Some("already in place".to_string()))
                }
            };
            Ok(((), outcome))
        })?;

        Ok(RunReport::new(RunOutcome::Staged, descriptor, &state.resolved)
            .with_paths(&state.archive_path, &state.final_folder)
            .with_download(download.bytes, download.reused)
            .with_steps(steps.into_records()))
    }

    async fn extract(
        &self,
        descriptor: &AppDescriptor,
        kind: ArchiveKind,
        state: &RunState,
        options: &RunOptions,
    ) -> AppResult<(PathBuf, StepOutcome)> {
        let filter = EntryFilter::build(&descriptor.extract_patterns)
            .map_err(|source| AppError::stage("extract.filter", source))?;
        debug!(pattern = filter.pattern().unwrap_or("<none>"), "entry filter compiled");
        let request = ExtractRequest {
            archive: &state.archive_path,
            kind,
            base_dir: &options.base_dir,
            folder_name: &state.folder_name,
            remove_root_folder: descriptor.remove_root_folder,
            root_folder_name: descriptor.root_folder_name.as_deref(),
            filter: &filter,
            clean_stale: options.force_refresh,
        };
        let extraction = extract_archive(&request, self.installer.as_ref())
            .await
            .map_err(|source| AppError::stage("extract", source))?;
        let detail = format!(
            "{} written, {} skipped",
            extraction.written, extraction.skipped
        );
        Ok((extraction.working_folder, StepOutcome::Completed(Some(detail))))
    }
}

/// Returns `true` when the run has nothing to do.
fn check_existing(state: &RunState, force_refresh: bool) -> AppResult<(bool, StepOutcome)> {
    if force_refresh {
        return Ok((false, StepOutcome::Completed(Some("force refresh".to_string()))));
    }
    if state.archive_path.exists() {
        return Ok((true, StepOutcome::Skipped(Some("archive present".to_string()))));
    }
    if state.final_folder.exists() {
        return Err(AppError::stage(
            "check_existing",
            StageError::DestinationExists {
                path: state.final_folder.clone(),
            },
        ));
    }
    Ok((false, StepOutcome::Completed(None)))
}
