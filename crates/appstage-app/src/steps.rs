//! Step bookkeeping for a single run.
//!
//! Each pipeline step keeps one record holding its latest status; every status
//! change is counted in the run metrics.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use appstage_telemetry::Metrics;

use crate::error::AppResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StepKind {
    Validate,
    ResolveVersion,
    CheckExisting,
    Fetch,
    Extract,
    PostProcess,
    Promote,
}

impl StepKind {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Validate => "validate",
            Self::ResolveVersion => "resolve_version",
            Self::CheckExisting => "check_existing",
            Self::Fetch => "fetch",
            Self::Extract => "extract",
            Self::PostProcess => "post_process",
            Self::Promote => "promote",
        }
    }
}

/// Status of a pipeline step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The step began.
    Started,
    /// The step finished its work.
    Completed,
    /// The step failed and ended the run.
    Failed,
    /// The step had nothing to do.
    Skipped,
}

impl StepStatus {
    /// Stable label used in metrics and tables.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Latest state of one pipeline step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// Step name.
    pub name: String,
    /// Latest status.
    pub status: StepStatus,
    /// Short human-readable detail.
    pub detail: Option<String>,
    /// Time of the latest status change.
    pub updated_at: DateTime<Utc>,
}

pub(crate) enum StepOutcome {
    Completed(Option<String>),
    Skipped(Option<String>),
}

impl StepOutcome {
    const fn status(&self) -> StepStatus {
        match self {
            Self::Completed(_) => StepStatus::Completed,
            Self::Skipped(_) => StepStatus::Skipped,
        }
    }

    fn into_detail(self) -> Option<String> {
        match self {
            Self::Completed(detail) | Self::Skipped(detail) => detail,
        }
    }
}

pub(crate) struct StepLog {
    records: Vec<StepRecord>,
    metrics: Metrics,
}

impl StepLog {
    pub(crate) const fn new(metrics: Metrics) -> Self {
        Self {
            records: Vec::new(),
            metrics,
        }
    }

    pub(crate) fn into_records(self) -> Vec<StepRecord> {
        self.records
    }

    /// Run a synchronous step between `started` and its terminal record.
    pub(crate) fn execute<T, F>(&mut self, step: StepKind, op: F) -> AppResult<T>
    where
        F: FnOnce() -> AppResult<(T, StepOutcome)>,
    {
        self.begin(step);
        let result = op();
        self.settle(step, result)
    }

    pub(crate) fn begin(&mut self, step: StepKind) {
        debug!(step = step.as_str(), "step started");
        self.record(step, StepStatus::Started, None);
    }

    /// Record the terminal status of a step that [`Self::begin`] opened.
    pub(crate) fn settle<T>(
        &mut self,
        step: StepKind,
        result: AppResult<(T, StepOutcome)>,
    ) -> AppResult<T> {
        match result {
            Ok((value, outcome)) => {
                let status = outcome.status();
                let detail = outcome.into_detail();
                info!(
                    step = step.as_str(),
                    status = status.as_str(),
                    detail = detail.as_deref().unwrap_or(""),
                    "step finished"
                );
                self.record(step, status, detail);
                Ok(value)
            }
            Err(err) => {
                warn!(
                    step = step.as_str(),
                    operation = err.operation(),
                    error = %err.display_message(),
                    "step failed"
                );
                self.record(step, StepStatus::Failed, Some(err.display_message()));
                Err(err)
            }
        }
    }

    fn record(&mut self, step: StepKind, status: StepStatus, detail: Option<String>) {
        let now = Utc::now();
        if let Some(record) = self
            .records
            .iter_mut()
            .find(|record| record.name == step.as_str())
        {
            if record.status == status && record.detail == detail {
                return;
            }
            record.status = status;
            record.detail = detail;
            record.updated_at = now;
        } else {
            self.records.push(StepRecord {
                name: step.as_str().to_string(),
                status,
                detail,
                updated_at: now,
            });
        }
        self.metrics.inc_step(step.as_str(), status.as_str());
    }
}
