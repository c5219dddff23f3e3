//! Prometheus-backed run metrics.
//!
//! # Design
//! - Encapsulates collector registration to keep the public API small.
//! - A staging run is short-lived, so the registry is rendered once at exit
//!   (text exposition suitable for a textfile collector).

use std::fs;
use std::path::Path;
use std::sync::Arc;

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Prometheus-backed metrics registry for one process.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    steps_total: IntCounterVec,
    runs_total: IntCounterVec,
    download_bytes_total: IntCounter,
}

/// Snapshot of selected counters for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Bytes written by archive downloads.
    pub download_bytes_total: u64,
    /// Runs that finished by staging a new folder.
    pub runs_staged_total: u64,
    /// Runs that found an up-to-date archive and exited early.
    pub runs_up_to_date_total: u64,
    /// Runs that failed.
    pub runs_failed_total: u64,
}

impl Metrics {
    /// Construct a new metrics registry with the standard collectors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built or
    /// registered.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let steps_total = IntCounterVec::new(
            Opts::new("appstage_steps_total", "Pipeline steps recorded by status"),
            &["step", "status"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "appstage_steps_total",
            source,
        })?;
        let runs_total = IntCounterVec::new(
            Opts::new("appstage_runs_total", "Staging runs by outcome"),
            &["outcome"],
        )
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "appstage_runs_total",
            source,
        })?;
        let download_bytes_total = IntCounter::with_opts(Opts::new(
            "appstage_download_bytes_total",
            "Bytes written by archive downloads",
        ))
        .map_err(|source| TelemetryError::MetricsCollector {
            name: "appstage_download_bytes_total",
            source,
        })?;

        registry
            .register(Box::new(steps_total.clone()))
            .map_err(|source| TelemetryError::MetricsRegister {
                name: "appstage_steps_total",
                source,
            })?;
        registry
            .register(Box::new(runs_total.clone()))
            .map_err(|source| TelemetryError::MetricsRegister {
                name: "appstage_runs_total",
                source,
            })?;
        registry
            .register(Box::new(download_bytes_total.clone()))
            .map_err(|source| TelemetryError::MetricsRegister {
                name: "appstage_download_bytes_total",
                source,
            })?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                steps_total,
                runs_total,
                download_bytes_total,
            }),
        })
    }

    /// Increment the pipeline step counter.
    pub fn inc_step(&self, step: &str, status: &str) {
        self.inner
            .steps_total
            .with_label_values(&[step, status])
            .inc();
    }

    /// Increment the run counter for the given outcome label.
    pub fn inc_run(&self, outcome: &str) {
        self.inner.runs_total.with_label_values(&[outcome]).inc();
    }

    /// Add downloaded bytes to the running total.
    pub fn add_download_bytes(&self, bytes: u64) {
        self.inner.download_bytes_total.inc_by(bytes);
    }

    /// Render the metrics registry using the Prometheus text exposition format.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics cannot be encoded or if the encoded
    /// buffer is not valid UTF-8.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|source| TelemetryError::MetricsEncode { source })?;
        String::from_utf8(buffer).map_err(|source| TelemetryError::MetricsUtf8 { source })
    }

    /// Render the registry and write it to `path`, replacing any previous file.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails or the file cannot be written.
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let rendered = self.render()?;
        fs::write(path, rendered).map_err(|source| TelemetryError::MetricsWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Take a point-in-time snapshot of the run counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let runs = |outcome: &str| self.inner.runs_total.with_label_values(&[outcome]).get();
        MetricsSnapshot {
            download_bytes_total: self.inner.download_bytes_total.get(),
            runs_staged_total: runs("staged"),
            runs_up_to_date_total: runs("up_to_date"),
            runs_failed_total: runs("failed"),
        }
    }
}
