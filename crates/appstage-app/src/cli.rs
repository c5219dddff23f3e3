//! Command-line entry point.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::{error, info};

use appstage_config::load_descriptor;
use appstage_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, Metrics, init_logging};

use crate::error::{AppError, AppResult, FailureKind};
use crate::orchestrator::{Orchestrator, RunOptions};
use crate::output::{OutputFormat, render_report};
use crate::report::RunReport;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_INSTALLER_TIMEOUT_SECS: u64 = 600;

#[derive(Parser, Debug)]
#[command(
    name = "appstage",
    version,
    about = "Download, extract and stage a portable application from a JSON descriptor"
)]
pub(crate) struct Cli {
    /// Application descriptor (JSON).
    config: PathBuf,
    /// Version to stage, overriding the descriptor and the version page.
    #[arg(long, env = "APPSTAGE_VERSION")]
    version_override: Option<String>,
    /// Re-download, re-extract and replace an existing final folder.
    #[arg(long, env = "APPSTAGE_FORCE")]
    force: bool,
    /// With --force, keep an existing local archive.
    #[arg(long, env = "APPSTAGE_REUSE_ARCHIVE")]
    reuse_archive: bool,
    /// Directory receiving the archive and staged folders.
    #[arg(long = "dir", env = "APPSTAGE_DIR", default_value = ".")]
    base_dir: PathBuf,
    /// Connect and version page timeout in seconds.
    #[arg(long, env = "APPSTAGE_HTTP_TIMEOUT_SECS", default_value_t = DEFAULT_HTTP_TIMEOUT_SECS)]
    http_timeout: u64,
    /// Longest silence allowed during the archive download, in seconds.
    #[arg(
        long,
        env = "APPSTAGE_DOWNLOAD_IDLE_TIMEOUT_SECS",
        default_value_t = DEFAULT_IDLE_TIMEOUT_SECS
    )]
    download_idle_timeout: u64,
    /// Longest installer run in seconds.
    #[arg(
        long,
        env = "APPSTAGE_INSTALLER_TIMEOUT_SECS",
        default_value_t = DEFAULT_INSTALLER_TIMEOUT_SECS
    )]
    installer_timeout: u64,
    /// Program used for administrative extraction of installer packages.
    #[arg(long = "installer", env = "APPSTAGE_INSTALLER", default_value = appstage_stage::DEFAULT_INSTALLER_PROGRAM)]
    installer_program: String,
    /// Log level used when RUST_LOG is not set.
    #[arg(long, env = "APPSTAGE_LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    /// Log line format.
    #[arg(long, env = "APPSTAGE_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    log_format: LogFormatArg,
    /// Run report format written to stdout.
    #[arg(long = "output", alias = "format", value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Write Prometheus text metrics to this file after the run.
    #[arg(long, env = "APPSTAGE_METRICS_FILE")]
    metrics_file: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Json => Self::Json,
        }
    }
}

impl Cli {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            base_dir: self.base_dir.clone(),
            force_refresh: self.force,
            reuse_archive: self.reuse_archive,
            version_override: self
                .version_override
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            http_timeout: Duration::from_secs(self.http_timeout),
            download_idle_timeout: Duration::from_secs(self.download_idle_timeout),
            installer_timeout: Duration::from_secs(self.installer_timeout),
            installer_program: self.installer_program.clone(),
        }
    }
}

/// Parse arguments, stage the described application and return the exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.into(),
    };
    if let Err(err) = init_logging(&logging) {
        let err = AppError::telemetry("init_logging", err);
        eprintln!("error: {}", err.display_message());
        return err.exit_code();
    }

    let metrics = match Metrics::new() {
        Ok(metrics) => metrics,
        Err(err) => {
            let err = AppError::telemetry("metrics", err);
            error!(error = %err.display_message(), "run failed");
            return err.exit_code();
        }
    };

    let result = execute(&cli, metrics.clone()).await;
    if let Some(path) = &cli.metrics_file
        && let Err(err) = metrics.write_textfile(path)
    {
        let err = AppError::telemetry("metrics.write", err);
        error!(error = %err.display_message(), path = %path.display(), "failed to write metrics file");
    }

    match result {
        Ok(report) => match render_report(&report, cli.output) {
            Ok(text) => {
                println!("{text}");
                info!(outcome = report.outcome.as_str(), "run succeeded");
                0
            }
            Err(err) => {
                error!(error = %err, "failed to render run report");
                FailureKind::Internal.exit_code()
            }
        },
        Err(err) => {
            let kind = err.kind();
            error!(
                kind = kind.as_str(),
                exit_code = kind.exit_code(),
                error = %err.display_message(),
                detail = ?err,
                "run failed"
            );
            kind.exit_code()
        }
    }
}

async fn execute(cli: &Cli, metrics: Metrics) -> AppResult<RunReport> {
    let descriptor = load_descriptor(&cli.config)
        .map_err(|source| AppError::config("load_descriptor", source))?;
    let options = cli.run_options();
    info!(
        config = %cli.config.display(),
        base_dir = %options.base_dir.display(),
        force_refresh = options.force_refresh,
        reuse_archive = options.reuse_archive,
        "starting run"
    );
    let orchestrator = Orchestrator::from_options(&options, metrics)?;
    orchestrator.run(&descriptor, &options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_map_onto_run_options() {
        let cli = Cli::parse_from([
            "appstage",
            "--force",
            "--reuse-archive",
            "--dir",
            "/tmp/stage",
            "--version-override",
            " 2.0 ",
            "--http-timeout",
            "5",
            "--installer",
            "wine-msiexec",
            "--output",
            "json",
            "app.json",
        ]);
        let options = cli.run_options();
        assert!(options.force_refresh);
        assert!(options.reuse_archive);
        assert_eq!(options.base_dir, PathBuf::from("/tmp/stage"));
        assert_eq!(options.version_override.as_deref(), Some("2.0"));
        assert_eq!(options.http_timeout, Duration::from_secs(5));
        assert_eq!(options.installer_program, "wine-msiexec");
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.config, PathBuf::from("app.json"));
    }

    #[test]
    fn defaults_are_applied() {
        let cli = Cli::parse_from(["appstage", "app.json"]);
        let options = cli.run_options();
        assert!(!options.force_refresh);
        assert_eq!(options.base_dir, PathBuf::from("."));
        assert_eq!(options.installer_program, "msiexec");
        assert_eq!(
            options.download_idle_timeout,
            Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS)
        );
        assert_eq!(cli.log_format, LogFormatArg::Pretty);
    }
}
