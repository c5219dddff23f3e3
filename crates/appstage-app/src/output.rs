//! Report renderers.

use clap::ValueEnum;

use appstage_telemetry::ByteSize;

use crate::report::RunReport;

/// Output format for the run report.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned key/value lines followed by a step table.
    #[default]
    Table,
    /// Pretty-printed JSON document.
    Json,
}

/// Render `report` in the requested format.
///
/// # Errors
///
/// Returns an error when JSON serialization fails.
pub fn render_report(report: &RunReport, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report),
        OutputFormat::Table => Ok(render_table(report)),
    }
}

fn render_table(report: &RunReport) -> String {
    let mut lines = vec![
        format!("outcome:      {}", report.outcome.as_str()),
        format!("application:  {}", report.application),
        format!(
            "version:      {} ({})",
            report.version, report.version_source
        ),
        format!("archive:      {}", report.archive_path.display()),
        format!(
            "downloaded:   {}{}",
            ByteSize(report.bytes_downloaded),
            if report.archive_reused { " (reused)" } else { "" }
        ),
        format!("final folder: {}", report.final_folder.display()),
    ];
    if !report.steps.is_empty() {
        lines.push(String::new());
        lines.push(format!("{:<16} {:<10} DETAIL", "STEP", "STATUS"));
        lines.extend(report.steps.iter().map(|step| {
            format!(
                "{:<16} {:<10} {}",
                step.name,
                step.status.as_str(),
                step.detail.as_deref().unwrap_or("-")
            )
        }));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
