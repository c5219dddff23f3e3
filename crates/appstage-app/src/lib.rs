#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Stages a portable application described by a JSON descriptor: resolves the
//! version, downloads the archive, extracts the selected entries, applies
//! post-processing and promotes the result to its final folder.
//!
//! Layout:
//! - `cli.rs`: argument parsing, logging setup and exit status
//! - `orchestrator.rs`: the run pipeline and per-run options
//! - `steps.rs`: step bookkeeping shared by the pipeline
//! - `report.rs` / `output.rs`: run report and its renderers
//! - `error.rs`: application error and failure categories
//! - `main.rs`: thin entrypoint delegating to `run()`

pub(crate) mod cli;
pub mod error;
pub mod orchestrator;
pub mod output;
pub mod report;
pub mod steps;

pub use cli::run;
pub use error::{AppError, AppResult, FailureKind};
pub use orchestrator::{Orchestrator, RunOptions};
pub use output::{OutputFormat, render_report};
pub use report::{RunOutcome, RunReport};
pub use steps::{StepRecord, StepStatus};
