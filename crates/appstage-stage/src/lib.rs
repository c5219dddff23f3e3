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

//! Filesystem stages of a run: entry filtering, extraction, post-processing and
//! promotion of the working folder.
//!
//! Layout: `filter.rs` (combined entry pattern), `extract.rs` (zip and
//! installer-package branches), `installer.rs` (external administrative
//! extraction seam), `postprocess.rs` (folders, files, renames), `promote.rs`
//! (final rename), `paths.rs` (relative path sanitising), `error.rs`.

pub mod error;
pub mod extract;
pub mod filter;
pub mod installer;
mod paths;
pub mod postprocess;
pub mod promote;

pub use error::{StageError, StageResult};
pub use extract::{ExtractRequest, Extraction, discover_root_folder, extract_archive};
pub use filter::EntryFilter;
pub use installer::{DEFAULT_INSTALLER_PROGRAM, MsiExec, PackageInstaller};
pub use postprocess::{
    PostProcessSummary, apply_post_processing, create_files, create_folders, move_objects,
};
pub use promote::{Promotion, promote};
