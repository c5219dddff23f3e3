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

//! Network collaborators of a staging run: version resolution and archive download.
//!
//! Layout: `client.rs` (HTTP client with bounded timeouts), `version.rs`
//! (explicit/override/remote version resolution), `download.rs` (reuse-or-download
//! of the local archive), `error.rs` (`FetchError`).

pub mod client;
pub mod download;
pub mod error;
pub mod version;

pub use client::{FetchSettings, HttpFetcher};
pub use download::{DownloadOutcome, ensure_local_archive};
pub use error::{FetchError, FetchResult};
pub use version::{
    ResolvedVersion, VersionSource, compile_version_pattern, extract_version, resolve_version,
    scrape_version,
};
