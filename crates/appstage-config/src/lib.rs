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

//! Application descriptor model and loader for portable application staging.
//!
//! Layout: `model.rs` (typed descriptor and archive kinds), `loader.rs`
//! (JSON decoding of the nested and legacy flat shapes), `validate.rs`
//! (pre-flight checks run before any I/O), `error.rs` (`ConfigError`).

pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_descriptor, parse_descriptor};
pub use model::{
    AppDescriptor, ArchiveKind, LEGACY_VERSION_PLACEHOLDER, VERSION_PLACEHOLDER, VersionCheck,
    render_version,
};
pub use validate::{validate_descriptor, validate_rendered_names};
