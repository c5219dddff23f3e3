//! JSON descriptor loader.
//!
//! # Design
//! - Accept the nested `VersionCheck` shape and the older flat shape
//!   (`ExplicitVersion`, `VersionUrl`, `VersionRegEx`, `CreateWorkingFolder`).
//! - When both shapes provide a value the nested one wins.
//! - Blank strings are treated as absent.
//! - `DownloadExtension` is stored with a leading dot.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{AppDescriptor, VersionCheck};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RawDescriptor {
    application_name: String,
    download_extension: String,
    version: Option<String>,
    explicit_version: Option<String>,
    version_check: Option<RawVersionCheck>,
    version_url: Option<String>,
    version_reg_ex: Option<String>,
    remove_root_folder: Option<bool>,
    create_working_folder: Option<bool>,
    root_folder_name: Option<String>,
    folder_name: Option<String>,
    explicit_folder_name: Option<String>,
    download_url: String,
    extract_reg_ex_list: Vec<String>,
    create_folders: Vec<String>,
    create_files: IndexMap<String, String>,
    move_objects: IndexMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RawVersionCheck {
    url: String,
    reg_ex: String,
    use_latest_version: bool,
}

/// Read and decode a descriptor file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::Json`] when it is not a valid descriptor document.
pub fn load_descriptor(path: &Path) -> ConfigResult<AppDescriptor> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "load_descriptor.read",
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawDescriptor = serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
        path: Some(path.to_path_buf()),
        source,
    })?;
    debug!(path = %path.display(), "loaded application descriptor");
    Ok(normalize(raw))
}

/// Decode a descriptor from an in-memory JSON document.
///
/// # Errors
///
/// Returns [`ConfigError::Json`] when the document is not a valid descriptor.
pub fn parse_descriptor(json: &str) -> ConfigResult<AppDescriptor> {
    let raw: RawDescriptor =
        serde_json::from_str(json).map_err(|source| ConfigError::Json { path: None, source })?;
    Ok(normalize(raw))
}

fn normalize(raw: RawDescriptor) -> AppDescriptor {
    let version_check = raw
        .version_check
        .and_then(|check| {
            if check.url.trim().is_empty() && check.reg_ex.trim().is_empty() {
                return None;
            }
            Some(VersionCheck {
                url: check.url.trim().to_string(),
                pattern: check.reg_ex,
                use_latest_version: check.use_latest_version,
            })
        })
        .or_else(|| {
            let url = present(raw.version_url);
            let pattern = present(raw.version_reg_ex);
            if url.is_none() && pattern.is_none() {
                return None;
            }
            Some(VersionCheck {
                url: url.unwrap_or_default().trim().to_string(),
                pattern: pattern.unwrap_or_default(),
                use_latest_version: false,
            })
        });

    let remove_root_folder = raw
        .remove_root_folder
        .or_else(|| raw.create_working_folder.map(|create| !create))
        .unwrap_or(false);

    AppDescriptor {
        name: raw.application_name,
        archive_extension: normalize_extension(&raw.download_extension),
        explicit_version: present(raw.version)
            .or_else(|| present(raw.explicit_version))
            .map(|version| version.trim().to_string()),
        version_check,
        remove_root_folder,
        root_folder_name: present(raw.root_folder_name),
        explicit_folder_name: present(raw.folder_name).or_else(|| present(raw.explicit_folder_name)),
        download_url: raw.download_url.trim().to_string(),
        extract_patterns: raw.extract_reg_ex_list,
        create_folders: raw.create_folders,
        create_files: raw.create_files,
        move_objects: raw.move_objects,
    }
}

fn normalize_extension(extension: &str) -> String {
    let extension = extension.trim();
    if extension.is_empty() || extension.starts_with('.') {
        extension.to_string()
    } else {
        format!(".{extension}")
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}
