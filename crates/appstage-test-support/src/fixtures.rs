//! Test fixtures: scratch directories, zip archives, and descriptors.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use appstage_config::AppDescriptor;
use indexmap::IndexMap;
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::FileOptions;

/// One entry written by [`write_zip_archive`].
#[derive(Debug, Clone, Copy)]
pub enum ZipEntry<'a> {
    /// Regular file with its contents.
    File(&'a str, &'a [u8]),
    /// Regular file stored with explicit Unix permission bits.
    FileWithMode(&'a str, &'a [u8], u32),
    /// Explicit directory entry (name should end with `/`).
    Dir(&'a str),
}

/// Create a scratch directory that is removed when dropped.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn temp_dir() -> Result<TempDir> {
    Ok(tempfile::Builder::new().prefix("appstage-").tempdir()?)
}

/// Write a zip archive containing `entries` in the given order.
///
/// # Errors
///
/// Returns an error if the archive cannot be created or written.
pub fn write_zip_archive(archive: &Path, entries: &[ZipEntry<'_>]) -> Result<()> {
    let file = File::create(archive)?;
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default();
    for entry in entries {
        match entry {
            ZipEntry::File(path, contents) => {
                zip.start_file(*path, options)?;
                zip.write_all(contents)?;
            }
            ZipEntry::FileWithMode(path, contents, mode) => {
                zip.start_file(*path, options.unix_permissions(*mode))?;
                zip.write_all(contents)?;
            }
            ZipEntry::Dir(path) => {
                zip.add_directory(*path, options)?;
            }
        }
    }
    zip.finish()?;
    Ok(())
}

/// Descriptor for a zip download with an explicit version and no post-processing.
#[must_use]
pub fn zip_descriptor(name: &str, version: &str, download_url: &str) -> AppDescriptor {
    AppDescriptor {
        name: name.to_string(),
        archive_extension: ".zip".to_string(),
        explicit_version: Some(version.to_string()),
        version_check: None,
        remove_root_folder: true,
        root_folder_name: None,
        explicit_folder_name: None,
        download_url: download_url.to_string(),
        extract_patterns: vec![".*".to_string()],
        create_folders: Vec::new(),
        create_files: IndexMap::new(),
        move_objects: IndexMap::new(),
    }
}
