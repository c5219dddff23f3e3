//! Extraction engine.
//!
//! # Design
//! - Zip archives are read entry by entry in archive order; only entries
//!   selected by the [`EntryFilter`] are written, later duplicates overwrite.
//! - With `remove_root_folder` the archive's own root directory becomes the
//!   working folder; otherwise entries land under `<folder>_staging`.
//! - Installer packages are unpacked through a [`PackageInstaller`] into
//!   `<folder>_staging`, selected files are moved into `<folder>_staging_temp`,
//!   and the unpack target is removed.
//! - With `clean_stale`, folders left behind by an earlier interrupted run are
//!   removed before anything is written.

use std::fs::{self, File};
use std::io;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::ZipArchive;

use appstage_config::ArchiveKind;

use crate::error::{StageError, StageResult};
use crate::filter::EntryFilter;
use crate::installer::PackageInstaller;
use crate::paths::{make_writable, sanitize_relative, slash_path};

const STAGING_SUFFIX: &str = "_staging";
const RELOCATION_SUFFIX: &str = "_temp";

/// Inputs for one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractRequest<'a> {
    /// Local archive to read.
    pub archive: &'a Path,
    /// Format selected from the descriptor's extension.
    pub kind: ArchiveKind,
    /// Directory that receives the staging folders.
    pub base_dir: &'a Path,
    /// Rendered application folder name.
    pub folder_name: &'a str,
    /// Whether the archive's root directory becomes the working folder.
    pub remove_root_folder: bool,
    /// Explicit root directory name inside the archive.
    pub root_folder_name: Option<&'a str>,
    /// Entry selection.
    pub filter: &'a EntryFilter,
    /// Remove leftovers of earlier runs before extracting.
    pub clean_stale: bool,
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Folder holding the extracted content for the following stages.
    pub working_folder: PathBuf,
    /// Entries (files and directories) written.
    pub written: usize,
    /// Entries not selected by the filter.
    pub skipped: usize,
}

/// Extract `request.archive` according to its kind.
///
/// # Errors
///
/// Returns archive, root-folder, filesystem and installer errors from the
/// selected branch.
pub async fn extract_archive(
    request: &ExtractRequest<'_>,
    installer: &dyn PackageInstaller,
) -> StageResult<Extraction> {
    match request.kind {
        ArchiveKind::Zip => extract_zip(request),
        ArchiveKind::InstallerPackage => extract_installer_package(request, installer).await,
    }
}

/// First path segment of the archive's first entry.
///
/// # Errors
///
/// Returns [`StageError::RootFolderNotFound`] for an empty archive.
pub fn discover_root_folder<R: io::Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    path: &Path,
) -> StageResult<String> {
    if archive.is_empty() {
        return Err(StageError::RootFolderNotFound {
            path: path.to_path_buf(),
        });
    }
    let first = archive
        .by_index(0)
        .map_err(|source| StageError::ArchiveEntry {
            path: path.to_path_buf(),
            index: 0,
            source,
        })?;
    let root = first.name().split('/').next().unwrap_or_default().to_string();
    if root.is_empty() {
        return Err(StageError::RootFolderNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(root)
}

fn staging_folder(base_dir: &Path, folder_name: &str) -> PathBuf {
    base_dir.join(format!("{folder_name}{STAGING_SUFFIX}"))
}

fn relocation_folder(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(RELOCATION_SUFFIX);
    PathBuf::from(name)
}

fn remove_stale(path: &Path) -> StageResult<()> {
    if path.exists() {
        info!(path = %path.display(), "removing stale staging folder");
        fs::remove_dir_all(path).map_err(|err| StageError::io("extract.remove_stale", path, err))?;
    }
    Ok(())
}

fn extract_zip(request: &ExtractRequest<'_>) -> StageResult<Extraction> {
    let archive_path = request.archive;
    let file = File::open(archive_path).map_err(|source| StageError::ArchiveOpen {
        path: archive_path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| StageError::ArchiveDecode {
        path: archive_path.to_path_buf(),
        source,
    })?;

    let (extraction_root, working_folder) = if request.remove_root_folder {
        let root = match request.root_folder_name {
            Some(name) => name.to_string(),
            None => discover_root_folder(&mut archive, archive_path)?,
        };
        let root = sanitize_relative("root_folder_name", &root)?;
        debug!(root = %root.display(), "using archive root folder");
        (request.base_dir.to_path_buf(), request.base_dir.join(root))
    } else {
        let working = staging_folder(request.base_dir, request.folder_name);
        (working.clone(), working)
    };

    if request.clean_stale {
        remove_stale(&working_folder)?;
    }
    fs::create_dir_all(&working_folder)
        .map_err(|err| StageError::io("extract_zip.create_working", &working_folder, err))?;

    let mut written = 0;
    let mut skipped = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|source| StageError::ArchiveEntry {
                path: archive_path.to_path_buf(),
                index,
                source,
            })?;
        if !request.filter.is_match(entry.name()) {
            skipped += 1;
            continue;
        }
        let destination = extraction_root.join(sanitize_relative("archive_entry", entry.name())?);

        if entry.is_dir() {
            fs::create_dir_all(&destination)
                .map_err(|err| StageError::io("extract_zip.create_dir", &destination, err))?;
            written += 1;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| StageError::io("extract_zip.create_parent", parent, err))?;
        }
        make_writable("extract_zip.unlock", &destination)?;
        let mut output = File::create(&destination)
            .map_err(|err| StageError::io("extract_zip.create_file", &destination, err))?;
        io::copy(&mut entry, &mut output)
            .map_err(|err| StageError::io("extract_zip.copy", &destination, err))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            fs::set_permissions(&destination, fs::Permissions::from_mode(mode))
                .map_err(|err| StageError::io("extract_zip.set_permissions", &destination, err))?;
        }
        written += 1;
    }

    info!(
        working_folder = %working_folder.display(),
        written,
        skipped,
        "zip extraction finished"
    );
    Ok(Extraction {
        working_folder,
        written,
        skipped,
    })
}

async fn extract_installer_package(
    request: &ExtractRequest<'_>,
    installer: &dyn PackageInstaller,
) -> StageResult<Extraction> {
    let root_name = request
        .root_folder_name
        .filter(|name| request.remove_root_folder && !name.trim().is_empty())
        .ok_or(StageError::MissingInput {
            field: "root_folder_name",
        })?;
    let root_name = sanitize_relative("root_folder_name", root_name)?;

    let target = staging_folder(request.base_dir, request.folder_name);
    let relocation = relocation_folder(&target);
    if request.clean_stale {
        remove_stale(&target)?;
        remove_stale(&relocation)?;
    }

    fs::create_dir(&target)
        .map_err(|err| StageError::io("extract_installer.create_target", &target, err))?;
    let absolute_target = std::path::absolute(&target)
        .map_err(|err| StageError::io("extract_installer.absolute_target", &target, err))?;
    let absolute_package = std::path::absolute(request.archive)
        .map_err(|err| StageError::io("extract_installer.absolute_package", request.archive, err))?;

    installer
        .administrative_extract(&absolute_package, &absolute_target)
        .await?;

    let package_root = target.join(&root_name);
    let mut selected = Vec::new();
    let mut skipped = 0;
    for entry in WalkDir::new(&package_root) {
        let entry =
            entry.map_err(|err| StageError::walkdir("extract_installer.walk", &package_root, err))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(&package_root)
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if request.filter.is_match(&slash_path(&relative)) {
            selected.push(relative);
        } else {
            skipped += 1;
        }
    }

    fs::create_dir_all(&relocation)
        .map_err(|err| StageError::io("extract_installer.create_relocation", &relocation, err))?;
    for relative in &selected {
        let source = package_root.join(relative);
        let destination = relocation.join(relative);
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| StageError::io("extract_installer.create_parent", parent, err))?;
        }
        fs::rename(&source, &destination)
            .map_err(|err| StageError::io("extract_installer.relocate", &source, err))?;
    }

    fs::remove_dir_all(&target)
        .map_err(|err| StageError::io("extract_installer.remove_target", &target, err))?;

    info!(
        working_folder = %relocation.display(),
        written = selected.len(),
        skipped,
        "installer package extraction finished"
    );
    Ok(Extraction {
        working_folder: relocation,
        written: selected.len(),
        skipped,
    })
}
