//! Pre-flight descriptor checks.
//!
//! Everything here runs before the first network request or filesystem
//! mutation, so a rejected descriptor never leaves partial state behind.

use std::path::{Component, Path};

use crate::error::{ConfigError, ConfigResult};
use crate::model::{AppDescriptor, ArchiveKind};

/// Validate a descriptor and return the archive kind it selects.
///
/// `has_version_override` reports whether the caller supplies a version at
/// invocation time, which satisfies the version-source requirement on its own.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for blank or inconsistent fields,
/// [`ConfigError::UnsupportedExtension`] for unknown download extensions, and
/// [`ConfigError::MissingVersionSource`] when no version can be determined.
pub fn validate_descriptor(
    descriptor: &AppDescriptor,
    has_version_override: bool,
) -> ConfigResult<ArchiveKind> {
    if descriptor.name.trim().is_empty() {
        return Err(ConfigError::invalid("ApplicationName", "blank", None));
    }
    if descriptor.download_url.trim().is_empty() {
        return Err(ConfigError::invalid("DownloadUrl", "blank", None));
    }

    let kind = descriptor
        .archive_kind()
        .ok_or_else(|| ConfigError::UnsupportedExtension {
            value: descriptor.archive_extension.clone(),
        })?;
    if !descriptor.archive_extension.starts_with('.') {
        return Err(ConfigError::invalid(
            "DownloadExtension",
            "missing_leading_dot",
            Some(&descriptor.archive_extension),
        ));
    }

    if let Some(check) = &descriptor.version_check {
        if check.url.is_empty() {
            return Err(ConfigError::invalid("VersionCheck.Url", "blank", None));
        }
        if check.pattern.trim().is_empty() {
            return Err(ConfigError::invalid("VersionCheck.RegEx", "blank", None));
        }
    }

    if descriptor.explicit_version.is_none()
        && descriptor.version_check.is_none()
        && !has_version_override
    {
        return Err(ConfigError::MissingVersionSource);
    }

    if kind == ArchiveKind::InstallerPackage {
        if !descriptor.remove_root_folder {
            return Err(ConfigError::invalid(
                "RemoveRootFolder",
                "required_for_installer_package",
                Some("false"),
            ));
        }
        if descriptor.root_folder_name.is_none() {
            return Err(ConfigError::invalid(
                "RootFolderName",
                "required_for_installer_package",
                None,
            ));
        }
    }

    for (field, value) in descriptor
        .create_folders
        .iter()
        .map(|folder| ("CreateFolders", folder))
        .chain(descriptor.create_files.keys().map(|path| ("CreateFiles", path)))
        .chain(descriptor.move_objects.iter().flat_map(|(destination, source)| {
            [("MoveObjects", destination), ("MoveObjects", source)]
        }))
    {
        if value.trim().is_empty() {
            return Err(ConfigError::invalid(field, "blank_path", None));
        }
    }

    Ok(kind)
}

/// Check a resolved version and the names rendered from it.
///
/// The version ends up in file and folder names under the staging directory,
/// so it must not contain separators, parent references or drive prefixes, and
/// every rendered name must be a single plain path component.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] naming the offending field.
pub fn validate_rendered_names(descriptor: &AppDescriptor, version: &str) -> ConfigResult<()> {
    if version.trim().is_empty() {
        return Err(ConfigError::invalid("Version", "blank", None));
    }
    if !is_single_component(version) {
        return Err(ConfigError::invalid(
            "Version",
            "not_a_path_component",
            Some(version),
        ));
    }

    for (field, name) in [
        ("ApplicationName", descriptor.folder_name(version)),
        ("DownloadExtension", descriptor.archive_file_name(version)),
        ("FolderName", descriptor.final_folder_name(version)),
    ] {
        if !is_single_component(&name) {
            return Err(ConfigError::invalid(field, "not_a_path_component", Some(&name)));
        }
    }
    Ok(())
}

fn is_single_component(value: &str) -> bool {
    if value.contains(['/', '\\', ':']) || value.contains("..") {
        return false;
    }
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
