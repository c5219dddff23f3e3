//! Typed application descriptor.
//!
//! # Design
//! - The descriptor is immutable once loaded; per-run state lives with the orchestrator.
//! - Name and URL templates are rendered on demand for a resolved version.

use indexmap::IndexMap;
use serde::Serialize;

/// Placeholder substituted with the resolved version in name and URL templates.
pub const VERSION_PLACEHOLDER: &str = "{{VERSION}}";
/// Single-brace placeholder accepted from older descriptors.
pub const LEGACY_VERSION_PLACEHOLDER: &str = "{VERSION}";

/// Remote page scrape used to discover the current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionCheck {
    /// Page that advertises the current version.
    pub url: String,
    /// Regular expression whose first capture group is the version.
    pub pattern: String,
    /// Prefer the scraped version over an explicit one.
    pub use_latest_version: bool,
}

/// Archive formats the extraction engine knows how to unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    /// Zip archive read in-process.
    Zip,
    /// Installer package unpacked by an external tool in administrative mode.
    InstallerPackage,
}

impl ArchiveKind {
    /// Map a download extension (the leading dot is optional here) to an archive kind.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        let normalized = extension.trim().trim_start_matches('.').to_ascii_lowercase();
        match normalized.as_str() {
            "zip" => Some(Self::Zip),
            "msi" => Some(Self::InstallerPackage),
            _ => None,
        }
    }

    /// Stable label used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::InstallerPackage => "installer_package",
        }
    }
}

/// Declarative description of one portable application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppDescriptor {
    /// Folder name template, may contain the version placeholder.
    pub name: String,
    /// Download extension including the leading dot (`.zip`, `.msi`).
    pub archive_extension: String,
    /// Version pinned by the descriptor.
    pub explicit_version: Option<String>,
    /// Remote version scrape.
    pub version_check: Option<VersionCheck>,
    /// Whether the archive's top-level directory is stripped away.
    pub remove_root_folder: bool,
    /// Literal root folder name used instead of the discovered one.
    pub root_folder_name: Option<String>,
    /// Final folder name used instead of the rendered `name`.
    pub explicit_folder_name: Option<String>,
    /// Download URL template.
    pub download_url: String,
    /// Entry admission patterns, joined into one alternation.
    pub extract_patterns: Vec<String>,
    /// Folders created inside the working folder after extraction.
    pub create_folders: Vec<String>,
    /// Files written inside the working folder, keyed by relative path.
    pub create_files: IndexMap<String, String>,
    /// Renames applied inside the working folder, keyed by destination.
    pub move_objects: IndexMap<String, String>,
}

impl AppDescriptor {
    /// Supported archive kind for the configured extension.
    #[must_use]
    pub fn archive_kind(&self) -> Option<ArchiveKind> {
        ArchiveKind::from_extension(&self.archive_extension)
    }

    /// Rendered folder name (`name` with the version substituted).
    #[must_use]
    pub fn folder_name(&self, version: &str) -> String {
        render_version(&self.name, version)
    }

    /// Local archive file name: folder name followed by the extension.
    #[must_use]
    pub fn archive_file_name(&self, version: &str) -> String {
        format!("{}{}", self.folder_name(version), self.archive_extension)
    }

    /// Name of the promoted folder.
    #[must_use]
    pub fn final_folder_name(&self, version: &str) -> String {
        self.explicit_folder_name.as_deref().map_or_else(
            || self.folder_name(version),
            |explicit| render_version(explicit, version),
        )
    }

    /// Download URL with the version substituted.
    #[must_use]
    pub fn download_url_for(&self, version: &str) -> String {
        render_version(&self.download_url, version)
    }
}

/// Substitute every version placeholder in `template`.
#[must_use]
pub fn render_version(template: &str, version: &str) -> String {
    template
        .replace(VERSION_PLACEHOLDER, version)
        .replace(LEGACY_VERSION_PLACEHOLDER, version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> AppDescriptor {
        AppDescriptor {
            name: "App-{{VERSION}}".to_string(),
            archive_extension: ".zip".to_string(),
            explicit_version: Some("1.2".to_string()),
            version_check: None,
            remove_root_folder: true,
            root_folder_name: None,
            explicit_folder_name: None,
            download_url: "https://x/{{VERSION}}.zip".to_string(),
            extract_patterns: vec![r"\.exe$".to_string()],
            create_folders: Vec::new(),
            create_files: IndexMap::new(),
            move_objects: IndexMap::new(),
        }
    }

    #[test]
    fn templates_render_for_version() {
        let descriptor = descriptor();
        assert_eq!(descriptor.folder_name("1.2"), "App-1.2");
        assert_eq!(descriptor.archive_file_name("1.2"), "App-1.2.zip");
        assert_eq!(descriptor.download_url_for("1.2"), "https://x/1.2.zip");
        assert_eq!(descriptor.final_folder_name("1.2"), "App-1.2");
    }

    #[test]
    fn explicit_folder_name_overrides_rendered_name() {
        let mut descriptor = descriptor();
        descriptor.explicit_folder_name = Some("App".to_string());
        assert_eq!(descriptor.final_folder_name("1.2"), "App");
        assert_eq!(descriptor.archive_file_name("1.2"), "App-1.2.zip");
    }

    #[test]
    fn legacy_placeholder_is_substituted() {
        assert_eq!(render_version("Appv{VERSION}", "3"), "Appv3");
        assert_eq!(render_version("no-token", "3"), "no-token");
    }

    #[test]
    fn archive_kind_from_extension() {
        assert_eq!(ArchiveKind::from_extension(".zip"), Some(ArchiveKind::Zip));
        assert_eq!(ArchiveKind::from_extension("ZIP"), Some(ArchiveKind::Zip));
        assert_eq!(
            ArchiveKind::from_extension(".msi"),
            Some(ArchiveKind::InstallerPackage)
        );
        assert_eq!(ArchiveKind::from_extension(".7z"), None);
        assert_eq!(ArchiveKind::from_extension(""), None);
    }
}
