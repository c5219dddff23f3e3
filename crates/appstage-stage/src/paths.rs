use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::path::{Component, Path, PathBuf};

use crate::error::{StageError, StageResult};

/// Normalise a relative path, rejecting anything that would leave its root.
pub(crate) fn sanitize_relative(field: &'static str, value: &str) -> StageResult<PathBuf> {
    let path = Path::new(value);
    if path.is_absolute() {
        return Err(StageError::UnsafeEntry {
            field,
            reason: "absolute_path",
            value: value.to_string(),
        });
    }

    let mut sanitized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(segment) => sanitized.push(segment),
            Component::CurDir => {}
            _ => {
                return Err(StageError::UnsafeEntry {
                    field,
                    reason: "invalid_segment",
                    value: value.to_string(),
                });
            }
        }
    }
    if sanitized.as_os_str().is_empty() {
        return Err(StageError::UnsafeEntry {
            field,
            reason: "empty_path",
            value: value.to_string(),
        });
    }

    Ok(sanitized)
}

/// Give the owner write access to an existing read-only file so it can be replaced.
///
/// Missing paths are left alone.
pub(crate) fn make_writable(operation: &'static str, path: &Path) -> StageResult<()> {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    if !metadata.is_file() || !metadata.permissions().readonly() {
        return Ok(());
    }
    let mut permissions = metadata.permissions();
    #[cfg(unix)]
    permissions.set_mode(permissions.mode() | 0o200);
    #[cfg(not(unix))]
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
    fs::set_permissions(path, permissions).map_err(|err| StageError::io(operation, path, err))
}

/// Render a path relative to its walk root with forward slashes.
pub(crate) fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(segment) => Some(segment.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
