//! Owner-only permission handling for sensitive documents.

use std::path::Path;

use super::FileSystem;

/// Mode applied by secure writes.
pub const SECURE_MODE: u32 = 0o600;

/// Outcome of [`check_file_permissions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionCheck {
    pub ok: bool,
    /// Which bits are too open, when `ok` is false.
    pub warning: Option<String>,
}

/// Inspect permission bits for group/other access.
///
/// File-type bits above `0o777` are ignored.
pub fn check_file_permissions(mode: u32) -> PermissionCheck {
    let mode = mode & 0o777;
    let mut issues = Vec::new();

    if mode & 0o002 != 0 {
        issues.push("world-writable");
    }
    if mode & 0o004 != 0 {
        issues.push("world-readable");
    }
    if mode & 0o020 != 0 {
        issues.push("group-writable");
    }
    if mode & 0o040 != 0 {
        issues.push("group-readable");
    }

    if issues.is_empty() {
        PermissionCheck {
            ok: true,
            warning: None,
        }
    } else {
        PermissionCheck {
            ok: false,
            warning: Some(format!(
                "File has permissions {:04o} ({}); expected {:04o}",
                mode,
                issues.join(", "),
                SECURE_MODE
            )),
        }
    }
}

/// Restrict `path` to owner read/write.
pub fn set_secure_permissions(fs: &dyn FileSystem, path: &Path) -> std::io::Result<()> {
    fs.set_mode(path, SECURE_MODE)
}
