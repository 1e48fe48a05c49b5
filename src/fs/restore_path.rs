//! Restore-destination safety validation.
//!
//! A quarantined file must never be restored into a system directory, and
//! the destination string itself must be clean enough to appear in logs
//! and process arguments. The check runs on the *resolved* path, following
//! symlinks, so a destination like `/bin/x` is rejected even on usr-merged
//! systems where `/bin` is a symlink into `/usr`.
//!
//! Validation is applied identically whether the destination comes from a
//! trusted caller or from stored metadata that could have been corrupted
//! or tampered with.

use crate::core::error::{FileOperationError, FileOperationResult};

use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// Directories a restore may never target, directly or nested.
pub const PROTECTED_ROOTS: &[&str] = &[
    "/etc", "/var", "/usr", "/bin", "/sbin", "/lib", "/lib64", "/boot", "/root", "/sys", "/proc",
];

/// Protected roots with their symlink-resolved counterparts, detected once
/// per process.
static RESOLVED_ROOTS: OnceLock<Vec<PathBuf>> = OnceLock::new();

fn resolved_roots() -> &'static [PathBuf] {
    RESOLVED_ROOTS.get_or_init(|| {
        let mut roots: Vec<PathBuf> = PROTECTED_ROOTS.iter().map(PathBuf::from).collect();
        for literal in PROTECTED_ROOTS {
            if let Ok(resolved) = Path::new(literal).canonicalize() {
                if !roots.contains(&resolved) {
                    roots.push(resolved);
                }
            }
        }
        roots
    })
}

/// Resolves the protected-root set.
///
/// Called once at handler construction; subsequent calls are no-ops. The
/// set is never re-detected after initialization.
pub fn init_protected_roots() {
    let _ = resolved_roots();
}

/// Validates a restore destination, returning its resolved absolute form.
///
/// Rejects empty or whitespace-only input, control bytes that would enable
/// argument or log injection, and any destination that resolves to (or
/// under) a protected system root. A destination that does not exist yet
/// is accepted as long as its resolved location is safe; parent
/// directories are created on demand by the restore itself.
pub fn validate_restore_path(path: &str) -> FileOperationResult<PathBuf> {
    if path.trim().is_empty() {
        return Err(FileOperationError::invalid_restore_path(
            path,
            "path is empty",
        ));
    }

    if path.bytes().any(|b| b == 0 || b == b'\n' || b == b'\r') {
        return Err(FileOperationError::invalid_restore_path(
            path.replace(['\n', '\r', '\0'], "?"),
            "path contains control bytes",
        ));
    }

    let resolved = resolve_path(Path::new(path)).map_err(|e| {
        FileOperationError::invalid_restore_path(path, format!("cannot resolve path: {}", e))
    })?;

    for root in resolved_roots() {
        if resolved == *root || resolved.starts_with(root) {
            return Err(FileOperationError::invalid_restore_path(
                path,
                format!("destination is inside protected directory {}", root.display()),
            ));
        }
    }

    Ok(resolved)
}

/// Resolves a path to canonical absolute form, following symlinks.
///
/// Unlike `std::fs::canonicalize`, this also works for paths that do not
/// exist yet: the nearest existing ancestor is canonicalized and the
/// remaining components are normalized lexically on top of it. The
/// non-existing suffix cannot contain symlinks, so the result is the path
/// the kernel would resolve once those components are created.
pub fn resolve_path(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    if let Ok(resolved) = absolute.canonicalize() {
        return Ok(resolved);
    }

    // Find the deepest existing ancestor.
    let mut existing = absolute.as_path();
    while !existing.exists() {
        existing = existing.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no existing root")
        })?;
    }

    let mut resolved = existing.canonicalize()?;
    let remainder = absolute.strip_prefix(existing).map_err(|_| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "ancestor is not a prefix")
    })?;

    for component in remainder.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(part) => resolved.push(part),
            Component::RootDir | Component::Prefix(_) => {}
        }
    }

    Ok(resolved)
}
