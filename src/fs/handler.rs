//! The secure file handler: all direct quarantine-directory I/O.
//!
//! This is the only component that touches files inside the quarantine
//! directory. It knows nothing about the metadata store; callers combine
//! the two through the manager.

use crate::core::error::{FileOperationError, FileOperationResult};
use crate::core::hasher::FileHasher;
use crate::fs::restore_path::{self, resolve_path, validate_restore_path};

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Free-space safety margin required on top of the file size before a
/// move into quarantine is attempted.
pub const DISK_SPACE_MARGIN: u64 = 10 * 1024 * 1024;

/// Mode of the quarantine directory: owner rwx only.
const QUARANTINE_DIR_MODE: u32 = 0o700;

/// Mode of files inside quarantine: owner read-only. Also prevents the
/// isolated file from being executed by accident.
const QUARANTINED_FILE_MODE: u32 = 0o400;

/// Mode applied temporarily so a quarantined file can be moved out.
const RELAXED_FILE_MODE: u32 = 0o600;

/// Outcome of a successful move into quarantine.
#[derive(Debug, Clone, PartialEq)]
pub struct QuarantinedFile {
    /// Where the file now lives, inside the quarantine directory.
    pub quarantine_path: PathBuf,
    /// Size in bytes, captured before the move.
    pub file_size: u64,
    /// SHA-256 hex digest, captured before the move.
    pub file_hash: String,
    /// Unix permission bits the file had before the move.
    pub original_permissions: u32,
}

/// Low-level, filesystem-only quarantine primitive.
///
/// Owns the quarantine directory exclusively. Computes content hashes,
/// moves files in and out atomically, enforces restrictive permissions,
/// and validates restore destinations. Has no knowledge of the metadata
/// store.
#[derive(Debug)]
pub struct SecureFileHandler {
    quarantine_dir: PathBuf,
    hasher: FileHasher,
}

impl SecureFileHandler {
    /// Creates a handler for the given quarantine directory.
    ///
    /// The directory is created with mode `0700` if it does not exist.
    /// Protected-root resolution for restore validation happens here,
    /// once per process.
    pub fn new(quarantine_dir: impl Into<PathBuf>) -> FileOperationResult<Self> {
        let quarantine_dir = quarantine_dir.into();
        restore_path::init_protected_roots();

        let handler = Self {
            quarantine_dir,
            hasher: FileHasher::new(),
        };
        handler.ensure_quarantine_dir()?;
        Ok(handler)
    }

    /// Returns the quarantine directory path.
    pub fn quarantine_dir(&self) -> &Path {
        &self.quarantine_dir
    }

    /// Computes the SHA-256 hash of a file, streaming in 64 KiB chunks.
    pub fn calculate_hash(&self, path: &Path) -> FileOperationResult<String> {
        self.hasher.hash_file(path)
    }

    /// Moves a file into quarantine.
    ///
    /// Captures size, permissions, and content hash before the move, then
    /// renames the file to `<16-hex-random>_<basename>` inside the
    /// quarantine directory and locks it down to mode `0400`. The move is
    /// a rename, not a copy: no failure before the rename can leave the
    /// source deleted.
    pub fn move_to_quarantine(
        &self,
        source_path: &Path,
        threat_name: &str,
    ) -> FileOperationResult<QuarantinedFile> {
        let metadata = std::fs::metadata(source_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                FileOperationError::file_not_found(source_path.display().to_string())
            }
            std::io::ErrorKind::PermissionDenied => FileOperationError::permission_denied(
                source_path.display().to_string(),
                e.to_string(),
            ),
            _ => FileOperationError::Io(e),
        })?;

        if !metadata.is_file() {
            return Err(FileOperationError::other(format!(
                "not a regular file: {}",
                source_path.display()
            )));
        }

        let file_size = metadata.len();
        let original_permissions = metadata.permissions().mode() & 0o7777;

        let file_hash = self.calculate_hash(source_path).map_err(|e| {
            FileOperationError::permission_denied(
                source_path.display().to_string(),
                format!("cannot read file for hashing: {}", e),
            )
        })?;

        self.ensure_quarantine_dir()?;
        self.check_disk_space(file_size)?;

        let destination = self.allocate_destination(source_path);

        std::fs::rename(source_path, &destination).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => FileOperationError::permission_denied(
                source_path.display().to_string(),
                e.to_string(),
            ),
            _ => FileOperationError::Io(e),
        })?;

        if let Err(e) =
            std::fs::set_permissions(&destination, std::fs::Permissions::from_mode(QUARANTINED_FILE_MODE))
        {
            // The file is already inside quarantine; report but do not
            // attempt to undo the move here.
            tracing::warn!(
                path = %destination.display(),
                error = %e,
                "failed to lock down quarantined file permissions"
            );
        }

        tracing::info!(
            source = %source_path.display(),
            destination = %destination.display(),
            threat = threat_name,
            size = file_size,
            "file moved into quarantine"
        );

        Ok(QuarantinedFile {
            quarantine_path: destination,
            file_size,
            file_hash,
            original_permissions,
        })
    }

    /// Moves a file out of quarantine back to its original location.
    ///
    /// The destination is validated before any file is touched; a
    /// validation failure short-circuits even the source-existence check.
    pub fn restore_from_quarantine(
        &self,
        quarantine_path: &Path,
        original_path: &str,
        original_permissions: u32,
    ) -> FileOperationResult<()> {
        validate_restore_path(original_path)?;

        if !quarantine_path.exists() {
            return Err(FileOperationError::file_not_found(
                quarantine_path.display().to_string(),
            ));
        }

        let destination = Path::new(original_path);
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if destination.exists() {
            return Err(FileOperationError::AlreadyExists {
                path: original_path.to_string(),
            });
        }

        // The quarantined file is owner read-only; relax it so the rename
        // and subsequent chmod are permitted.
        std::fs::set_permissions(
            quarantine_path,
            std::fs::Permissions::from_mode(RELAXED_FILE_MODE),
        )?;

        std::fs::rename(quarantine_path, destination).map_err(|e| match e.kind() {
            std::io::ErrorKind::PermissionDenied => FileOperationError::permission_denied(
                original_path.to_string(),
                e.to_string(),
            ),
            _ => FileOperationError::Io(e),
        })?;

        std::fs::set_permissions(
            destination,
            std::fs::Permissions::from_mode(original_permissions & 0o7777),
        )?;

        tracing::info!(
            source = %quarantine_path.display(),
            destination = %original_path,
            "file restored from quarantine"
        );

        Ok(())
    }

    /// Permanently removes a file from quarantine. Irreversible.
    ///
    /// The target must resolve to a path inside the quarantine directory;
    /// anything else is treated as a forged or corrupted path and
    /// rejected.
    pub fn delete_from_quarantine(&self, quarantine_path: &Path) -> FileOperationResult<()> {
        let root = resolve_path(&self.quarantine_dir)?;
        let resolved = resolve_path(quarantine_path)?;

        if !resolved.starts_with(&root) || resolved == root {
            return Err(FileOperationError::permission_denied(
                quarantine_path.display().to_string(),
                "path is outside the quarantine directory",
            ));
        }

        if !resolved.exists() {
            return Err(FileOperationError::file_not_found(
                quarantine_path.display().to_string(),
            ));
        }

        std::fs::set_permissions(&resolved, std::fs::Permissions::from_mode(RELAXED_FILE_MODE))?;
        std::fs::remove_file(&resolved)?;

        tracing::info!(
            path = %resolved.display(),
            "file permanently deleted from quarantine"
        );

        Ok(())
    }

    /// Recomputes a file's hash and compares it against the recorded one.
    pub fn verify_file_integrity(
        &self,
        path: &Path,
        expected_hash: &str,
    ) -> FileOperationResult<()> {
        let actual = self.calculate_hash(path)?;
        if actual != expected_hash {
            return Err(FileOperationError::HashMismatch {
                path: path.display().to_string(),
                expected: expected_hash.to_string(),
                actual,
            });
        }
        Ok(())
    }

    fn ensure_quarantine_dir(&self) -> FileOperationResult<()> {
        std::fs::create_dir_all(&self.quarantine_dir)?;
        std::fs::set_permissions(
            &self.quarantine_dir,
            std::fs::Permissions::from_mode(QUARANTINE_DIR_MODE),
        )?;
        Ok(())
    }

    /// Verifies the quarantine filesystem has room for the file plus the
    /// safety margin.
    fn check_disk_space(&self, file_size: u64) -> FileOperationResult<()> {
        let stat = nix::sys::statvfs::statvfs(&self.quarantine_dir)
            .map_err(|e| FileOperationError::other(format!("statvfs failed: {}", e)))?;

        let available = stat.blocks_available() as u64 * stat.fragment_size() as u64;
        let required = file_size + DISK_SPACE_MARGIN;

        if available < required {
            return Err(FileOperationError::DiskFull {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Picks a collision-free destination name: a 16-hex random prefix
    /// keeps names unique, the original basename keeps them identifiable.
    fn allocate_destination(&self, source_path: &Path) -> PathBuf {
        let basename = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("quarantined");

        loop {
            let token = Uuid::new_v4().simple().to_string();
            let candidate = self
                .quarantine_dir
                .join(format!("{}_{}", &token[..16], basename));
            if !candidate.exists() {
                return candidate;
            }
        }
    }
}
