//! Error types for the qvault library.
//!
//! This module provides structured, typed errors for all failure scenarios.
//! The library never panics on untrusted input; all errors are returned as
//! `Result` values.
//!
//! Two error vocabularies exist on purpose: [`FileOperationError`] for the
//! low-level file handler and [`QuarantineError`] for the manager layer,
//! which has additional failure modes (`EntryNotFound`, `AlreadyQuarantined`)
//! that the file layer cannot produce. Both map into the flat
//! [`QuarantineStatus`] taxonomy for UI-facing consumers.

use thiserror::Error;

/// Errors produced by the low-level secure file handler.
#[derive(Debug, Error)]
pub enum FileOperationError {
    /// The file does not exist or is not a regular file.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: String,
    },

    /// The operation was denied by the operating system.
    #[error("permission denied: {path}: {reason}")]
    PermissionDenied {
        /// Path the operation was attempted on.
        path: String,
        /// Human-readable reason.
        reason: String,
    },

    /// Not enough free space in the quarantine filesystem.
    #[error("insufficient disk space: need {required} bytes, {available} available")]
    DiskFull {
        /// Bytes required, including the safety margin.
        required: u64,
        /// Bytes currently available.
        available: u64,
    },

    /// The restore destination already exists.
    #[error("destination already exists: {path}")]
    AlreadyExists {
        /// The occupied destination path.
        path: String,
    },

    /// The restore destination failed safety validation.
    #[error("invalid restore path '{path}': {reason}")]
    InvalidRestorePath {
        /// The rejected path as given by the caller.
        path: String,
        /// Why the path was rejected.
        reason: String,
    },

    /// Recomputed hash does not match the recorded hash.
    #[error("integrity check failed for {path}: expected {expected}, got {actual}")]
    HashMismatch {
        /// File whose content was verified.
        path: String,
        /// Hash recorded at quarantine time.
        expected: String,
        /// Hash computed now.
        actual: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other file operation failure.
    #[error("file operation failed: {message}")]
    Other {
        /// Description of the failure.
        message: String,
    },
}

impl FileOperationError {
    /// Creates a `FileNotFound` error.
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates a `PermissionDenied` error.
    pub fn permission_denied(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PermissionDenied {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InvalidRestorePath` error.
    pub fn invalid_restore_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRestorePath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `Other` error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}

/// Errors produced by the quarantine manager.
#[derive(Debug, Error)]
pub enum QuarantineError {
    /// A file-level operation failed.
    #[error(transparent)]
    FileOperation(#[from] FileOperationError),

    /// The metadata store rejected or failed an operation.
    #[error("database error: {message}")]
    Database {
        /// Description of the database failure.
        message: String,
    },

    /// No entry with the requested id exists.
    #[error("quarantine entry not found: {id}")]
    EntryNotFound {
        /// The id that was looked up.
        id: i64,
    },

    /// The source path already resides inside the quarantine directory.
    #[error("file is already quarantined: {path}")]
    AlreadyQuarantined {
        /// The offending source path.
        path: String,
    },

    /// Any other manager-level failure.
    #[error("quarantine operation failed: {message}")]
    Other {
        /// Description of the failure.
        message: String,
    },
}

impl QuarantineError {
    /// Creates a `Database` error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Creates an `EntryNotFound` error.
    pub fn entry_not_found(id: i64) -> Self {
        Self::EntryNotFound { id }
    }

    /// Creates an `Other` error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Maps this error onto the flat status taxonomy.
    pub fn status(&self) -> QuarantineStatus {
        match self {
            Self::FileOperation(e) => file_operation_status(e),
            Self::Database { .. } => QuarantineStatus::DatabaseError,
            Self::EntryNotFound { .. } => QuarantineStatus::EntryNotFound,
            Self::AlreadyQuarantined { .. } => QuarantineStatus::AlreadyQuarantined,
            Self::Other { .. } => QuarantineStatus::Error,
        }
    }
}

/// Terminal outcome of any quarantine operation, for UI-facing display.
///
/// This is a closed enumeration; the accompanying human-readable message
/// lives in the error value itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuarantineStatus {
    /// The operation completed.
    Success,
    /// A referenced file does not exist.
    FileNotFound,
    /// The operating system denied the operation.
    PermissionDenied,
    /// Not enough free disk space.
    DiskFull,
    /// The metadata store failed.
    DatabaseError,
    /// The source file is already inside the quarantine directory.
    AlreadyQuarantined,
    /// No metadata entry with the requested id.
    EntryNotFound,
    /// The restore destination is occupied.
    RestoreDestinationExists,
    /// The restore destination failed safety validation.
    InvalidRestorePath,
    /// Any other failure, including integrity mismatches.
    Error,
}

impl QuarantineStatus {
    /// Returns `true` for `Success`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for QuarantineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Success => "success",
            Self::FileNotFound => "file_not_found",
            Self::PermissionDenied => "permission_denied",
            Self::DiskFull => "disk_full",
            Self::DatabaseError => "database_error",
            Self::AlreadyQuarantined => "already_quarantined",
            Self::EntryNotFound => "entry_not_found",
            Self::RestoreDestinationExists => "restore_destination_exists",
            Self::InvalidRestorePath => "invalid_restore_path",
            Self::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Maps a file-layer error onto the flat status taxonomy.
///
/// The file layer has no notion of entries or the database, so only a
/// subset of statuses can come out of this mapping.
pub fn file_operation_status(error: &FileOperationError) -> QuarantineStatus {
    match error {
        FileOperationError::FileNotFound { .. } => QuarantineStatus::FileNotFound,
        FileOperationError::PermissionDenied { .. } => QuarantineStatus::PermissionDenied,
        FileOperationError::DiskFull { .. } => QuarantineStatus::DiskFull,
        FileOperationError::AlreadyExists { .. } => QuarantineStatus::RestoreDestinationExists,
        FileOperationError::InvalidRestorePath { .. } => QuarantineStatus::InvalidRestorePath,
        FileOperationError::HashMismatch { .. }
        | FileOperationError::Io(_)
        | FileOperationError::Other { .. } => QuarantineStatus::Error,
    }
}

/// A specialized `Result` type for file handler operations.
pub type FileOperationResult<T> = Result<T, FileOperationError>;

/// A specialized `Result` type for manager operations.
pub type QuarantineResult<T> = Result<T, QuarantineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_operation_status_mapping() {
        let err = FileOperationError::file_not_found("/tmp/missing");
        assert_eq!(file_operation_status(&err), QuarantineStatus::FileNotFound);

        let err = FileOperationError::DiskFull {
            required: 100,
            available: 10,
        };
        assert_eq!(file_operation_status(&err), QuarantineStatus::DiskFull);

        let err = FileOperationError::AlreadyExists {
            path: "/tmp/x".into(),
        };
        assert_eq!(
            file_operation_status(&err),
            QuarantineStatus::RestoreDestinationExists
        );

        let err = FileOperationError::invalid_restore_path("/etc/passwd", "protected");
        assert_eq!(
            file_operation_status(&err),
            QuarantineStatus::InvalidRestorePath
        );
    }

    #[test]
    fn test_quarantine_error_status() {
        assert_eq!(
            QuarantineError::entry_not_found(42).status(),
            QuarantineStatus::EntryNotFound
        );
        assert_eq!(
            QuarantineError::database("locked").status(),
            QuarantineStatus::DatabaseError
        );

        let wrapped =
            QuarantineError::from(FileOperationError::permission_denied("/tmp/x", "EACCES"));
        assert_eq!(wrapped.status(), QuarantineStatus::PermissionDenied);
    }

    #[test]
    fn test_hash_mismatch_display() {
        let err = FileOperationError::HashMismatch {
            path: "/q/abc_file".into(),
            expected: "aa".repeat(32),
            actual: "bb".repeat(32),
        };
        let msg = err.to_string();
        assert!(msg.contains("integrity check failed"));
        assert!(msg.contains(&"aa".repeat(32)));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(QuarantineStatus::Success.to_string(), "success");
        assert_eq!(
            QuarantineStatus::InvalidRestorePath.to_string(),
            "invalid_restore_path"
        );
        assert!(QuarantineStatus::Success.is_success());
        assert!(!QuarantineStatus::Error.is_success());
    }
}
