//! Filesystem primitives: the secure file handler and restore-path
//! validation.

pub mod handler;
pub mod restore_path;

pub use handler::{QuarantinedFile, SecureFileHandler, DISK_SPACE_MARGIN};
pub use restore_path::{validate_restore_path, PROTECTED_ROOTS};
