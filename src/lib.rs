//! # Qvault
//!
//! Safe isolation of files flagged as malware: atomic moves into a
//! locked-down quarantine directory, tamper-evident metadata, and safe
//! restoration or permanent deletion.
//!
//! ## Overview
//!
//! Qvault provides the quarantine subsystem of a malware-protection
//! stack, allowing you to:
//!
//! - Move detected threats into a `0700` quarantine directory with a
//!   single atomic rename
//! - Record tamper-evident metadata (SHA-256 hash, size, original
//!   permissions) in a crash-safe SQLite store
//! - Restore files only after integrity verification, never into
//!   protected system directories
//! - Reconcile drift between the filesystem and the metadata store
//!   (orphan cleanup) automatically
//! - Run operations on background workers and deliver results to a UI
//!   event loop
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use qvault::{QuarantineManager, QuarantineStatus};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = QuarantineManager::builder()
//!         .quarantine_dir("/var/lib/myscanner/quarantine")
//!         .database_path("/var/lib/myscanner/quarantine.db")
//!         .build()?;
//!
//!     // A scan engine found a threat:
//!     let entry = manager.quarantine_file(
//!         "/home/user/downloads/invoice.exe".as_ref(),
//!         "Trojan.GenericKD.12345",
//!     )?;
//!     println!("isolated as {}", entry.quarantine_path);
//!
//!     // The user decided it was a false positive:
//!     manager.restore_file(entry.id)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes tokio runtime support
//! - `tokio-runtime` - Async operation wrappers via tokio
//!
//! ## Architecture
//!
//! The library is organized into several layers:
//!
//! - **Core**: Entry type, error taxonomy, SHA-256 hashing
//! - **Fs**: The secure file handler and restore-path validation
//! - **Db**: Durable SQLite metadata store
//! - **Manager**: Orchestration, rollback, and orphan reconciliation
//! - **Audit**: Structured logging of quarantine actions

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod core;
pub mod db;
pub mod fs;
pub mod manager;

// Re-export commonly used types at the crate root
pub use crate::core::{
    FileHasher, FileOperationError, FileOperationResult, QuarantineEntry, QuarantineError,
    QuarantineResult, QuarantineStatus,
};

pub use crate::db::QuarantineDatabase;
pub use crate::fs::{SecureFileHandler, PROTECTED_ROOTS};
pub use crate::manager::{
    EventSink, NoOpEventSink, OperationHandle, OperationKind, OperationOutcome, QuarantineConfig,
    QuarantineManager, QuarantineManagerBuilder,
};

/// Prelude module for convenient imports.
///
/// ```rust
/// use qvault::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        FileHasher, FileOperationError, FileOperationResult, QuarantineEntry, QuarantineError,
        QuarantineResult, QuarantineStatus,
    };
    pub use crate::db::QuarantineDatabase;
    pub use crate::fs::SecureFileHandler;
    pub use crate::manager::{
        EventSink, NoOpEventSink, OperationHandle, OperationKind, OperationOutcome,
        QuarantineConfig, QuarantineManager, QuarantineManagerBuilder,
    };
}
