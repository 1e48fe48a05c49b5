//! Structured audit logging for quarantine actions.
//!
//! This module provides functions for emitting structured audit events
//! using the `tracing` crate. Events can be captured by any tracing
//! subscriber (JSON file, journald, OpenTelemetry, etc.) for
//! tamper-resistant logging.

mod events;

pub use events::{
    emit_cleanup_performed, emit_delete_performed, emit_quarantine_performed,
    emit_restore_performed, QuarantineAuditEvent,
};
