//! Audit event types and emission functions.

use crate::core::entry::QuarantineEntry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit record of a quarantine lifecycle action.
///
/// Emission goes through `tracing`, so any subscriber (JSON file,
/// journald, OpenTelemetry) can capture these for compliance review.
/// The struct itself is serializable for hosts that archive events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarantineAuditEvent {
    /// Event type, one of `file_quarantined`, `file_restored`,
    /// `file_deleted`, `entries_cleaned`.
    pub event_type: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Id of the affected entry, if a single entry was involved.
    pub entry_id: Option<i64>,

    /// Original location of the affected file.
    pub original_path: Option<String>,

    /// Quarantine location of the affected file.
    pub quarantine_path: Option<String>,

    /// Name of the detected threat.
    pub threat_name: Option<String>,

    /// SHA-256 digest of the affected file.
    pub file_hash: Option<String>,

    /// Number of entries affected by a bulk action.
    pub affected_count: Option<usize>,
}

impl QuarantineAuditEvent {
    /// Builds an event describing a single-entry action.
    pub fn for_entry(event_type: impl Into<String>, entry: &QuarantineEntry) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp: Utc::now(),
            entry_id: Some(entry.id),
            original_path: Some(entry.original_path.clone()),
            quarantine_path: Some(entry.quarantine_path.clone()),
            threat_name: Some(entry.threat_name.clone()),
            file_hash: Some(entry.file_hash.clone()),
            affected_count: None,
        }
    }
}

/// Emits an audit event for a completed quarantine.
pub fn emit_quarantine_performed(entry: &QuarantineEntry) {
    tracing::info!(
        target: "qvault::audit",
        event_type = "file_quarantined",
        entry_id = entry.id,
        original_path = %entry.original_path,
        quarantine_path = %entry.quarantine_path,
        threat_name = %entry.threat_name,
        file_hash = %entry.file_hash,
        file_size = entry.file_size,
        "File quarantined"
    );
}

/// Emits an audit event for a completed restore.
pub fn emit_restore_performed(entry: &QuarantineEntry) {
    tracing::info!(
        target: "qvault::audit",
        event_type = "file_restored",
        entry_id = entry.id,
        original_path = %entry.original_path,
        quarantine_path = %entry.quarantine_path,
        threat_name = %entry.threat_name,
        file_hash = %entry.file_hash,
        "File restored from quarantine"
    );
}

/// Emits an audit event for a permanent deletion.
pub fn emit_delete_performed(entry: &QuarantineEntry) {
    tracing::info!(
        target: "qvault::audit",
        event_type = "file_deleted",
        entry_id = entry.id,
        original_path = %entry.original_path,
        quarantine_path = %entry.quarantine_path,
        threat_name = %entry.threat_name,
        file_hash = %entry.file_hash,
        "File permanently deleted from quarantine"
    );
}

/// Emits an audit event for a bulk cleanup pass.
pub fn emit_cleanup_performed(kind: &str, affected: usize) {
    tracing::info!(
        target: "qvault::audit",
        event_type = "entries_cleaned",
        cleanup_kind = %kind,
        affected_count = affected,
        "Quarantine entries cleaned up"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry() -> QuarantineEntry {
        QuarantineEntry {
            id: 9,
            original_path: "/home/u/bad.exe".into(),
            quarantine_path: "/q/0011223344556677_bad.exe".into(),
            threat_name: "Worm.Test".into(),
            detection_date: Utc::now().to_rfc3339(),
            file_size: 10,
            file_hash: "cd".repeat(32),
            original_permissions: 0o644,
        }
    }

    #[test]
    fn test_event_for_entry() {
        let entry = make_entry();
        let event = QuarantineAuditEvent::for_entry("file_quarantined", &entry);

        assert_eq!(event.event_type, "file_quarantined");
        assert_eq!(event.entry_id, Some(9));
        assert_eq!(event.threat_name.as_deref(), Some("Worm.Test"));
        assert!(event.affected_count.is_none());
    }

    #[test]
    fn test_event_serializes() {
        let event = QuarantineAuditEvent::for_entry("file_deleted", &make_entry());
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("file_deleted"));
    }

    #[test]
    fn test_emitters_do_not_panic() {
        let entry = make_entry();
        emit_quarantine_performed(&entry);
        emit_restore_performed(&entry);
        emit_delete_performed(&entry);
        emit_cleanup_performed("orphan_cleanup", 3);
    }
}
