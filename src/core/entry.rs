//! Quarantine entry type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fallback permission bits applied when the original mode is unknown:
/// owner read/write, group/other read.
pub const DEFAULT_RESTORE_MODE: u32 = 0o644;

/// Metadata for one quarantined file, one row per quarantine action.
///
/// Entries are immutable: they are created when a file enters quarantine
/// and deleted when it is restored, purged, or reconciled away. The `id`
/// and `detection_date` fields are assigned by the metadata store on
/// insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarantineEntry {
    /// Store-assigned unique identifier.
    pub id: i64,

    /// Absolute path the file was removed from. Not unique: the same path
    /// may be quarantined repeatedly across its lifetime, each producing a
    /// distinct entry.
    pub original_path: String,

    /// Absolute path inside the quarantine directory. Globally unique.
    pub quarantine_path: String,

    /// Free-form name of the detected threat.
    pub threat_name: String,

    /// RFC 3339 timestamp set by the store at insert time, never updated.
    pub detection_date: String,

    /// File size in bytes, captured before the move.
    pub file_size: u64,

    /// 64-character lowercase hex SHA-256 digest, captured before the move.
    pub file_hash: String,

    /// Unix permission bits captured prior to quarantine, reinstated on
    /// restore. Defaults to [`DEFAULT_RESTORE_MODE`] for rows where the
    /// mode was never captured.
    pub original_permissions: u32,
}

impl QuarantineEntry {
    /// Parses `detection_date` back into a UTC timestamp.
    ///
    /// Returns `None` for rows whose timestamp was corrupted out-of-band.
    pub fn detection_date_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.detection_date)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Original file name component of `original_path`, if any.
    pub fn original_file_name(&self) -> Option<&str> {
        std::path::Path::new(&self.original_path)
            .file_name()
            .and_then(|n| n.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_entry() -> QuarantineEntry {
        QuarantineEntry {
            id: 1,
            original_path: "/home/user/downloads/invoice.exe".into(),
            quarantine_path: "/var/lib/qvault/0123456789abcdef_invoice.exe".into(),
            threat_name: "Trojan.GenericKD.12345".into(),
            detection_date: Utc::now().to_rfc3339(),
            file_size: 4096,
            file_hash: "ab".repeat(32),
            original_permissions: 0o755,
        }
    }

    #[test]
    fn test_detection_date_roundtrip() {
        let entry = make_entry();
        assert!(entry.detection_date_utc().is_some());

        let mut corrupted = entry.clone();
        corrupted.detection_date = "not-a-date".into();
        assert!(corrupted.detection_date_utc().is_none());
    }

    #[test]
    fn test_original_file_name() {
        let entry = make_entry();
        assert_eq!(entry.original_file_name(), Some("invoice.exe"));
    }

    #[test]
    fn test_serde_roundtrip() {
        let entry = make_entry();
        let json = serde_json::to_string(&entry).unwrap();
        let back: QuarantineEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }
}
