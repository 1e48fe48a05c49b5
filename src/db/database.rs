//! SQLite-backed quarantine metadata store.
//!
//! One row per quarantined file. The database knows nothing about file
//! content or filesystem safety; it stores and indexes metadata. Writes
//! are crash-safe (WAL journal), `quarantine_path` carries a uniqueness
//! constraint so two rows can never claim the same backing file, and all
//! access is serialized through an internal mutex so the store stays safe
//! even without the manager's coarser lock.

use crate::core::entry::{QuarantineEntry, DEFAULT_RESTORE_MODE};

use chrono::{Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors produced by the metadata store.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The underlying SQLite operation failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An I/O error occurred while preparing the database location.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized `Result` type for store operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Input for a new quarantine row; `id` and `detection_date` are assigned
/// by the store.
#[derive(Debug, Clone)]
pub struct NewEntry {
    /// Absolute path the file was removed from.
    pub original_path: String,
    /// Absolute path inside the quarantine directory. Must be unique.
    pub quarantine_path: String,
    /// Free-form name of the detected threat.
    pub threat_name: String,
    /// File size in bytes, captured before the move.
    pub file_size: u64,
    /// SHA-256 hex digest, captured before the move.
    pub file_hash: String,
    /// Permission bits captured before the move. `None` falls back to
    /// [`DEFAULT_RESTORE_MODE`].
    pub original_permissions: Option<u32>,
}

/// Durable metadata store for quarantine entries.
#[derive(Debug)]
pub struct QuarantineDatabase {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl QuarantineDatabase {
    /// Opens (creating if necessary) the store at the given path.
    ///
    /// Parent directories are created on demand. The WAL journal mode
    /// makes committed writes survive a crash mid-transaction.
    pub fn open(path: impl Into<PathBuf>) -> DatabaseResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "FULL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path,
        })
    }

    /// Opens an in-memory store. Test use only; nothing survives drop.
    #[cfg(test)]
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: PathBuf::from(":memory:"),
        })
    }

    /// Returns the on-disk location of the store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Inserts a new entry, assigning its id and detection date.
    pub fn add_entry(&self, new_entry: NewEntry) -> DatabaseResult<QuarantineEntry> {
        let detection_date = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let original_permissions = new_entry
            .original_permissions
            .unwrap_or(DEFAULT_RESTORE_MODE);

        let conn = self.lock_conn();
        conn.execute(
            "INSERT INTO quarantine_entries
                 (original_path, quarantine_path, threat_name, detection_date,
                  file_size, file_hash, original_permissions)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                new_entry.original_path,
                new_entry.quarantine_path,
                new_entry.threat_name,
                detection_date,
                new_entry.file_size as i64,
                new_entry.file_hash,
                original_permissions as i64,
            ],
        )?;
        let id = conn.last_insert_rowid();

        tracing::debug!(id, quarantine_path = %new_entry.quarantine_path, "entry added");

        Ok(QuarantineEntry {
            id,
            original_path: new_entry.original_path,
            quarantine_path: new_entry.quarantine_path,
            threat_name: new_entry.threat_name,
            detection_date,
            file_size: new_entry.file_size,
            file_hash: new_entry.file_hash,
            original_permissions,
        })
    }

    /// Fetches an entry by id.
    pub fn get_entry(&self, id: i64) -> DatabaseResult<Option<QuarantineEntry>> {
        let conn = self.lock_conn();
        let entry = conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_ENTRY),
                params![id],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Fetches the newest entry recorded for the given original path.
    pub fn get_entry_by_original_path(
        &self,
        original_path: &str,
    ) -> DatabaseResult<Option<QuarantineEntry>> {
        let conn = self.lock_conn();
        let entry = conn
            .query_row(
                &format!(
                    "{} WHERE original_path = ?1
                     ORDER BY detection_date DESC, id DESC LIMIT 1",
                    SELECT_ENTRY
                ),
                params![original_path],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Returns all entries, newest first.
    pub fn get_all_entries(&self) -> DatabaseResult<Vec<QuarantineEntry>> {
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY detection_date DESC, id DESC",
            SELECT_ENTRY
        ))?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Removes an entry by id. Returns whether a row was deleted.
    pub fn remove_entry(&self, id: i64) -> DatabaseResult<bool> {
        let conn = self.lock_conn();
        let changed = conn.execute("DELETE FROM quarantine_entries WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Sum of `file_size` over all entries, in bytes.
    pub fn get_total_size(&self) -> DatabaseResult<u64> {
        let conn = self.lock_conn();
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(file_size), 0) FROM quarantine_entries",
            [],
            |row| row.get(0),
        )?;
        Ok(total.max(0) as u64)
    }

    /// Number of entries in the store.
    pub fn get_entry_count(&self) -> DatabaseResult<u64> {
        let conn = self.lock_conn();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM quarantine_entries", [], |row| {
                row.get(0)
            })?;
        Ok(count.max(0) as u64)
    }

    /// Entries older than the given number of days, oldest first.
    pub fn get_old_entries(&self, days: u32) -> DatabaseResult<Vec<QuarantineEntry>> {
        let cutoff = cutoff_timestamp(days);
        let conn = self.lock_conn();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE detection_date < ?1 ORDER BY detection_date ASC, id ASC",
            SELECT_ENTRY
        ))?;
        let entries = stmt
            .query_map(params![cutoff], row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Bulk-deletes entries older than the given number of days.
    ///
    /// Pure metadata deletion; the caller is responsible for removing the
    /// backing files first. Returns the number of rows deleted.
    pub fn cleanup_old_entries(&self, days: u32) -> DatabaseResult<usize> {
        let cutoff = cutoff_timestamp(days);
        let conn = self.lock_conn();
        let removed = conn.execute(
            "DELETE FROM quarantine_entries WHERE detection_date < ?1",
            params![cutoff],
        )?;
        Ok(removed)
    }

    /// Returns whether any entry exists for the given original path.
    pub fn entry_exists(&self, original_path: &str) -> DatabaseResult<bool> {
        let conn = self.lock_conn();
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM quarantine_entries WHERE original_path = ?1)",
            params![original_path],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn lock_conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS quarantine_entries (
             id                   INTEGER PRIMARY KEY AUTOINCREMENT,
             original_path        TEXT NOT NULL,
             quarantine_path      TEXT NOT NULL UNIQUE,
             threat_name          TEXT NOT NULL,
             detection_date       TEXT NOT NULL,
             file_size            INTEGER NOT NULL,
             file_hash            TEXT NOT NULL,
             original_permissions INTEGER NOT NULL DEFAULT 420
         );
         CREATE INDEX IF NOT EXISTS idx_entries_original_path
             ON quarantine_entries(original_path);
         CREATE INDEX IF NOT EXISTS idx_entries_detection_date
             ON quarantine_entries(detection_date);",
    )
}

const SELECT_ENTRY: &str = "SELECT id, original_path, quarantine_path, threat_name,
            detection_date, file_size, file_hash, original_permissions
     FROM quarantine_entries";

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<QuarantineEntry> {
    Ok(QuarantineEntry {
        id: row.get(0)?,
        original_path: row.get(1)?,
        quarantine_path: row.get(2)?,
        threat_name: row.get(3)?,
        detection_date: row.get(4)?,
        file_size: row.get::<_, i64>(5)?.max(0) as u64,
        file_hash: row.get(6)?,
        original_permissions: row.get::<_, i64>(7)?.max(0) as u32,
    })
}

/// RFC 3339 timestamp `days` days in the past, in the same fixed-width
/// format entries are stored with, so string comparison orders correctly.
fn cutoff_timestamp(days: u32) -> String {
    (Utc::now() - Duration::days(i64::from(days))).to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn new_entry(original: &str, quarantine: &str, size: u64) -> NewEntry {
        NewEntry {
            original_path: original.to_string(),
            quarantine_path: quarantine.to_string(),
            threat_name: "Test.Threat".to_string(),
            file_size: size,
            file_hash: "ab".repeat(32),
            original_permissions: Some(0o644),
        }
    }

    #[test]
    fn test_add_and_get_entry() {
        let db = QuarantineDatabase::open_in_memory().unwrap();
        let entry = db
            .add_entry(new_entry("/home/u/a.exe", "/q/1111111111111111_a.exe", 100))
            .unwrap();

        assert!(entry.id > 0);
        assert!(!entry.detection_date.is_empty());
        assert_eq!(entry.original_permissions, 0o644);

        let fetched = db.get_entry(entry.id).unwrap().unwrap();
        assert_eq!(fetched, entry);
        assert!(db.get_entry(entry.id + 999).unwrap().is_none());
    }

    #[test]
    fn test_quarantine_path_uniqueness() {
        let db = QuarantineDatabase::open_in_memory().unwrap();
        db.add_entry(new_entry("/a", "/q/same_path", 1)).unwrap();

        let result = db.add_entry(new_entry("/b", "/q/same_path", 2));
        assert!(matches!(result, Err(DatabaseError::Sqlite(_))));
        assert_eq!(db.get_entry_count().unwrap(), 1);
    }

    #[test]
    fn test_duplicate_original_path_allowed() {
        let db = QuarantineDatabase::open_in_memory().unwrap();
        let first = db.add_entry(new_entry("/home/u/a.exe", "/q/x1_a.exe", 1)).unwrap();
        let second = db.add_entry(new_entry("/home/u/a.exe", "/q/x2_a.exe", 2)).unwrap();

        assert_ne!(first.id, second.id);
        assert_ne!(first.quarantine_path, second.quarantine_path);
        assert_eq!(db.get_entry_count().unwrap(), 2);

        // Newest entry wins the by-path lookup.
        let by_path = db
            .get_entry_by_original_path("/home/u/a.exe")
            .unwrap()
            .unwrap();
        assert_eq!(by_path.id, second.id);
    }

    #[test]
    fn test_get_all_entries_newest_first() {
        let db = QuarantineDatabase::open_in_memory().unwrap();
        let a = db.add_entry(new_entry("/a", "/q/a", 1)).unwrap();
        let b = db.add_entry(new_entry("/b", "/q/b", 2)).unwrap();
        let c = db.add_entry(new_entry("/c", "/q/c", 3)).unwrap();

        let all = db.get_all_entries().unwrap();
        let ids: Vec<i64> = all.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![c.id, b.id, a.id]);
    }

    #[test]
    fn test_remove_entry() {
        let db = QuarantineDatabase::open_in_memory().unwrap();
        let entry = db.add_entry(new_entry("/a", "/q/a", 1)).unwrap();

        assert!(db.remove_entry(entry.id).unwrap());
        assert!(!db.remove_entry(entry.id).unwrap());
        assert_eq!(db.get_entry_count().unwrap(), 0);
    }

    #[test]
    fn test_total_size_and_count() {
        let db = QuarantineDatabase::open_in_memory().unwrap();
        db.add_entry(new_entry("/a", "/q/a", 1000)).unwrap();
        let b = db.add_entry(new_entry("/b", "/q/b", 2000)).unwrap();
        db.add_entry(new_entry("/c", "/q/c", 3000)).unwrap();

        assert_eq!(db.get_total_size().unwrap(), 6000);
        assert_eq!(db.get_entry_count().unwrap(), 3);

        db.remove_entry(b.id).unwrap();
        assert_eq!(db.get_total_size().unwrap(), 4000);
        assert_eq!(db.get_entry_count().unwrap(), 2);
    }

    #[test]
    fn test_entry_exists() {
        let db = QuarantineDatabase::open_in_memory().unwrap();
        assert!(!db.entry_exists("/a").unwrap());
        db.add_entry(new_entry("/a", "/q/a", 1)).unwrap();
        assert!(db.entry_exists("/a").unwrap());
        assert!(!db.entry_exists("/b").unwrap());
    }

    #[test]
    fn test_old_entries_cutoff() {
        let db = QuarantineDatabase::open_in_memory().unwrap();
        db.add_entry(new_entry("/a", "/q/a", 1)).unwrap();
        db.add_entry(new_entry("/b", "/q/b", 2)).unwrap();

        // Fresh entries are not older than 30 days.
        assert!(db.get_old_entries(30).unwrap().is_empty());
        assert_eq!(db.cleanup_old_entries(30).unwrap(), 0);

        // A zero-day threshold makes every already-inserted entry old.
        assert_eq!(db.get_old_entries(0).unwrap().len(), 2);
        assert_eq!(db.cleanup_old_entries(0).unwrap(), 2);
        assert_eq!(db.get_entry_count().unwrap(), 0);
    }

    #[test]
    fn test_default_permissions_fallback() {
        let db = QuarantineDatabase::open_in_memory().unwrap();
        let mut input = new_entry("/a", "/q/a", 1);
        input.original_permissions = None;
        let entry = db.add_entry(input).unwrap();
        assert_eq!(entry.original_permissions, DEFAULT_RESTORE_MODE);

        let fetched = db.get_entry(entry.id).unwrap().unwrap();
        assert_eq!(fetched.original_permissions, DEFAULT_RESTORE_MODE);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("meta/quarantine.db");

        let entry = {
            let db = QuarantineDatabase::open(&db_path).unwrap();
            db.add_entry(new_entry("/a", "/q/a", 123)).unwrap()
        };

        let db = QuarantineDatabase::open(&db_path).unwrap();
        let fetched = db.get_entry(entry.id).unwrap().unwrap();
        assert_eq!(fetched, entry);
    }
}
