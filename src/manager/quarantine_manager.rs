//! The quarantine manager: public API and orchestration.
//!
//! Combines the secure file handler and the metadata store, serializes
//! all mutating operations behind one process-wide lock, performs
//! best-effort rollback when a move and its metadata write diverge, and
//! reconciles orphaned state between the filesystem and the database.

use crate::audit;
use crate::core::entry::QuarantineEntry;
use crate::core::error::{QuarantineError, QuarantineResult};
use crate::db::{DatabaseError, NewEntry, QuarantineDatabase};
use crate::fs::restore_path::resolve_path;
use crate::fs::SecureFileHandler;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

#[cfg(feature = "tokio-runtime")]
use crate::manager::dispatch::{EventSink, OperationKind, OperationOutcome};
#[cfg(feature = "tokio-runtime")]
use crate::manager::handle::OperationHandle;
#[cfg(feature = "tokio-runtime")]
use std::sync::Arc;

/// Name of the bookkeeping file recording the last orphan-cleanup run,
/// stored next to the metadata database.
const LAST_CLEANUP_FILE: &str = ".last_orphan_cleanup";

/// Configuration for the quarantine manager.
#[derive(Debug, Clone)]
pub struct QuarantineConfig {
    /// Directory that holds quarantined files. Created with mode `0700`.
    pub quarantine_dir: PathBuf,

    /// Location of the SQLite metadata store.
    pub database_path: PathBuf,

    /// How often the lazy orphan-cleanup pass may run.
    pub orphan_cleanup_interval: Duration,

    /// Minimum wall-clock time between cleanup-due checks, so hot read
    /// paths do not hit the bookkeeping file on every call.
    pub cleanup_check_throttle: Duration,
}

impl QuarantineConfig {
    /// Creates a configuration with default intervals.
    pub fn new(quarantine_dir: impl Into<PathBuf>, database_path: impl Into<PathBuf>) -> Self {
        Self {
            quarantine_dir: quarantine_dir.into(),
            database_path: database_path.into(),
            orphan_cleanup_interval: Duration::from_secs(24 * 60 * 60),
            cleanup_check_throttle: Duration::from_secs(60),
        }
    }

    /// Sets the orphan-cleanup interval.
    pub fn with_orphan_cleanup_interval(mut self, interval: Duration) -> Self {
        self.orphan_cleanup_interval = interval;
        self
    }

    /// Sets the cleanup-due check throttle.
    pub fn with_cleanup_check_throttle(mut self, throttle: Duration) -> Self {
        self.cleanup_check_throttle = throttle;
        self
    }
}

/// Builder for creating a [`QuarantineManager`].
#[derive(Debug, Default)]
pub struct QuarantineManagerBuilder {
    quarantine_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
    orphan_cleanup_interval: Option<Duration>,
    cleanup_check_throttle: Option<Duration>,
}

impl QuarantineManagerBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the quarantine directory.
    pub fn quarantine_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.quarantine_dir = Some(dir.into());
        self
    }

    /// Sets the metadata database path.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the orphan-cleanup interval.
    pub fn orphan_cleanup_interval(mut self, interval: Duration) -> Self {
        self.orphan_cleanup_interval = Some(interval);
        self
    }

    /// Sets the cleanup-due check throttle.
    pub fn cleanup_check_throttle(mut self, throttle: Duration) -> Self {
        self.cleanup_check_throttle = Some(throttle);
        self
    }

    /// Builds the manager, validating the configuration.
    pub fn build(self) -> QuarantineResult<QuarantineManager> {
        let quarantine_dir = self
            .quarantine_dir
            .ok_or_else(|| QuarantineError::other("quarantine directory is required"))?;
        let database_path = self
            .database_path
            .ok_or_else(|| QuarantineError::other("database path is required"))?;

        let mut config = QuarantineConfig::new(quarantine_dir, database_path);
        if let Some(interval) = self.orphan_cleanup_interval {
            config.orphan_cleanup_interval = interval;
        }
        if let Some(throttle) = self.cleanup_check_throttle {
            config.cleanup_check_throttle = throttle;
        }
        QuarantineManager::new(config)
    }
}

/// Orchestrates secure file isolation and durable metadata.
///
/// All mutating operations (`quarantine_file`, `restore_file`,
/// `delete_file`, `cleanup_*`) serialize behind a single process-wide
/// mutex. Reads that bypass the manager may observe state mid-transition
/// relative to a concurrent writer.
#[derive(Debug)]
pub struct QuarantineManager {
    handler: SecureFileHandler,
    database: QuarantineDatabase,
    config: QuarantineConfig,
    /// Serializes every mutating operation.
    op_lock: Mutex<()>,
    /// Wall-clock throttle for cleanup-due checks.
    last_cleanup_check: Mutex<Option<Instant>>,
}

impl QuarantineManager {
    /// Creates a manager from a configuration.
    pub fn new(config: QuarantineConfig) -> QuarantineResult<Self> {
        let handler = SecureFileHandler::new(&config.quarantine_dir)?;
        let database = QuarantineDatabase::open(&config.database_path).map_err(db_err)?;

        Ok(Self {
            handler,
            database,
            config,
            op_lock: Mutex::new(()),
            last_cleanup_check: Mutex::new(None),
        })
    }

    /// Creates a new builder.
    pub fn builder() -> QuarantineManagerBuilder {
        QuarantineManagerBuilder::new()
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &QuarantineConfig {
        &self.config
    }

    /// Isolates a file: moves it into quarantine and records metadata.
    ///
    /// If the metadata insert fails after the file has already been
    /// moved, the move is rolled back (file returned to its original
    /// location with its original permissions). If the rollback fails
    /// too, the file stays in quarantine without a row; the error names
    /// its exact location and the condition is logged as critical so an
    /// operator or the orphan-cleanup pass can recover it.
    pub fn quarantine_file(
        &self,
        path: &Path,
        threat_name: &str,
    ) -> QuarantineResult<QuarantineEntry> {
        let _guard = self.lock_ops();

        if self.is_inside_quarantine(path) {
            return Err(QuarantineError::AlreadyQuarantined {
                path: path.display().to_string(),
            });
        }

        let original_path = path.display().to_string();
        let moved = self.handler.move_to_quarantine(path, threat_name)?;

        let inserted = self.database.add_entry(NewEntry {
            original_path: original_path.clone(),
            quarantine_path: moved.quarantine_path.display().to_string(),
            threat_name: threat_name.to_string(),
            file_size: moved.file_size,
            file_hash: moved.file_hash.clone(),
            original_permissions: Some(moved.original_permissions),
        });

        let entry = match inserted {
            Ok(entry) => entry,
            Err(db_error) => {
                return Err(self.roll_back_move(
                    &moved.quarantine_path,
                    &original_path,
                    moved.original_permissions,
                    &db_error,
                ));
            }
        };

        audit::emit_quarantine_performed(&entry);
        Ok(entry)
    }

    /// Restores a quarantined file to its original location.
    ///
    /// The stored hash is verified first; a mismatch means the
    /// quarantined copy was tampered with or corrupted, and the restore
    /// is refused with the file left in place.
    pub fn restore_file(&self, id: i64) -> QuarantineResult<QuarantineEntry> {
        let _guard = self.lock_ops();

        let entry = self
            .database
            .get_entry(id)
            .map_err(db_err)?
            .ok_or_else(|| QuarantineError::entry_not_found(id))?;

        let quarantine_path = Path::new(&entry.quarantine_path);
        self.handler
            .verify_file_integrity(quarantine_path, &entry.file_hash)?;

        self.handler.restore_from_quarantine(
            quarantine_path,
            &entry.original_path,
            entry.original_permissions,
        )?;

        match self.database.remove_entry(id) {
            Ok(_) => {}
            Err(e) => {
                // The file is back but the row survived; the orphan
                // cleanup pass will remove it once the backing file is
                // seen missing.
                tracing::warn!(
                    id,
                    error = %e,
                    "restored file but failed to remove its entry; row is now orphaned"
                );
            }
        }

        audit::emit_restore_performed(&entry);
        Ok(entry)
    }

    /// Permanently deletes a quarantined file and its entry.
    ///
    /// Calling this twice with the same id yields `Success`, then
    /// `EntryNotFound`.
    pub fn delete_file(&self, id: i64) -> QuarantineResult<QuarantineEntry> {
        let _guard = self.lock_ops();

        let entry = self
            .database
            .get_entry(id)
            .map_err(db_err)?
            .ok_or_else(|| QuarantineError::entry_not_found(id))?;

        self.handler
            .delete_from_quarantine(Path::new(&entry.quarantine_path))?;

        match self.database.remove_entry(id) {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    id,
                    error = %e,
                    "deleted file but failed to remove its entry; row is now orphaned"
                );
            }
        }

        audit::emit_delete_performed(&entry);
        Ok(entry)
    }

    /// Returns all entries, newest first.
    ///
    /// Also gives the lazy periodic cleanup a chance to run, so a UI
    /// that only ever lists the quarantine still reconciles orphans.
    pub fn get_all_entries(&self) -> QuarantineResult<Vec<QuarantineEntry>> {
        if let Err(e) = self.maybe_run_periodic_cleanup() {
            tracing::warn!(error = %e, "periodic cleanup check failed");
        }
        self.database.get_all_entries().map_err(db_err)
    }

    /// Fetches a single entry by id.
    pub fn get_entry(&self, id: i64) -> QuarantineResult<Option<QuarantineEntry>> {
        self.database.get_entry(id).map_err(db_err)
    }

    /// Fetches the newest entry for an original path.
    pub fn get_entry_by_original_path(
        &self,
        original_path: &str,
    ) -> QuarantineResult<Option<QuarantineEntry>> {
        self.database
            .get_entry_by_original_path(original_path)
            .map_err(db_err)
    }

    /// Total size in bytes of everything recorded as quarantined.
    pub fn get_total_size(&self) -> QuarantineResult<u64> {
        self.database.get_total_size().map_err(db_err)
    }

    /// Number of quarantine entries.
    pub fn get_entry_count(&self) -> QuarantineResult<u64> {
        self.database.get_entry_count().map_err(db_err)
    }

    /// Entries older than the given number of days.
    pub fn get_old_entries(&self, days: u32) -> QuarantineResult<Vec<QuarantineEntry>> {
        self.database.get_old_entries(days).map_err(db_err)
    }

    /// Returns whether any entry exists for the given original path.
    pub fn entry_exists(&self, original_path: &str) -> QuarantineResult<bool> {
        self.database.entry_exists(original_path).map_err(db_err)
    }

    /// Checks that an entry's backing file is present on disk.
    pub fn verify_entry(&self, id: i64) -> QuarantineResult<bool> {
        let entry = self
            .database
            .get_entry(id)
            .map_err(db_err)?
            .ok_or_else(|| QuarantineError::entry_not_found(id))?;
        Ok(Path::new(&entry.quarantine_path).exists())
    }

    /// Removes entries whose backing file no longer exists.
    ///
    /// Reconciles drift caused by partial failures or external
    /// interference with the quarantine directory. Returns the number of
    /// rows removed.
    pub fn cleanup_orphaned_entries(&self) -> QuarantineResult<usize> {
        let _guard = self.lock_ops();
        self.cleanup_orphaned_entries_locked()
    }

    /// Runs the orphan cleanup if it is due.
    ///
    /// The pass runs at most once per configured interval; the interval
    /// survives restarts because the last-run time is persisted next to
    /// the database. Wall-clock checks themselves are throttled so hot
    /// read paths stay cheap. Returns the number of removed rows, or
    /// `None` when the pass was skipped.
    pub fn maybe_run_periodic_cleanup(&self) -> QuarantineResult<Option<usize>> {
        {
            let mut last_check = self
                .last_cleanup_check
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(checked_at) = *last_check {
                if checked_at.elapsed() < self.config.cleanup_check_throttle {
                    return Ok(None);
                }
            }
            *last_check = Some(Instant::now());
        }

        let now = unix_now();
        if let Some(last_run) = self.read_last_cleanup_run() {
            if now.saturating_sub(last_run) < self.config.orphan_cleanup_interval.as_secs() {
                return Ok(None);
            }
        }

        let removed = self.cleanup_orphaned_entries()?;
        self.write_last_cleanup_run(now);
        Ok(Some(removed))
    }

    /// Deletes entries older than the threshold together with their
    /// backing files.
    ///
    /// File deletions are best-effort: a failure is logged and the batch
    /// continues, leaving that file for a later pass. Returns the number
    /// of rows removed.
    pub fn cleanup_old_entries(&self, days: u32) -> QuarantineResult<usize> {
        let _guard = self.lock_ops();

        let old_entries = self.database.get_old_entries(days).map_err(db_err)?;
        for entry in &old_entries {
            if let Err(e) = self
                .handler
                .delete_from_quarantine(Path::new(&entry.quarantine_path))
            {
                tracing::warn!(
                    id = entry.id,
                    path = %entry.quarantine_path,
                    error = %e,
                    "failed to delete backing file during age cleanup"
                );
            }
        }

        let removed = self.database.cleanup_old_entries(days).map_err(db_err)?;
        if removed > 0 {
            audit::emit_cleanup_performed("age_cleanup", removed);
        }
        Ok(removed)
    }

    fn cleanup_orphaned_entries_locked(&self) -> QuarantineResult<usize> {
        let entries = self.database.get_all_entries().map_err(db_err)?;
        let mut removed = 0usize;

        for entry in entries {
            if Path::new(&entry.quarantine_path).exists() {
                continue;
            }
            match self.database.remove_entry(entry.id) {
                Ok(true) => {
                    tracing::info!(
                        id = entry.id,
                        quarantine_path = %entry.quarantine_path,
                        "removed orphaned entry"
                    );
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(id = entry.id, error = %e, "failed to remove orphaned entry");
                }
            }
        }

        if removed > 0 {
            audit::emit_cleanup_performed("orphan_cleanup", removed);
        }
        Ok(removed)
    }

    /// Compensates for a metadata-insert failure by moving the file back.
    fn roll_back_move(
        &self,
        quarantine_path: &Path,
        original_path: &str,
        original_permissions: u32,
        db_error: &DatabaseError,
    ) -> QuarantineError {
        match self.handler.restore_from_quarantine(
            quarantine_path,
            original_path,
            original_permissions,
        ) {
            Ok(()) => {
                tracing::warn!(
                    original_path,
                    error = %db_error,
                    "metadata insert failed; quarantine rolled back"
                );
                QuarantineError::database(format!(
                    "failed to record quarantine entry ({}); the file was restored to {}",
                    db_error, original_path
                ))
            }
            Err(rollback_error) => {
                tracing::error!(
                    quarantine_path = %quarantine_path.display(),
                    original_path,
                    insert_error = %db_error,
                    rollback_error = %rollback_error,
                    "metadata insert failed and rollback failed; file is orphaned in quarantine"
                );
                QuarantineError::database(format!(
                    "failed to record quarantine entry ({}) and rollback failed ({}); \
                     the file is orphaned at {}",
                    db_error,
                    rollback_error,
                    quarantine_path.display()
                ))
            }
        }
    }

    fn is_inside_quarantine(&self, path: &Path) -> bool {
        let Ok(root) = resolve_path(self.handler.quarantine_dir()) else {
            return false;
        };
        resolve_path(path).map(|p| p.starts_with(&root)).unwrap_or(false)
    }

    fn last_cleanup_file(&self) -> PathBuf {
        self.config
            .database_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(LAST_CLEANUP_FILE)
    }

    fn read_last_cleanup_run(&self) -> Option<u64> {
        let content = std::fs::read_to_string(self.last_cleanup_file()).ok()?;
        content.trim().parse::<u64>().ok()
    }

    fn write_last_cleanup_run(&self, epoch_secs: u64) {
        let path = self.last_cleanup_file();
        if let Err(e) = std::fs::write(&path, format!("{}\n", epoch_secs)) {
            tracing::warn!(path = %path.display(), error = %e, "failed to persist cleanup time");
        }
    }

    fn lock_ops(&self) -> std::sync::MutexGuard<'_, ()> {
        self.op_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Async wrappers: run the blocking operation on a worker and deliver
/// exactly one outcome to the event sink. Never call the synchronous
/// operations from a UI or event-loop thread; use these instead.
#[cfg(feature = "tokio-runtime")]
impl QuarantineManager {
    /// Quarantines a file on a background worker.
    pub fn quarantine_file_async(
        self: &Arc<Self>,
        path: PathBuf,
        threat_name: String,
        sink: Arc<dyn EventSink>,
    ) -> OperationHandle {
        let manager = Arc::clone(self);
        self.spawn_operation(sink, OperationKind::Quarantine, move || {
            manager
                .quarantine_file(&path, &threat_name)
                .map(Some)
        })
    }

    /// Restores an entry on a background worker.
    pub fn restore_file_async(
        self: &Arc<Self>,
        id: i64,
        sink: Arc<dyn EventSink>,
    ) -> OperationHandle {
        let manager = Arc::clone(self);
        self.spawn_operation(sink, OperationKind::Restore, move || {
            manager.restore_file(id).map(Some)
        })
    }

    /// Deletes an entry on a background worker.
    pub fn delete_file_async(
        self: &Arc<Self>,
        id: i64,
        sink: Arc<dyn EventSink>,
    ) -> OperationHandle {
        let manager = Arc::clone(self);
        self.spawn_operation(sink, OperationKind::Delete, move || {
            manager.delete_file(id).map(Some)
        })
    }

    fn spawn_operation<F>(
        &self,
        sink: Arc<dyn EventSink>,
        kind: OperationKind,
        operation: F,
    ) -> OperationHandle
    where
        F: FnOnce() -> QuarantineResult<Option<QuarantineEntry>> + Send + 'static,
    {
        let handle = OperationHandle::new();
        let worker_handle = handle.clone();

        tokio::task::spawn_blocking(move || {
            worker_handle.set_in_progress();

            let outcome = match operation() {
                Ok(entry) => OperationOutcome::success(kind, entry),
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "background operation failed");
                    OperationOutcome::failure(kind, &e)
                }
            };

            worker_handle.set_complete(outcome.clone());
            sink.post(outcome);
        });

        handle
    }
}

fn db_err(e: DatabaseError) -> QuarantineError {
    QuarantineError::database(e.to_string())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{FileOperationError, QuarantineStatus};
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn make_manager(dir: &TempDir) -> QuarantineManager {
        QuarantineManager::builder()
            .quarantine_dir(dir.path().join("quarantine"))
            .database_path(dir.path().join("meta/quarantine.db"))
            .build()
            .unwrap()
    }

    fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_builder_requires_paths() {
        assert!(QuarantineManager::builder().build().is_err());
        assert!(QuarantineManager::builder()
            .quarantine_dir("/tmp/q")
            .build()
            .is_err());
    }

    #[test]
    fn test_quarantine_restore_roundtrip() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);
        let source = write_file(&dir, "report.xls", b"macro payload");

        let entry = manager.quarantine_file(&source, "Macro.Dropper").unwrap();
        assert!(!source.exists());
        assert_eq!(manager.get_entry_count().unwrap(), 1);
        assert_eq!(entry.threat_name, "Macro.Dropper");

        let restored = manager.restore_file(entry.id).unwrap();
        assert_eq!(restored.id, entry.id);
        assert_eq!(std::fs::read(&source).unwrap(), b"macro payload");
        assert_eq!(manager.get_entry_count().unwrap(), 0);
    }

    #[test]
    fn test_quarantine_same_path_twice_yields_distinct_entries() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);

        let source = write_file(&dir, "recurring.exe", b"first infection");
        let first = manager.quarantine_file(&source, "X").unwrap();

        let source = write_file(&dir, "recurring.exe", b"second infection");
        let second = manager.quarantine_file(&source, "X").unwrap();

        assert_ne!(first.id, second.id);
        assert_ne!(first.quarantine_path, second.quarantine_path);
        assert_eq!(first.original_path, second.original_path);
        assert_eq!(manager.get_entry_count().unwrap(), 2);
    }

    #[test]
    fn test_quarantine_rejects_file_already_in_quarantine() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);
        let source = write_file(&dir, "twice.bin", b"data");

        let entry = manager.quarantine_file(&source, "X").unwrap();
        let result =
            manager.quarantine_file(Path::new(&entry.quarantine_path), "X");
        assert!(matches!(
            result,
            Err(QuarantineError::AlreadyQuarantined { .. })
        ));
    }

    #[test]
    fn test_restore_unknown_entry() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);

        let result = manager.restore_file(12345);
        assert!(matches!(result, Err(QuarantineError::EntryNotFound { .. })));
    }

    #[test]
    fn test_restore_refuses_tampered_file() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);
        let source = write_file(&dir, "victim.bin", b"pristine");

        let entry = manager.quarantine_file(&source, "X").unwrap();

        // Corrupt the quarantined copy behind the API's back.
        let qpath = Path::new(&entry.quarantine_path);
        std::fs::set_permissions(qpath, std::fs::Permissions::from_mode(0o600)).unwrap();
        std::fs::write(qpath, b"tampered").unwrap();

        let result = manager.restore_file(entry.id);
        assert!(matches!(
            result,
            Err(QuarantineError::FileOperation(
                FileOperationError::HashMismatch { .. }
            ))
        ));
        // Not restored, still quarantined.
        assert!(!source.exists());
        assert!(qpath.exists());
        assert_eq!(manager.get_entry_count().unwrap(), 1);
    }

    #[test]
    fn test_restore_rejects_tampered_destination() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);

        for protected in ["/etc/x", "/var/x", "/usr/x", "/bin/x", "/root/x"] {
            let source = write_file(&dir, "mobile.bin", b"data");
            let entry = manager.quarantine_file(&source, "X").unwrap();

            // Simulate database tampering: repoint the original path at a
            // protected directory.
            let conn =
                rusqlite::Connection::open(dir.path().join("meta/quarantine.db")).unwrap();
            conn.execute(
                "UPDATE quarantine_entries SET original_path = ?1 WHERE id = ?2",
                rusqlite::params![protected, entry.id],
            )
            .unwrap();

            let result = manager.restore_file(entry.id);
            match result {
                Err(e) => assert_eq!(e.status(), QuarantineStatus::InvalidRestorePath),
                Ok(_) => panic!("restore into {} must fail", protected),
            }
            assert!(Path::new(&entry.quarantine_path).exists());

            manager.delete_file(entry.id).unwrap();
        }
    }

    #[test]
    fn test_delete_is_terminal_and_reports_entry_not_found_after() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);
        let source = write_file(&dir, "gone.bin", b"data");

        let entry = manager.quarantine_file(&source, "X").unwrap();
        manager.delete_file(entry.id).unwrap();

        let second = manager.delete_file(entry.id);
        assert!(matches!(second, Err(QuarantineError::EntryNotFound { .. })));
        assert!(!Path::new(&entry.quarantine_path).exists());
    }

    #[test]
    fn test_total_size_accounting() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);

        write_file(&dir, "a.bin", &vec![0u8; 1000]);
        write_file(&dir, "b.bin", &vec![0u8; 2000]);
        write_file(&dir, "c.bin", &vec![0u8; 3000]);

        manager
            .quarantine_file(&dir.path().join("a.bin"), "X")
            .unwrap();
        let b = manager
            .quarantine_file(&dir.path().join("b.bin"), "X")
            .unwrap();
        manager
            .quarantine_file(&dir.path().join("c.bin"), "X")
            .unwrap();

        assert_eq!(manager.get_total_size().unwrap(), 6000);

        manager.delete_file(b.id).unwrap();
        assert_eq!(manager.get_total_size().unwrap(), 4000);
        assert_eq!(manager.get_entry_count().unwrap(), 2);
    }

    #[test]
    fn test_zero_byte_file_scenario() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);
        let source = write_file(&dir, "empty.exe", b"");

        let entry = manager.quarantine_file(&source, "EmptyThreat").unwrap();
        assert_eq!(entry.file_size, 0);
        assert_eq!(manager.get_entry_count().unwrap(), 1);
    }

    #[test]
    fn test_orphan_cleanup_removes_exactly_the_divergent_row() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);

        let a = manager
            .quarantine_file(&write_file(&dir, "a.bin", b"aa"), "X")
            .unwrap();
        let b = manager
            .quarantine_file(&write_file(&dir, "b.bin", b"bb"), "X")
            .unwrap();

        // Remove one backing file out-of-band.
        std::fs::remove_file(&a.quarantine_path).unwrap();

        let removed = manager.cleanup_orphaned_entries().unwrap();
        assert_eq!(removed, 1);
        assert!(manager.get_entry(a.id).unwrap().is_none());
        assert!(manager.get_entry(b.id).unwrap().is_some());
    }

    #[test]
    fn test_verify_entry() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);
        let entry = manager
            .quarantine_file(&write_file(&dir, "v.bin", b"vv"), "X")
            .unwrap();

        assert!(manager.verify_entry(entry.id).unwrap());

        std::fs::remove_file(&entry.quarantine_path).unwrap();
        assert!(!manager.verify_entry(entry.id).unwrap());
    }

    #[test]
    fn test_entry_lookups() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);
        let source = write_file(&dir, "find-me.bin", b"data");
        let original = source.display().to_string();

        let entry = manager.quarantine_file(&source, "X").unwrap();

        assert!(manager.entry_exists(&original).unwrap());
        let by_path = manager
            .get_entry_by_original_path(&original)
            .unwrap()
            .unwrap();
        assert_eq!(by_path.id, entry.id);

        let all = manager.get_all_entries().unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_cleanup_old_entries_deletes_files_and_rows() {
        let dir = TempDir::new().unwrap();
        let manager = make_manager(&dir);
        let entry = manager
            .quarantine_file(&write_file(&dir, "old.bin", b"old"), "X")
            .unwrap();

        // Nothing is older than 30 days yet.
        assert_eq!(manager.cleanup_old_entries(30).unwrap(), 0);
        assert!(Path::new(&entry.quarantine_path).exists());

        // A zero-day threshold ages out everything already inserted.
        assert_eq!(manager.cleanup_old_entries(0).unwrap(), 1);
        assert!(!Path::new(&entry.quarantine_path).exists());
        assert_eq!(manager.get_entry_count().unwrap(), 0);
    }

    #[test]
    fn test_periodic_cleanup_runs_and_then_respects_interval() {
        let dir = TempDir::new().unwrap();
        let manager = QuarantineManager::builder()
            .quarantine_dir(dir.path().join("quarantine"))
            .database_path(dir.path().join("meta/quarantine.db"))
            .cleanup_check_throttle(Duration::ZERO)
            .build()
            .unwrap();

        let entry = manager
            .quarantine_file(&write_file(&dir, "o.bin", b"oo"), "X")
            .unwrap();
        std::fs::remove_file(&entry.quarantine_path).unwrap();

        // Due (no bookkeeping file yet): runs and reconciles the orphan.
        let first = manager.maybe_run_periodic_cleanup().unwrap();
        assert_eq!(first, Some(1));
        assert!(dir.path().join("meta/.last_orphan_cleanup").exists());

        // Within the 24h interval: skipped.
        let second = manager.maybe_run_periodic_cleanup().unwrap();
        assert_eq!(second, None);
    }

    #[test]
    fn test_periodic_cleanup_check_is_throttled() {
        let dir = TempDir::new().unwrap();
        let manager = QuarantineManager::builder()
            .quarantine_dir(dir.path().join("quarantine"))
            .database_path(dir.path().join("meta/quarantine.db"))
            .orphan_cleanup_interval(Duration::ZERO)
            .build()
            .unwrap();

        // First call consumes the wall-clock throttle slot.
        assert!(manager.maybe_run_periodic_cleanup().unwrap().is_some());
        // Second call lands inside the 60s throttle window.
        assert_eq!(manager.maybe_run_periodic_cleanup().unwrap(), None);
    }

    #[test]
    fn test_periodic_cleanup_interval_survives_restart() {
        let dir = TempDir::new().unwrap();
        let build = || {
            QuarantineManager::builder()
                .quarantine_dir(dir.path().join("quarantine"))
                .database_path(dir.path().join("meta/quarantine.db"))
                .cleanup_check_throttle(Duration::ZERO)
                .build()
                .unwrap()
        };

        let manager = build();
        assert!(manager.maybe_run_periodic_cleanup().unwrap().is_some());
        drop(manager);

        // A fresh manager reads the persisted run time and skips.
        let manager = build();
        assert_eq!(manager.maybe_run_periodic_cleanup().unwrap(), None);
    }

    #[cfg(feature = "tokio-runtime")]
    mod async_tests {
        use super::*;
        use crate::manager::dispatch::{EventSink, NoOpEventSink, OperationOutcome};
        use std::sync::Arc;

        #[derive(Debug, Default)]
        struct CollectingSink {
            outcomes: Mutex<Vec<OperationOutcome>>,
        }

        impl EventSink for CollectingSink {
            fn post(&self, outcome: OperationOutcome) {
                self.outcomes.lock().unwrap().push(outcome);
            }
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn test_async_quarantine_delivers_one_outcome() {
            let dir = TempDir::new().unwrap();
            let manager = Arc::new(make_manager(&dir));
            let source = write_file(&dir, "bg.bin", b"data");
            let sink = Arc::new(CollectingSink::default());

            let handle = manager.quarantine_file_async(
                source.clone(),
                "Async.Threat".into(),
                sink.clone(),
            );
            let outcome = handle.wait().await;

            assert!(outcome.is_success());
            assert!(outcome.entry.is_some());
            assert!(!source.exists());

            let delivered = sink.outcomes.lock().unwrap();
            assert_eq!(delivered.len(), 1);
            assert!(delivered[0].is_success());
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn test_async_restore_reports_missing_entry() {
            let dir = TempDir::new().unwrap();
            let manager = Arc::new(make_manager(&dir));

            let handle = manager.restore_file_async(999, Arc::new(NoOpEventSink::new()));
            let outcome = handle.wait().await;

            assert_eq!(outcome.status, QuarantineStatus::EntryNotFound);
            assert!(outcome.message.is_some());
        }

        #[tokio::test(flavor = "multi_thread")]
        async fn test_async_delete_roundtrip() {
            let dir = TempDir::new().unwrap();
            let manager = Arc::new(make_manager(&dir));
            let entry = manager
                .quarantine_file(&write_file(&dir, "bg2.bin", b"data"), "X")
                .unwrap();

            let handle = manager.delete_file_async(entry.id, Arc::new(NoOpEventSink::new()));
            let outcome = handle.wait().await;

            assert!(outcome.is_success());
            assert_eq!(manager.get_entry_count().unwrap(), 0);
        }
    }
}
