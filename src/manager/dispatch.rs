//! The dispatch boundary between background workers and a UI event loop.
//!
//! The manager's blocking operations must never run on a UI thread, so
//! the async wrappers execute them on a worker and deliver exactly one
//! [`OperationOutcome`] through an [`EventSink`]. A GUI host implements
//! `EventSink` with its event-loop "post" primitive; headless hosts can
//! use [`NoOpEventSink`] and rely on the returned handle instead.

use crate::core::entry::QuarantineEntry;
use crate::core::error::{QuarantineError, QuarantineStatus};

use serde::{Deserialize, Serialize};

/// Which manager operation an outcome belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// `quarantine_file`
    Quarantine,
    /// `restore_file`
    Restore,
    /// `delete_file`
    Delete,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Quarantine => "quarantine",
            Self::Restore => "restore",
            Self::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// Terminal result of a background quarantine operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationOutcome {
    /// The operation that finished.
    pub kind: OperationKind,
    /// Flat status for UI display.
    pub status: QuarantineStatus,
    /// Human-readable failure message, absent on success.
    pub message: Option<String>,
    /// The affected entry, when the operation produced or resolved one.
    pub entry: Option<QuarantineEntry>,
}

impl OperationOutcome {
    /// Builds a success outcome.
    pub fn success(kind: OperationKind, entry: Option<QuarantineEntry>) -> Self {
        Self {
            kind,
            status: QuarantineStatus::Success,
            message: None,
            entry,
        }
    }

    /// Builds a failure outcome from a manager error.
    pub fn failure(kind: OperationKind, error: &QuarantineError) -> Self {
        Self {
            kind,
            status: error.status(),
            message: Some(error.to_string()),
            entry: None,
        }
    }

    /// Returns `true` if the operation succeeded.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Delivery primitive for results of background operations.
///
/// Implementations must be cheap and non-blocking: `post` is called from
/// a worker thread exactly once per operation.
pub trait EventSink: Send + Sync + std::fmt::Debug {
    /// Delivers one finished outcome to the consuming thread.
    fn post(&self, outcome: OperationOutcome);
}

/// An `EventSink` that drops every outcome.
///
/// Useful for headless hosts that only consume the operation handle.
#[derive(Debug, Default)]
pub struct NoOpEventSink;

impl NoOpEventSink {
    /// Creates a new no-op sink.
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for NoOpEventSink {
    fn post(&self, outcome: OperationOutcome) {
        tracing::debug!(
            kind = %outcome.kind,
            status = %outcome.status,
            "operation outcome dropped by no-op sink"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_constructors() {
        let ok = OperationOutcome::success(OperationKind::Quarantine, None);
        assert!(ok.is_success());
        assert!(ok.message.is_none());

        let err = QuarantineError::entry_not_found(7);
        let failed = OperationOutcome::failure(OperationKind::Restore, &err);
        assert_eq!(failed.status, QuarantineStatus::EntryNotFound);
        assert!(failed.message.unwrap().contains('7'));
    }

    #[test]
    fn test_noop_sink_accepts_outcomes() {
        let sink = NoOpEventSink::new();
        sink.post(OperationOutcome::success(OperationKind::Delete, None));
    }
}
