//! Handle for background quarantine operations.

use crate::manager::dispatch::OperationOutcome;

use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// A handle to a quarantine operation running on a background worker.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    /// Unique identifier for this operation.
    pub id: String,
    /// Shared state of the operation.
    state: Arc<RwLock<OperationState>>,
}

impl OperationHandle {
    /// Creates a new handle in the pending state.
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            state: Arc::new(RwLock::new(OperationState::Pending)),
        }
    }

    /// Returns the current state of the operation.
    pub fn state(&self) -> OperationState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Returns `true` once the operation has finished, in any status.
    pub fn is_complete(&self) -> bool {
        matches!(self.state(), OperationState::Complete { .. })
    }

    /// Returns `true` while the operation has not started yet.
    pub fn is_pending(&self) -> bool {
        matches!(self.state(), OperationState::Pending)
    }

    pub(crate) fn set_in_progress(&self) {
        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = OperationState::InProgress;
    }

    pub(crate) fn set_complete(&self, outcome: OperationOutcome) {
        *self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = OperationState::Complete {
            outcome: Box::new(outcome),
        };
    }

    /// Waits for the operation to finish and returns its outcome.
    #[cfg(feature = "tokio-runtime")]
    pub async fn wait(self) -> OperationOutcome {
        loop {
            if let OperationState::Complete { outcome } = self.state() {
                return *outcome;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

/// State of a background quarantine operation.
#[derive(Debug, Clone)]
pub enum OperationState {
    /// Waiting for a worker.
    Pending,
    /// Currently executing.
    InProgress,
    /// Finished; the outcome carries the terminal status.
    Complete {
        /// The operation's result.
        outcome: Box<OperationOutcome>,
    },
}
