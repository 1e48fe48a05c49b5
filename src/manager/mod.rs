//! Orchestration of quarantine operations.

pub mod dispatch;
pub mod handle;
pub mod quarantine_manager;

pub use dispatch::{EventSink, NoOpEventSink, OperationKind, OperationOutcome};
pub use handle::{OperationHandle, OperationState};
pub use quarantine_manager::{QuarantineConfig, QuarantineManager, QuarantineManagerBuilder};
