//! Error types for reconciliation operations.
//!
//! Every failure the driver can surface is classified into one of a small set
//! of kinds, because the retry policy is driven entirely by the kind:
//! transient failures are retried with backoff, timeouts leave the resource
//! resumable, and task failures are terminal.

use crate::task::TaskId;

/// Main error type for reconciliation operations.
///
/// The variant is the contract: callers (and the reconciler itself) branch on
/// the error kind, never on message contents. `TaskFailed` always carries the
/// remote operation's native error message verbatim so apply-time failures
/// are attributable to the cloud task that produced them.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Malformed desired-state input; no remote call was attempted
    #[error("Invalid desired state: {message}")]
    Invalid { message: String },

    /// Network-level or 5xx failure; safe to retry with backoff
    #[error("Transient remote failure during {operation}: {message}")]
    Transient { operation: String, message: String },

    /// Polling exceeded its deadline; the task is still in flight and the
    /// resource remains `Pending`, resumable on the next reconcile
    #[error("Timed out waiting for task {task_id} after {waited_secs}s")]
    Timeout { task_id: TaskId, waited_secs: u64 },

    /// The remote task reached terminal failure; not retried
    #[error("Task {task_id} failed: {message}")]
    TaskFailed { task_id: TaskId, message: String },

    /// The remote object does not exist
    #[error("Remote object not found: {kind} with id '{id}'")]
    NotFound { kind: String, id: String },

    /// A cancellation signal was observed between polling intervals; the
    /// resource remains `Pending` like a timeout
    #[error("Polling of task {task_id} was cancelled")]
    Cancelled { task_id: TaskId },

    /// Remote API rejected the request with a non-retryable error
    #[error("Remote API error during {operation}: {message}")]
    Api { operation: String, message: String },
}

impl ReconcileError {
    /// Create an invalid-input error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Create a transient error for the named operation.
    pub fn transient(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transient {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a not-found error.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Create a remote API error for the named operation.
    pub fn api(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Whether a subsequent reconcile may safely resume this operation
    /// without duplicating remote work.
    pub fn is_resumable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Cancelled { .. } | Self::Transient { .. }
        )
    }

    /// Whether this error marks the resource permanently `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::TaskFailed { .. })
    }
}

/// Result alias for reconciliation operations.
pub type ReconcileResult<T> = Result<T, ReconcileError>;
