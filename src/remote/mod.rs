//! Control-plane abstraction layer.
//!
//! The cloud control plane is an opaque collaborator: it accepts create,
//! describe, update, and delete calls for remote objects, returns JSON-like
//! payloads, and for long-running operations returns a task handle instead of
//! a result. This module defines the trait the reconciler drives and the
//! error classification it depends on.
//!
//! The trait is deliberately protocol-agnostic. It has no awareness of
//! desired-state validation, attribute projection, or status bookkeeping;
//! those live above it in the reconciler and projector. The split mirrors the
//! separation between raw persistence and business logic: the control plane
//! moves payloads, the reconciler decides what they mean.

pub mod in_memory;

pub use in_memory::{InMemoryControlPlane, TaskScript};

use crate::task::TaskId;
use serde_json::Value;
use std::future::Future;

/// Errors surfaced by control-plane calls, pre-classified for retry policy.
///
/// The reconciler and poller branch on the variant: `Transient` is retried
/// with backoff, `NotFound` is drift on read and success on delete, `Api` is
/// surfaced immediately.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemoteError {
    /// Network-level failure or 5xx response; safe to retry
    #[error("transient failure: {message}")]
    Transient { message: String },

    /// The addressed remote object does not exist
    #[error("not found: {kind} '{id}'")]
    NotFound { kind: String, id: String },

    /// The API rejected the request; not retryable
    #[error("api error {code}: {message}")]
    Api { code: String, message: String },
}

impl RemoteError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// A create request against the control plane.
///
/// The idempotency key is chosen by the caller (a zone name, a unit id) and
/// guarantees a repeated create does not produce a second remote object.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    /// Remote object type, e.g. "IdentityCenterInstance"
    pub resource_kind: String,
    /// At-most-once key for this create
    pub idempotency_key: String,
    /// Request payload as the API expects it
    pub payload: Value,
}

/// Result of a create call.
///
/// Control planes answer a create either synchronously with the finished
/// object, or asynchronously with a task handle to poll.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
    /// The object exists and its payload is final
    Completed { id: String, raw: Value },
    /// A server-side task is materializing the object
    Accepted { id: String, task_id: TaskId },
}

impl CreateOutcome {
    /// The remote object id, regardless of completion mode.
    pub fn id(&self) -> &str {
        match self {
            Self::Completed { id, .. } => id,
            Self::Accepted { id, .. } => id,
        }
    }
}

/// A task status report as returned by the control plane.
///
/// The status is the raw wire string; interpretation (including tolerance of
/// unrecognized values) belongs to the poller.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub status: String,
    /// Native error message, populated when the task failed
    pub error_message: Option<String>,
}

/// The remote control plane the reconciler drives.
///
/// Implementations must be safe for concurrent use across distinct object
/// and task identifiers; the driver never issues concurrent mutations for
/// the same identifier.
pub trait ControlPlane: Send + Sync {
    /// Create a remote object, or return the existing one when the
    /// idempotency key was already used.
    fn create(
        &self,
        request: CreateRequest,
    ) -> impl Future<Output = Result<CreateOutcome, RemoteError>> + Send;

    /// Fetch the current payload of a remote object.
    ///
    /// Returns `Ok(None)` when the object does not exist; absence on read is
    /// an answer, not an error.
    fn describe(
        &self,
        kind: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Value>, RemoteError>> + Send;

    /// Apply an in-place update and return the resulting payload.
    fn update(
        &self,
        kind: &str,
        id: &str,
        patch: Value,
    ) -> impl Future<Output = Result<Value, RemoteError>> + Send;

    /// Delete a remote object.
    ///
    /// Returns `true` if the object existed, `false` if it was already
    /// absent. Absence is not an error.
    fn delete(&self, kind: &str, id: &str) -> impl Future<Output = Result<bool, RemoteError>> + Send;

    /// Query the status of a server-side task.
    fn describe_task(
        &self,
        task_id: &TaskId,
    ) -> impl Future<Output = Result<TaskReport, RemoteError>> + Send;
}
