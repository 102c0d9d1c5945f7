//! Request context for reconciliation operations.
//!
//! Every reconcile cycle carries a request id so log lines from the
//! reconciler and poller can be correlated across the create/poll/project
//! sequence of a single apply.

use uuid::Uuid;

/// Request context threaded through reconciliation operations.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Unique identifier for this reconcile cycle
    pub request_id: String,
}

impl RequestContext {
    /// Create a context with a specific request ID.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
        }
    }

    /// Create a context with a generated request ID.
    pub fn with_generated_id() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::with_generated_id()
    }
}
