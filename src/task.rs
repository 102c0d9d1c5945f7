//! Asynchronous control-plane tasks.
//!
//! Long-running cloud operations return a task handle instead of a result.
//! This module defines the typed task model: the handle, the operation kind,
//! the status enumeration parsed from the control plane's wire strings, and
//! the in-flight `AsyncTask` record the reconciler retains so an interrupted
//! poll can resume against the same task on the next cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a server-side task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TaskId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl From<String> for TaskId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The kind of long-running operation a task represents.
///
/// One-shot operations (opening an identity center zone, answering a share
/// invitation) are keyed by a zone or unit identifier, which doubles as the
/// idempotency key for the create call that spawned the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskKind {
    OpenIdentityCenter,
    AcceptShareInvitation,
    RejectShareInvitation,
    DeleteShareUnit,
}

impl TaskKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenIdentityCenter => "OpenIdentityCenter",
            Self::AcceptShareInvitation => "AcceptShareInvitation",
            Self::RejectShareInvitation => "RejectShareInvitation",
            Self::DeleteShareUnit => "DeleteShareUnit",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task status as reported by the control plane.
///
/// `Success` and `Failed` are terminal; no further transitions occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Running,
    Success,
    Failed,
}

/// Wire representations of task status accepted from the control plane.
const WIRE_RUNNING: &[&str] = &["Running", "InProgress", "TASK_STATUS_RUNNING"];
const WIRE_SUCCESS: &[&str] = &["Success", "TASK_STATUS_SUCCESS"];
const WIRE_FAILED: &[&str] = &["Failed", "TASK_STATUS_FAILED"];

impl TaskStatus {
    /// Parse a status from its wire string, `None` for unrecognized values.
    ///
    /// Unrecognized statuses are deliberately not mapped to `Failed`: an API
    /// adding a new intermediate state must not flip resources into terminal
    /// failure.
    pub fn from_wire(raw: &str) -> Option<Self> {
        if WIRE_RUNNING.contains(&raw) {
            Some(Self::Running)
        } else if WIRE_SUCCESS.contains(&raw) {
            Some(Self::Success)
        } else if WIRE_FAILED.contains(&raw) {
            Some(Self::Failed)
        } else {
            None
        }
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "Running",
            Self::Success => "Success",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// An in-flight server-side task tracked by the reconciler.
///
/// Created when a remote create returns a task handle; retained while the
/// resource is `Pending`; discarded once a terminal status is consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsyncTask {
    pub id: TaskId,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub last_polled_at: Option<DateTime<Utc>>,
}

impl AsyncTask {
    /// Record a freshly started task.
    pub fn started(id: TaskId, kind: TaskKind) -> Self {
        Self {
            id,
            kind,
            status: TaskStatus::Running,
            created_at: Utc::now(),
            last_polled_at: None,
        }
    }

    /// Record the status seen by a poll.
    pub fn observe(&mut self, status: TaskStatus) {
        self.status = status;
        self.last_polled_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_parsing() {
        assert_eq!(TaskStatus::from_wire("Success"), Some(TaskStatus::Success));
        assert_eq!(
            TaskStatus::from_wire("TASK_STATUS_SUCCESS"),
            Some(TaskStatus::Success)
        );
        assert_eq!(TaskStatus::from_wire("Failed"), Some(TaskStatus::Failed));
        assert_eq!(
            TaskStatus::from_wire("InProgress"),
            Some(TaskStatus::Running)
        );
    }

    #[test]
    fn test_unknown_wire_status_is_not_failure() {
        assert_eq!(TaskStatus::from_wire("Queued"), None);
        assert_eq!(TaskStatus::from_wire(""), None);
    }

    #[test]
    fn test_terminality() {
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_observe_updates_poll_timestamp() {
        let mut task = AsyncTask::started(TaskId::from("t-1"), TaskKind::OpenIdentityCenter);
        assert!(task.last_polled_at.is_none());
        task.observe(TaskStatus::Running);
        assert!(task.last_polled_at.is_some());
        assert_eq!(task.status, TaskStatus::Running);
    }
}
