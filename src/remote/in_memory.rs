//! In-memory control plane for testing and development.
//!
//! A thread-safe fake of the [`ControlPlane`] trait with scripted task
//! progressions and fault injection. It backs the integration suites:
//! create/poll call counters make at-most-once and single-confirmation
//! assertions possible, and `TaskScript` controls how many polls a task needs
//! before reaching its terminal status.
//!
//! # Example Usage
//!
//! ```rust
//! use cloud_reconciler::remote::{ControlPlane, CreateRequest, InMemoryControlPlane, TaskScript};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let remote = InMemoryControlPlane::new();
//! remote.script_async_create("IdentityCenterInstance", TaskScript::SucceedAfter(2)).await;
//!
//! let outcome = remote
//!     .create(CreateRequest {
//!         resource_kind: "IdentityCenterInstance".to_string(),
//!         idempotency_key: "zone:test".to_string(),
//!         payload: json!({"zone_name": "test"}),
//!     })
//!     .await?;
//! assert_eq!(remote.create_calls().await, 1);
//! # let _ = outcome;
//! # Ok(())
//! # }
//! ```

use crate::remote::{ControlPlane, CreateOutcome, CreateRequest, RemoteError, TaskReport};
use crate::task::TaskId;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Scripted progression for a fake server-side task.
#[derive(Debug, Clone)]
pub enum TaskScript {
    /// Report `Running` for the given number of polls, then `Success`
    SucceedAfter(u32),
    /// Report `Running` for the given number of polls, then `Failed` with
    /// the given native error message
    FailAfter { polls: u32, message: String },
    /// Never reach a terminal status
    RunForever,
}

#[derive(Debug, Clone)]
struct FakeTask {
    script: TaskScript,
    polls_seen: u32,
    /// Object materialized by this task on success
    target: (String, String),
    payload: Value,
}

#[derive(Default)]
struct Inner {
    /// (kind, id) -> payload, only for objects that currently exist
    objects: HashMap<(String, String), Value>,
    /// idempotency key -> outcome already handed out for it
    created: HashMap<String, CreateOutcome>,
    tasks: HashMap<TaskId, FakeTask>,
    /// resource kind -> script applied to new creates of that kind
    async_creates: HashMap<String, TaskScript>,
    /// resource kind -> payload returned for creates instead of the request
    /// payload (used to fake server-computed fields and query results)
    create_responses: HashMap<String, Value>,
    /// operation name -> remaining transient failures to inject
    transient_faults: HashMap<String, u32>,
    create_calls: u64,
    task_poll_calls: HashMap<TaskId, u64>,
    next_id: u64,
}

/// Thread-safe in-memory control plane.
///
/// All state lives behind one async RwLock; clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryControlPlane {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryControlPlane {
    /// Create an empty control plane with all creates synchronous.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make creates of the given resource kind asynchronous, driven by the
    /// given task script.
    pub async fn script_async_create(&self, resource_kind: &str, script: TaskScript) {
        let mut inner = self.inner.write().await;
        inner
            .async_creates
            .insert(resource_kind.to_string(), script);
    }

    /// Return the given payload for creates of the given resource kind,
    /// instead of echoing the request payload. This is how tests fake
    /// server-computed fields and query results.
    pub async fn script_create_response(&self, resource_kind: &str, response: Value) {
        let mut inner = self.inner.write().await;
        inner
            .create_responses
            .insert(resource_kind.to_string(), response);
    }

    /// Inject `count` transient failures into the named operation
    /// ("create", "describe", "update", "delete", "describe_task").
    pub async fn inject_transient(&self, operation: &str, count: u32) {
        let mut inner = self.inner.write().await;
        inner.transient_faults.insert(operation.to_string(), count);
    }

    /// Seed an object directly, bypassing create bookkeeping.
    pub async fn seed_object(&self, kind: &str, id: &str, payload: Value) {
        let mut inner = self.inner.write().await;
        inner
            .objects
            .insert((kind.to_string(), id.to_string()), payload);
    }

    /// Remove an object out-of-band, simulating drift.
    pub async fn remove_object(&self, kind: &str, id: &str) {
        let mut inner = self.inner.write().await;
        inner.objects.remove(&(kind.to_string(), id.to_string()));
    }

    /// Total create calls observed.
    pub async fn create_calls(&self) -> u64 {
        self.inner.read().await.create_calls
    }

    /// Status queries observed for a specific task.
    pub async fn poll_calls(&self, task_id: &TaskId) -> u64 {
        self.inner
            .read()
            .await
            .task_poll_calls
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }

    /// Whether an object currently exists.
    pub async fn object_exists(&self, kind: &str, id: &str) -> bool {
        self.inner
            .read()
            .await
            .objects
            .contains_key(&(kind.to_string(), id.to_string()))
    }

    fn take_fault(inner: &mut Inner, operation: &str) -> Option<RemoteError> {
        match inner.transient_faults.get_mut(operation) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Some(RemoteError::transient(format!(
                    "injected fault in {operation}"
                )))
            }
            _ => None,
        }
    }
}

impl ControlPlane for InMemoryControlPlane {
    async fn create(&self, request: CreateRequest) -> Result<CreateOutcome, RemoteError> {
        let mut inner = self.inner.write().await;
        if let Some(err) = Self::take_fault(&mut inner, "create") {
            return Err(err);
        }
        inner.create_calls += 1;

        // Idempotent replay: the same key yields the original outcome and
        // never a second object.
        if let Some(existing) = inner.created.get(&request.idempotency_key) {
            return Ok(existing.clone());
        }

        inner.next_id += 1;
        let id = format!("r-{:06}", inner.next_id);

        let stored = inner
            .create_responses
            .get(&request.resource_kind)
            .cloned()
            .unwrap_or(request.payload);

        let outcome = match inner.async_creates.get(&request.resource_kind).cloned() {
            Some(script) => {
                let task_id = TaskId::from(format!("task-{:06}", inner.next_id));
                inner.tasks.insert(
                    task_id.clone(),
                    FakeTask {
                        script,
                        polls_seen: 0,
                        target: (request.resource_kind.clone(), id.clone()),
                        payload: stored,
                    },
                );
                CreateOutcome::Accepted {
                    id: id.clone(),
                    task_id,
                }
            }
            None => {
                inner
                    .objects
                    .insert((request.resource_kind.clone(), id.clone()), stored.clone());
                CreateOutcome::Completed {
                    id: id.clone(),
                    raw: stored,
                }
            }
        };

        inner
            .created
            .insert(request.idempotency_key, outcome.clone());
        Ok(outcome)
    }

    async fn describe(&self, kind: &str, id: &str) -> Result<Option<Value>, RemoteError> {
        let mut inner = self.inner.write().await;
        if let Some(err) = Self::take_fault(&mut inner, "describe") {
            return Err(err);
        }
        Ok(inner
            .objects
            .get(&(kind.to_string(), id.to_string()))
            .cloned())
    }

    async fn update(&self, kind: &str, id: &str, patch: Value) -> Result<Value, RemoteError> {
        let mut inner = self.inner.write().await;
        if let Some(err) = Self::take_fault(&mut inner, "update") {
            return Err(err);
        }
        let key = (kind.to_string(), id.to_string());
        let Some(current) = inner.objects.get_mut(&key) else {
            return Err(RemoteError::not_found(kind, id));
        };
        if let (Some(obj), Some(patch_obj)) = (current.as_object_mut(), patch.as_object()) {
            for (field, value) in patch_obj {
                obj.insert(field.clone(), value.clone());
            }
        }
        Ok(current.clone())
    }

    async fn delete(&self, kind: &str, id: &str) -> Result<bool, RemoteError> {
        let mut inner = self.inner.write().await;
        if let Some(err) = Self::take_fault(&mut inner, "delete") {
            return Err(err);
        }
        Ok(inner
            .objects
            .remove(&(kind.to_string(), id.to_string()))
            .is_some())
    }

    async fn describe_task(&self, task_id: &TaskId) -> Result<TaskReport, RemoteError> {
        let mut inner = self.inner.write().await;
        if let Some(err) = Self::take_fault(&mut inner, "describe_task") {
            return Err(err);
        }
        *inner.task_poll_calls.entry(task_id.clone()).or_insert(0) += 1;

        let Some(task) = inner.tasks.get_mut(task_id) else {
            return Err(RemoteError::not_found("Task", task_id.as_str()));
        };
        task.polls_seen += 1;

        let (report, materialize) = match &task.script {
            TaskScript::SucceedAfter(polls) => {
                if task.polls_seen > *polls {
                    (
                        TaskReport {
                            status: "TASK_STATUS_SUCCESS".to_string(),
                            error_message: None,
                        },
                        true,
                    )
                } else {
                    (
                        TaskReport {
                            status: "InProgress".to_string(),
                            error_message: None,
                        },
                        false,
                    )
                }
            }
            TaskScript::FailAfter { polls, message } => {
                if task.polls_seen > *polls {
                    (
                        TaskReport {
                            status: "TASK_STATUS_FAILED".to_string(),
                            error_message: Some(message.clone()),
                        },
                        false,
                    )
                } else {
                    (
                        TaskReport {
                            status: "InProgress".to_string(),
                            error_message: None,
                        },
                        false,
                    )
                }
            }
            TaskScript::RunForever => (
                TaskReport {
                    status: "InProgress".to_string(),
                    error_message: None,
                },
                false,
            ),
        };

        if materialize {
            let target = task.target.clone();
            let payload = task.payload.clone();
            inner.objects.entry(target).or_insert(payload);
        }

        Ok(report)
    }
}
