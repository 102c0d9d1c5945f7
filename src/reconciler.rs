//! Resource reconciliation.
//!
//! The reconciler drives a [`ManagedResource`] through its lifecycle against
//! the control plane: create (with async handoff to the poller), read (drift
//! detection), update (in-place versus replacement), and delete (idempotent).
//! It owns no per-resource locking; the surrounding orchestration is expected
//! to serialize mutations per resource identifier, and distinct resources may
//! reconcile concurrently against one shared reconciler.
//!
//! Failure discipline: remote errors during mutations surface to the caller
//! with the resource state unchanged, so a retried apply is always safe. The
//! reconciler never reinterprets a `TaskFailed` as transient.

use crate::context::RequestContext;
use crate::error::{ReconcileError, ReconcileResult};
use crate::poller::TaskPoller;
use crate::projector::project;
use crate::remote::{ControlPlane, CreateOutcome, CreateRequest, RemoteError};
use crate::resource::desired::DesiredState;
use crate::resource::digest::StateDigest;
use crate::resource::managed::{ManagedResource, ResourceStatus};
use crate::task::AsyncTask;
use log::{debug, info, warn};
use tokio::sync::watch;

/// Outcome of a read cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The remote object does not exist (or was never created)
    Absent,
    /// Observed state matches the last known observation
    InSync,
    /// Observed state diverged from the last known observation
    Drifted,
}

/// Outcome of an update cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Desired and current state already agree; no remote call made
    NoChange,
    /// The change was applied in place
    Updated,
    /// The change touches fields the API cannot update in place; the caller
    /// must destroy and recreate. No remote call was made.
    RequiresReplacement { fields: Vec<String> },
}

/// Drives managed resources against a control plane.
#[derive(Clone)]
pub struct Reconciler<C: ControlPlane> {
    remote: C,
    poller: TaskPoller,
}

impl<C: ControlPlane> Reconciler<C> {
    pub fn new(remote: C, poller: TaskPoller) -> Self {
        Self { remote, poller }
    }

    /// The control plane this reconciler drives.
    pub fn remote(&self) -> &C {
        &self.remote
    }

    /// Create the remote object for a resource, polling any spawned task to
    /// terminal status.
    ///
    /// Safe to call repeatedly: a `Ready` resource is left alone, a
    /// `Pending` resource resumes polling its existing task instead of
    /// issuing a second create, and the control-plane idempotency key covers
    /// retries after transient create failures.
    pub async fn create(
        &self,
        resource: &mut ManagedResource,
        context: &RequestContext,
    ) -> ReconcileResult<()> {
        self.create_with_cancel(resource, context, None).await
    }

    /// [`create`](Self::create) with a cancellation signal for the polling
    /// phase.
    pub async fn create_with_cancel(
        &self,
        resource: &mut ManagedResource,
        context: &RequestContext,
        cancel: Option<&mut watch::Receiver<bool>>,
    ) -> ReconcileResult<()> {
        match resource.status() {
            ResourceStatus::Ready => {
                debug!(
                    "[{}] {} already ready, nothing to create",
                    context.request_id,
                    resource.desired().kind()
                );
                Ok(())
            }
            ResourceStatus::Failed => Err(ReconcileError::invalid(
                "resource is in failed state; delete it before recreating",
            )),
            ResourceStatus::Pending => {
                // Resume the in-flight task; never issue a duplicate create.
                info!(
                    "[{}] resuming task for pending {}",
                    context.request_id,
                    resource.desired().kind()
                );
                self.finish_pending(resource, cancel).await
            }
            ResourceStatus::Absent => {
                resource.desired().validate()?;

                let desired = resource.desired().clone();
                let request = CreateRequest {
                    resource_kind: desired.kind().to_string(),
                    idempotency_key: desired.idempotency_key(),
                    payload: desired.payload(),
                };
                info!(
                    "[{}] creating {} (key {})",
                    context.request_id, request.resource_kind, request.idempotency_key
                );

                let outcome = self
                    .remote
                    .create(request)
                    .await
                    .map_err(|e| map_remote("create", e))?;

                match outcome {
                    CreateOutcome::Completed { id, raw } => {
                        resource.mark_ready(id, project(&raw))?;
                        Ok(())
                    }
                    CreateOutcome::Accepted { id, task_id } => {
                        let Some(kind) = desired.task_kind() else {
                            return Err(ReconcileError::api(
                                "create",
                                format!(
                                    "control plane returned task {task_id} for {}, which is not an asynchronous kind",
                                    desired.kind()
                                ),
                            ));
                        };
                        resource.begin_pending(id, AsyncTask::started(task_id, kind));
                        self.finish_pending(resource, cancel).await
                    }
                }
            }
        }
    }

    /// Poll the resource's in-flight task to terminal status and settle the
    /// resource accordingly.
    async fn finish_pending(
        &self,
        resource: &mut ManagedResource,
        cancel: Option<&mut watch::Receiver<bool>>,
    ) -> ReconcileResult<()> {
        let mut task = match resource.task() {
            Some(task) => task.clone(),
            None => {
                return Err(ReconcileError::invalid(
                    "pending resource has no task to resume",
                ));
            }
        };

        match self.poller.poll_with_cancel(&self.remote, &mut task, cancel).await {
            Ok(()) => {
                resource.observe_task(task.status);
                let kind = resource.desired().kind();
                let Some(id) = resource.remote_id().map(str::to_string) else {
                    return Err(ReconcileError::invalid(
                        "pending resource has no remote id",
                    ));
                };
                let raw = self
                    .remote
                    .describe(kind, &id)
                    .await
                    .map_err(|e| map_remote("describe", e))?
                    .ok_or_else(|| ReconcileError::not_found(kind, id.clone()))?;
                resource.mark_ready(id, project(&raw))?;
                Ok(())
            }
            Err(err @ ReconcileError::TaskFailed { .. }) => {
                resource.observe_task(task.status);
                resource.mark_failed();
                warn!("task {} failed terminally: {err}", task.id);
                Err(err)
            }
            // Timeout, cancellation, and exhausted transient retries leave
            // the resource pending with its task intact for the next cycle.
            Err(err) => {
                resource.observe_task(task.status);
                debug!("task {} not terminal yet: {err}", task.id);
                Err(err)
            }
        }
    }

    /// Re-fetch remote state and refresh the observation.
    ///
    /// Remote absence is drift, not an error: the resource transitions to
    /// `Absent` and the call succeeds.
    pub async fn read(
        &self,
        resource: &mut ManagedResource,
        context: &RequestContext,
    ) -> ReconcileResult<ReadOutcome> {
        let kind = resource.desired().kind();
        let Some(id) = resource.remote_id().map(str::to_string) else {
            return Ok(ReadOutcome::Absent);
        };

        let raw = self
            .remote
            .describe(kind, &id)
            .await
            .map_err(|e| map_remote("describe", e))?;

        match raw {
            None => {
                // A pending resource's object may simply not be materialized
                // yet; its task bookkeeping must survive the read.
                if resource.status() == ResourceStatus::Pending {
                    return Ok(ReadOutcome::Absent);
                }
                info!(
                    "[{}] {kind} '{id}' vanished remotely, marking absent",
                    context.request_id
                );
                resource.mark_absent();
                Ok(ReadOutcome::Absent)
            }
            Some(raw) => {
                let observed = project(&raw);
                let drifted = match resource.last_digest() {
                    Some(previous) => *previous != StateDigest::of(&observed),
                    None => false,
                };
                resource.refresh_observation(observed);
                if drifted {
                    debug!("[{}] {kind} '{id}' drifted", context.request_id);
                    Ok(ReadOutcome::Drifted)
                } else {
                    Ok(ReadOutcome::InSync)
                }
            }
        }
    }

    /// Apply a desired-state change.
    ///
    /// Only fields the API updates in place are mutated remotely; a change
    /// touching any other field returns
    /// [`UpdateOutcome::RequiresReplacement`] without a remote call, and the
    /// resource keeps its previous desired state.
    ///
    /// `Failed` and `Pending` resources reject updates: a failed resource
    /// must be deleted first, and a pending one must finish its in-flight
    /// task (its remote object may not be materialized yet).
    pub async fn update(
        &self,
        resource: &mut ManagedResource,
        desired: DesiredState,
        context: &RequestContext,
    ) -> ReconcileResult<UpdateOutcome> {
        match resource.status() {
            ResourceStatus::Failed => {
                return Err(ReconcileError::invalid(
                    "resource is in failed state; delete it before updating",
                ));
            }
            ResourceStatus::Pending => {
                return Err(ReconcileError::invalid(
                    "resource has a task in flight; finish the pending create before updating",
                ));
            }
            ResourceStatus::Absent | ResourceStatus::Ready => {}
        }
        desired.validate()?;

        let current = resource.desired();
        if *current == desired {
            return Ok(UpdateOutcome::NoChange);
        }

        let changed = changed_fields(current.payload(), desired.payload());
        let replacement: Vec<String> = if current.kind() != desired.kind() {
            vec!["<kind>".to_string()]
        } else {
            changed
                .iter()
                .filter(|f| !current.updatable_fields().contains(&f.as_str()))
                .cloned()
                .collect()
        };
        if !replacement.is_empty() {
            return Ok(UpdateOutcome::RequiresReplacement {
                fields: replacement,
            });
        }

        let kind = resource.desired().kind();
        let Some(id) = resource.remote_id().map(str::to_string) else {
            // Nothing remote to mutate; adopt the new desired state and let
            // the next create materialize it.
            resource.set_desired(desired);
            return Ok(UpdateOutcome::Updated);
        };

        info!(
            "[{}] updating {kind} '{id}' in place ({} fields)",
            context.request_id,
            changed.len()
        );
        let raw = self
            .remote
            .update(kind, &id, desired.payload())
            .await
            .map_err(|e| map_remote("update", e))?;

        resource.set_desired(desired);
        resource.refresh_observation(project(&raw));
        Ok(UpdateOutcome::Updated)
    }

    /// Delete the remote object. Already-absent objects delete successfully.
    pub async fn delete(
        &self,
        resource: &mut ManagedResource,
        context: &RequestContext,
    ) -> ReconcileResult<()> {
        let kind = resource.desired().kind();
        let Some(id) = resource.remote_id().map(str::to_string) else {
            resource.mark_absent();
            return Ok(());
        };

        match self.remote.delete(kind, &id).await {
            Ok(existed) => {
                info!(
                    "[{}] deleted {kind} '{id}' (existed: {existed})",
                    context.request_id
                );
                resource.mark_absent();
                Ok(())
            }
            Err(RemoteError::NotFound { .. }) => {
                resource.mark_absent();
                Ok(())
            }
            Err(other) => Err(map_remote("delete", other)),
        }
    }
}

/// Top-level fields whose values differ between two payloads.
fn changed_fields(current: serde_json::Value, desired: serde_json::Value) -> Vec<String> {
    let (Some(current), Some(desired)) = (current.as_object(), desired.as_object()) else {
        return Vec::new();
    };
    let mut fields: Vec<String> = Vec::new();
    for (field, value) in desired {
        if current.get(field) != Some(value) {
            fields.push(field.clone());
        }
    }
    for field in current.keys() {
        if !desired.contains_key(field) {
            fields.push(field.clone());
        }
    }
    fields
}

fn map_remote(operation: &str, err: RemoteError) -> ReconcileError {
    match err {
        RemoteError::Transient { message } => ReconcileError::transient(operation, message),
        RemoteError::NotFound { kind, id } => ReconcileError::not_found(kind, id),
        RemoteError::Api { code, message } => {
            ReconcileError::api(operation, format!("{code}: {message}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_changed_fields_symmetric_difference() {
        let current = json!({"name": "a", "area": "gz", "description": "x"});
        let desired = json!({"name": "b", "area": "gz"});
        let mut fields = changed_fields(current, desired);
        fields.sort();
        assert_eq!(fields, vec!["description", "name"]);
    }

    #[test]
    fn test_changed_fields_empty_when_equal() {
        let payload = json!({"zone_id": "z-1"});
        assert!(changed_fields(payload.clone(), payload).is_empty());
    }
}
