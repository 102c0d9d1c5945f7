//! Managed resource state.
//!
//! A [`ManagedResource`] tracks one unit of desired/observed infrastructure
//! state through the status machine `Absent -> Pending -> {Ready | Failed}
//! -> Absent` (delete returns any state to `Absent`). Transitions are only
//! available as invariant-checking methods; the reconciler owns the resource
//! and is the only mutator.

use crate::error::{ReconcileError, ReconcileResult};
use crate::resource::desired::DesiredState;
use crate::resource::digest::StateDigest;
use crate::resource::observed::ObservedAttributes;
use crate::task::{AsyncTask, TaskStatus};
use std::fmt;

/// Lifecycle status of a managed resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    /// Not present remotely (initial state, post-delete, and drift target)
    Absent,
    /// A create or long-running task is in flight
    Pending,
    /// Remote object exists and its task (if any) succeeded
    Ready,
    /// The materializing task failed; sticky until delete
    Failed,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Absent => "Absent",
            Self::Pending => "Pending",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}

/// One unit of reconciled infrastructure state.
///
/// Owned exclusively by the reconciler; mutated only through reconcile
/// cycles. The two structural invariants are enforced here:
///
/// - a resource never reports `Ready` unless its in-flight task (if any)
///   last observed `Success`;
/// - `Failed` is sticky: no transition back to `Ready` without passing
///   through delete.
#[derive(Debug, Clone)]
pub struct ManagedResource {
    desired: DesiredState,
    status: ResourceStatus,
    remote_id: Option<String>,
    task: Option<AsyncTask>,
    observed: ObservedAttributes,
    last_digest: Option<StateDigest>,
}

impl ManagedResource {
    /// Track a new resource; starts `Absent` with nothing observed.
    pub fn new(desired: DesiredState) -> Self {
        Self {
            desired,
            status: ResourceStatus::Absent,
            remote_id: None,
            task: None,
            observed: ObservedAttributes::new(),
            last_digest: None,
        }
    }

    pub fn desired(&self) -> &DesiredState {
        &self.desired
    }

    pub fn status(&self) -> ResourceStatus {
        self.status
    }

    /// Provider-assigned remote object id, once known.
    pub fn remote_id(&self) -> Option<&str> {
        self.remote_id.as_deref()
    }

    /// The in-flight task, while `Pending`.
    pub fn task(&self) -> Option<&AsyncTask> {
        self.task.as_ref()
    }

    pub fn observed(&self) -> &ObservedAttributes {
        &self.observed
    }

    /// Digest of the last projected observation, for drift comparison.
    pub fn last_digest(&self) -> Option<&StateDigest> {
        self.last_digest.as_ref()
    }

    /// Replace the desired state (used by update planning).
    pub(crate) fn set_desired(&mut self, desired: DesiredState) {
        self.desired = desired;
    }

    /// Enter `Pending` with an in-flight task.
    pub(crate) fn begin_pending(&mut self, remote_id: String, task: AsyncTask) {
        self.remote_id = Some(remote_id);
        self.task = Some(task);
        self.status = ResourceStatus::Pending;
    }

    /// Record the latest status seen for the in-flight task.
    pub(crate) fn observe_task(&mut self, status: TaskStatus) {
        if let Some(task) = self.task.as_mut() {
            task.observe(status);
        }
    }

    /// Enter `Ready` with a fresh observation.
    ///
    /// Rejects the transition when the in-flight task has not observed
    /// `Success`, and always when the resource is `Failed`.
    pub(crate) fn mark_ready(
        &mut self,
        remote_id: String,
        observed: ObservedAttributes,
    ) -> ReconcileResult<()> {
        if self.status == ResourceStatus::Failed {
            return Err(ReconcileError::invalid(
                "a failed resource cannot become ready without delete",
            ));
        }
        if let Some(task) = &self.task {
            if task.status != TaskStatus::Success {
                return Err(ReconcileError::invalid(format!(
                    "task {} is {} but ready requires Success",
                    task.id, task.status
                )));
            }
        }
        self.remote_id = Some(remote_id);
        self.last_digest = Some(StateDigest::of(&observed));
        self.observed = observed;
        self.task = None;
        self.status = ResourceStatus::Ready;
        Ok(())
    }

    /// Enter `Failed`; the task record is discarded (terminal status was
    /// consumed).
    pub(crate) fn mark_failed(&mut self) {
        self.task = None;
        self.status = ResourceStatus::Failed;
    }

    /// Return to `Absent`, clearing all remote bookkeeping.
    pub(crate) fn mark_absent(&mut self) {
        self.remote_id = None;
        self.task = None;
        self.observed = ObservedAttributes::new();
        self.last_digest = None;
        self.status = ResourceStatus::Absent;
    }

    /// Refresh the observation on a read without a status change.
    pub(crate) fn refresh_observation(&mut self, observed: ObservedAttributes) {
        self.last_digest = Some(StateDigest::of(&observed));
        self.observed = observed;
    }
}
