//! Integration tests for the reconciler lifecycle against the in-memory
//! control plane: create (sync and async), at-most-once semantics, resume
//! after timeout, drift detection, update planning, and idempotent delete.

use cloud_reconciler::remote::{InMemoryControlPlane, TaskScript};
use cloud_reconciler::resource::{DesiredState, ManagedResource, ResourceStatus};
use cloud_reconciler::{
    PollConfig, ReadOutcome, ReconcileError, Reconciler, RequestContext, RetryConfig, TaskPoller,
    UpdateOutcome,
};
use serde_json::json;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fast_poller(timeout_ms: u64) -> TaskPoller {
    TaskPoller::new(PollConfig {
        timeout: Duration::from_millis(timeout_ms),
        interval: Duration::from_millis(1),
        retry: RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_multiplier: 2.0,
        },
    })
}

fn share_unit(name: &str) -> DesiredState {
    DesiredState::ShareUnit {
        name: name.to_string(),
        area: "ap-guangzhou".to_string(),
        description: None,
    }
}

fn identity_center() -> DesiredState {
    DesiredState::IdentityCenter {
        zone_name: "test".to_string(),
    }
}

#[tokio::test]
async fn test_synchronous_create_reaches_ready() {
    init_logging();
    let remote = InMemoryControlPlane::new();
    let reconciler = Reconciler::new(remote, fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut unit = ManagedResource::new(share_unit("finance"));
    reconciler.create(&mut unit, &context).await.unwrap();

    assert_eq!(unit.status(), ResourceStatus::Ready);
    assert!(unit.remote_id().is_some());
    assert_eq!(unit.observed().get_str("area"), Some("ap-guangzhou"));
}

#[tokio::test]
async fn test_async_create_polls_task_to_ready() {
    let remote = InMemoryControlPlane::new();
    remote
        .script_async_create("IdentityCenterInstance", TaskScript::SucceedAfter(2))
        .await;
    let reconciler = Reconciler::new(remote.clone(), fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut zone = ManagedResource::new(identity_center());
    reconciler.create(&mut zone, &context).await.unwrap();

    assert_eq!(zone.status(), ResourceStatus::Ready);
    assert!(zone.task().is_none());
    let id = zone.remote_id().unwrap();
    assert!(remote.object_exists("IdentityCenterInstance", id).await);
    assert_eq!(zone.observed().get_str("zone_name"), Some("test"));
}

#[tokio::test]
async fn test_create_is_at_most_once_per_idempotency_key() {
    let remote = InMemoryControlPlane::new();
    let reconciler = Reconciler::new(remote.clone(), fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut first = ManagedResource::new(share_unit("finance"));
    let mut second = ManagedResource::new(share_unit("finance"));
    reconciler.create(&mut first, &context).await.unwrap();
    reconciler.create(&mut second, &context).await.unwrap();

    // Same key, same remote object; two creates did not duplicate it
    assert_eq!(first.remote_id(), second.remote_id());
    assert_eq!(remote.create_calls().await, 2);

    // Creating an already-ready resource is a no-op, not a third call
    reconciler.create(&mut first, &context).await.unwrap();
    assert_eq!(remote.create_calls().await, 2);
}

#[tokio::test]
async fn test_timeout_leaves_pending_and_resume_reuses_task() {
    init_logging();
    let remote = InMemoryControlPlane::new();
    remote
        .script_async_create("IdentityCenterInstance", TaskScript::SucceedAfter(50))
        .await;
    let context = RequestContext::with_generated_id();

    // First reconcile times out long before 50 polls complete
    let impatient = Reconciler::new(remote.clone(), fast_poller(5));
    let mut zone = ManagedResource::new(identity_center());
    let err = impatient.create(&mut zone, &context).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Timeout { .. }));
    assert_eq!(zone.status(), ResourceStatus::Pending);
    let task_id = zone.task().unwrap().id.clone();
    assert_eq!(remote.create_calls().await, 1);

    // Second reconcile resumes the same task instead of re-creating
    let patient = Reconciler::new(remote.clone(), fast_poller(30_000));
    patient.create(&mut zone, &context).await.unwrap();
    assert_eq!(zone.status(), ResourceStatus::Ready);
    assert_eq!(remote.create_calls().await, 1);
    assert!(remote.poll_calls(&task_id).await > 1);
}

#[tokio::test]
async fn test_task_failure_is_sticky() {
    let remote = InMemoryControlPlane::new();
    remote
        .script_async_create(
            "IdentityCenterInstance",
            TaskScript::FailAfter {
                polls: 1,
                message: "identity center already open in another region".to_string(),
            },
        )
        .await;
    let reconciler = Reconciler::new(remote, fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut zone = ManagedResource::new(identity_center());
    let err = reconciler.create(&mut zone, &context).await.unwrap_err();
    match &err {
        ReconcileError::TaskFailed { message, .. } => {
            assert_eq!(message, "identity center already open in another region");
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
    assert_eq!(zone.status(), ResourceStatus::Failed);

    // No silent retry into ready
    let err = reconciler.create(&mut zone, &context).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Invalid { .. }));
    assert_eq!(zone.status(), ResourceStatus::Failed);
}

#[tokio::test]
async fn test_delete_then_read_yields_absent() {
    let remote = InMemoryControlPlane::new();
    let reconciler = Reconciler::new(remote, fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut unit = ManagedResource::new(share_unit("finance"));
    reconciler.create(&mut unit, &context).await.unwrap();

    reconciler.delete(&mut unit, &context).await.unwrap();
    assert_eq!(unit.status(), ResourceStatus::Absent);
    assert_eq!(
        reconciler.read(&mut unit, &context).await.unwrap(),
        ReadOutcome::Absent
    );

    // Deleting again is success, not an error
    reconciler.delete(&mut unit, &context).await.unwrap();
    assert_eq!(unit.status(), ResourceStatus::Absent);
}

#[tokio::test]
async fn test_read_detects_remote_disappearance_as_drift() {
    let remote = InMemoryControlPlane::new();
    let reconciler = Reconciler::new(remote.clone(), fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut unit = ManagedResource::new(share_unit("finance"));
    reconciler.create(&mut unit, &context).await.unwrap();
    let id = unit.remote_id().unwrap().to_string();

    remote.remove_object("ShareUnit", &id).await;
    assert_eq!(
        reconciler.read(&mut unit, &context).await.unwrap(),
        ReadOutcome::Absent
    );
    assert_eq!(unit.status(), ResourceStatus::Absent);
    assert!(unit.observed().is_empty());
}

#[tokio::test]
async fn test_read_detects_out_of_band_change() {
    let remote = InMemoryControlPlane::new();
    let reconciler = Reconciler::new(remote.clone(), fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut unit = ManagedResource::new(share_unit("finance"));
    reconciler.create(&mut unit, &context).await.unwrap();
    let id = unit.remote_id().unwrap().to_string();

    assert_eq!(
        reconciler.read(&mut unit, &context).await.unwrap(),
        ReadOutcome::InSync
    );

    remote
        .seed_object(
            "ShareUnit",
            &id,
            json!({"name": "finance", "area": "ap-shanghai", "description": null}),
        )
        .await;
    assert_eq!(
        reconciler.read(&mut unit, &context).await.unwrap(),
        ReadOutcome::Drifted
    );
    assert_eq!(unit.observed().get_str("area"), Some("ap-shanghai"));
}

#[tokio::test]
async fn test_update_in_place_for_updatable_fields() {
    let remote = InMemoryControlPlane::new();
    let reconciler = Reconciler::new(remote, fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut unit = ManagedResource::new(share_unit("finance"));
    reconciler.create(&mut unit, &context).await.unwrap();

    let renamed = DesiredState::ShareUnit {
        name: "finance-eu".to_string(),
        area: "ap-guangzhou".to_string(),
        description: None,
    };
    let outcome = reconciler.update(&mut unit, renamed, &context).await.unwrap();
    assert_eq!(outcome, UpdateOutcome::Updated);
    assert_eq!(unit.observed().get_str("name"), Some("finance-eu"));
}

#[tokio::test]
async fn test_update_outside_updatable_set_requires_replacement() {
    let remote = InMemoryControlPlane::new();
    let reconciler = Reconciler::new(remote.clone(), fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut unit = ManagedResource::new(share_unit("finance"));
    reconciler.create(&mut unit, &context).await.unwrap();

    let moved = DesiredState::ShareUnit {
        name: "finance".to_string(),
        area: "ap-shanghai".to_string(),
        description: None,
    };
    let outcome = reconciler.update(&mut unit, moved, &context).await.unwrap();
    match outcome {
        UpdateOutcome::RequiresReplacement { fields } => {
            assert_eq!(fields, vec!["area".to_string()]);
        }
        other => panic!("expected RequiresReplacement, got {other:?}"),
    }

    // No remote mutation happened and the desired state was not adopted
    assert_eq!(unit.observed().get_str("area"), Some("ap-guangzhou"));
    assert_eq!(
        unit.desired(),
        &share_unit("finance"),
        "replacement must leave the desired state untouched"
    );
}

#[tokio::test]
async fn test_update_rejected_while_task_in_flight() {
    let remote = InMemoryControlPlane::new();
    remote
        .script_async_create("IdentityCenterInstance", TaskScript::SucceedAfter(50))
        .await;
    let context = RequestContext::with_generated_id();

    // Time out quickly so the resource is left pending with a live task
    let impatient = Reconciler::new(remote.clone(), fast_poller(5));
    let mut zone = ManagedResource::new(identity_center());
    let _ = impatient.create(&mut zone, &context).await.unwrap_err();
    assert_eq!(zone.status(), ResourceStatus::Pending);

    let renamed = DesiredState::IdentityCenter {
        zone_name: "renamed".to_string(),
    };
    let err = impatient
        .update(&mut zone, renamed, &context)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Invalid { .. }));
    // Bookkeeping survives: still pending, same desired state, task intact
    assert_eq!(zone.status(), ResourceStatus::Pending);
    assert_eq!(zone.desired(), &identity_center());
    assert!(zone.task().is_some());
}

#[tokio::test]
async fn test_update_rejected_after_task_failure() {
    let remote = InMemoryControlPlane::new();
    remote
        .script_async_create(
            "IdentityCenterInstance",
            TaskScript::FailAfter {
                polls: 1,
                message: "zone name already taken".to_string(),
            },
        )
        .await;
    let reconciler = Reconciler::new(remote, fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut zone = ManagedResource::new(identity_center());
    let _ = reconciler.create(&mut zone, &context).await.unwrap_err();
    assert_eq!(zone.status(), ResourceStatus::Failed);

    let renamed = DesiredState::IdentityCenter {
        zone_name: "renamed".to_string(),
    };
    let err = reconciler
        .update(&mut zone, renamed, &context)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Invalid { .. }));
    // Failed stays sticky and the new desired state was not adopted
    assert_eq!(zone.status(), ResourceStatus::Failed);
    assert_eq!(zone.desired(), &identity_center());
}

#[tokio::test]
async fn test_no_change_update_makes_no_remote_call() {
    let remote = InMemoryControlPlane::new();
    let reconciler = Reconciler::new(remote, fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut unit = ManagedResource::new(share_unit("finance"));
    reconciler.create(&mut unit, &context).await.unwrap();

    let outcome = reconciler
        .update(&mut unit, share_unit("finance"), &context)
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::NoChange);
}

#[tokio::test]
async fn test_transient_create_failure_leaves_state_unchanged() {
    let remote = InMemoryControlPlane::new();
    remote.inject_transient("create", 1).await;
    let reconciler = Reconciler::new(remote, fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut unit = ManagedResource::new(share_unit("finance"));
    let err = reconciler.create(&mut unit, &context).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Transient { .. }));
    assert_eq!(unit.status(), ResourceStatus::Absent);
    assert!(unit.observed().is_empty());

    // Retry after the transient failure succeeds cleanly
    reconciler.create(&mut unit, &context).await.unwrap();
    assert_eq!(unit.status(), ResourceStatus::Ready);
}

#[tokio::test]
async fn test_invalid_desired_state_never_reaches_remote() {
    let remote = InMemoryControlPlane::new();
    let reconciler = Reconciler::new(remote.clone(), fast_poller(5_000));
    let context = RequestContext::with_generated_id();

    let mut bad = ManagedResource::new(DesiredState::IdentityCenter {
        zone_name: String::new(),
    });
    let err = reconciler.create(&mut bad, &context).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Invalid { .. }));
    assert_eq!(remote.create_calls().await, 0);
}
