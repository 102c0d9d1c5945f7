//! Reconciliation driver for eventually-consistent cloud control planes.
//!
//! Declarative provisioning tools wrap cloud APIs whose mutating operations
//! are frequently asynchronous: a create returns a task handle, and the
//! object only exists once that task reports success. This crate implements
//! the driver such a tool needs:
//!
//! - [`Reconciler`] - drives a managed resource through
//!   create/read/update/delete, delegating long-running steps to the poller
//! - [`TaskPoller`] - polls a server-side task to terminal status with
//!   bounded transient-failure retry, timeout, and cancellation
//! - [`projector::project`] - pure, deterministic projection of raw API
//!   responses into a flattened observed-attribute surface
//!
//! # Quick Start
//!
//! ```rust
//! use cloud_reconciler::remote::InMemoryControlPlane;
//! use cloud_reconciler::resource::{DesiredState, ManagedResource, ResourceStatus};
//! use cloud_reconciler::{Reconciler, RequestContext, TaskPoller};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let remote = InMemoryControlPlane::new();
//! let reconciler = Reconciler::new(remote, TaskPoller::default());
//!
//! let mut unit = ManagedResource::new(DesiredState::ShareUnit {
//!     name: "finance".to_string(),
//!     area: "ap-guangzhou".to_string(),
//!     description: None,
//! });
//! reconciler.create(&mut unit, &RequestContext::with_generated_id()).await?;
//! assert_eq!(unit.status(), ResourceStatus::Ready);
//! # Ok(())
//! # }
//! ```
//!
//! Reconciliation is serialized per resource identifier by caller
//! discipline; the crate takes no internal locks. Distinct resources may be
//! reconciled concurrently against one shared [`Reconciler`].

pub mod context;
pub mod error;
pub mod identifier;
pub mod poller;
pub mod projector;
pub mod reconciler;
pub mod remote;
pub mod resource;
pub mod retry;
pub mod task;

// Re-export commonly used types for convenience
pub use context::RequestContext;
pub use error::{ReconcileError, ReconcileResult};
pub use identifier::CompositeId;
pub use poller::{PollConfig, TaskPoller};
pub use reconciler::{ReadOutcome, Reconciler, UpdateOutcome};
pub use resource::{
    AttributeValue, DesiredState, InvitationResponse, ManagedResource, ObservedAttributes,
    ResourceStatus, StateDigest,
};
pub use retry::{RetryConfig, retry_with_backoff};
pub use task::{AsyncTask, TaskId, TaskKind, TaskStatus};
