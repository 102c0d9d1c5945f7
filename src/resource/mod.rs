//! Resource model for the reconciliation driver.
//!
//! Split into focused modules:
//! - `desired` - typed desired-state variants with boundary validation
//! - `observed` - flattened observed attributes with an explicit unset marker
//! - `digest` - content digest of observed state for drift detection
//! - `managed` - the managed resource and its status state machine

pub mod desired;
pub mod digest;
pub mod managed;
pub mod observed;

pub use desired::{DesiredState, InvitationResponse};
pub use digest::StateDigest;
pub use managed::{ManagedResource, ResourceStatus};
pub use observed::{AttributeValue, ObservedAttributes};
