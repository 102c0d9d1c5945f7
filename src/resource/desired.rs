//! Typed desired state, validated at the boundary.
//!
//! Each remotely managed resource kind has an explicit variant with a fixed
//! field list, replacing duck-typed attribute maps. Validation happens here,
//! before any remote call: a malformed desired state never reaches the
//! control plane.
//!
//! Two of the variants (`GroupListing`, `BillingSummary`) are query kinds:
//! read-only lookups whose "create" resolves the query instead of
//! materializing an object. Every field of a query kind is updatable in
//! place, since changing it merely re-resolves.

use crate::error::{ReconcileError, ReconcileResult};
use crate::identifier::CompositeId;
use crate::task::TaskKind;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Answer to a share-unit invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvitationResponse {
    Accept,
    Reject,
}

/// Desired state of a managed resource, one variant per resource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DesiredState {
    /// Open an identity center zone (asynchronous, one-shot per zone name)
    IdentityCenter { zone_name: String },

    /// A resource-sharing unit within an organization
    ShareUnit {
        name: String,
        area: String,
        description: Option<String>,
    },

    /// Answer an invitation into a share unit (asynchronous, one-shot per
    /// unit)
    ShareUnitInvitation {
        unit_id: CompositeId,
        response: InvitationResponse,
    },

    /// Bind an identity-center policy to organization members
    MemberPolicy {
        policy_name: String,
        policy_type: String,
        identity_id: u64,
        member_uins: Vec<u64>,
    },

    /// Query: list identity-center groups in a zone
    GroupListing { zone_id: String },

    /// Query: organization billing summary for a set of members
    BillingSummary {
        member_uins: Vec<u64>,
        end_month: String,
    },
}

/// Allowed policy types for [`DesiredState::MemberPolicy`].
const POLICY_TYPES: &[&str] = &["System", "Custom"];

impl DesiredState {
    /// The remote resource kind this state materializes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::IdentityCenter { .. } => "IdentityCenterInstance",
            Self::ShareUnit { .. } => "ShareUnit",
            Self::ShareUnitInvitation { .. } => "ShareUnitInvitation",
            Self::MemberPolicy { .. } => "MemberPolicy",
            Self::GroupListing { .. } => "GroupListing",
            Self::BillingSummary { .. } => "BillingSummary",
        }
    }

    /// Whether this is a read-only query kind.
    pub fn is_query(&self) -> bool {
        matches!(self, Self::GroupListing { .. } | Self::BillingSummary { .. })
    }

    /// The at-most-once key for creating this resource.
    ///
    /// One-shot operations key on the zone or unit they target, so a retried
    /// apply can never open a second zone or answer an invitation twice.
    pub fn idempotency_key(&self) -> String {
        match self {
            Self::IdentityCenter { zone_name } => format!("zone:{zone_name}"),
            Self::ShareUnit { name, area, .. } => format!("unit:{area}:{name}"),
            Self::ShareUnitInvitation { unit_id, .. } => format!("invitation:{}", unit_id.id()),
            Self::MemberPolicy {
                identity_id,
                policy_name,
                ..
            } => format!("policy:{identity_id}:{policy_name}"),
            Self::GroupListing { zone_id } => format!("groups:{zone_id}"),
            Self::BillingSummary { end_month, .. } => format!("billing:{end_month}"),
        }
    }

    /// The task kind an asynchronous create of this resource spawns, if this
    /// kind is ever created asynchronously.
    pub fn task_kind(&self) -> Option<TaskKind> {
        match self {
            Self::IdentityCenter { .. } => Some(TaskKind::OpenIdentityCenter),
            Self::ShareUnitInvitation { response, .. } => Some(match response {
                InvitationResponse::Accept => TaskKind::AcceptShareInvitation,
                InvitationResponse::Reject => TaskKind::RejectShareInvitation,
            }),
            _ => None,
        }
    }

    /// The create payload as the control plane expects it.
    pub fn payload(&self) -> Value {
        match self {
            Self::IdentityCenter { zone_name } => json!({ "zone_name": zone_name }),
            Self::ShareUnit {
                name,
                area,
                description,
            } => json!({ "name": name, "area": area, "description": description }),
            Self::ShareUnitInvitation { unit_id, response } => json!({
                "unit_id": unit_id.id(),
                "unit_name": unit_id.name(),
                "response": match response {
                    InvitationResponse::Accept => "Accept",
                    InvitationResponse::Reject => "Reject",
                },
            }),
            Self::MemberPolicy {
                policy_name,
                policy_type,
                identity_id,
                member_uins,
            } => json!({
                "policy_name": policy_name,
                "policy_type": policy_type,
                "identity_id": identity_id,
                "member_uins": member_uins,
            }),
            Self::GroupListing { zone_id } => json!({ "zone_id": zone_id }),
            Self::BillingSummary {
                member_uins,
                end_month,
            } => json!({ "member_uins": member_uins, "end_month": end_month }),
        }
    }

    /// Validate this desired state. Runs before any remote call.
    pub fn validate(&self) -> ReconcileResult<()> {
        match self {
            Self::IdentityCenter { zone_name } => {
                require_non_empty("zone_name", zone_name)?;
            }
            Self::ShareUnit { name, area, .. } => {
                require_non_empty("name", name)?;
                require_non_empty("area", area)?;
                if name.contains('#') {
                    return Err(ReconcileError::invalid(
                        "name must not contain the '#' identifier delimiter",
                    ));
                }
            }
            Self::ShareUnitInvitation { .. } => {
                // CompositeId construction already rejects malformed ids
            }
            Self::MemberPolicy {
                policy_name,
                policy_type,
                identity_id,
                member_uins,
            } => {
                require_non_empty("policy_name", policy_name)?;
                if !POLICY_TYPES.contains(&policy_type.as_str()) {
                    return Err(ReconcileError::invalid(format!(
                        "policy_type '{policy_type}' not one of {POLICY_TYPES:?}"
                    )));
                }
                if *identity_id == 0 {
                    return Err(ReconcileError::invalid("identity_id must be non-zero"));
                }
                if member_uins.is_empty() {
                    return Err(ReconcileError::invalid("member_uins must not be empty"));
                }
            }
            Self::GroupListing { zone_id } => {
                require_non_empty("zone_id", zone_id)?;
                if !zone_id.starts_with("z-") {
                    return Err(ReconcileError::invalid(format!(
                        "zone_id '{zone_id}' must start with 'z-'"
                    )));
                }
            }
            Self::BillingSummary {
                member_uins,
                end_month,
            } => {
                if member_uins.is_empty() {
                    return Err(ReconcileError::invalid("member_uins must not be empty"));
                }
                validate_month("end_month", end_month)?;
            }
        }
        Ok(())
    }

    /// Field names the control plane can change in place for this kind.
    ///
    /// A desired change touching any other field requires destroy and
    /// recreate, which the reconciler signals distinctly.
    pub fn updatable_fields(&self) -> &'static [&'static str] {
        match self {
            Self::IdentityCenter { .. } => &["zone_name"],
            Self::ShareUnit { .. } => &["name", "description"],
            Self::ShareUnitInvitation { .. } => &[],
            Self::MemberPolicy { .. } => &["policy_name"],
            // Query kinds re-resolve on any change
            Self::GroupListing { .. } => &["zone_id"],
            Self::BillingSummary { .. } => &["member_uins", "end_month"],
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> ReconcileResult<()> {
    if value.trim().is_empty() {
        Err(ReconcileError::invalid(format!("{field} must not be empty")))
    } else {
        Ok(())
    }
}

/// Accepts `YYYY-MM` with a month between 01 and 12.
fn validate_month(field: &str, value: &str) -> ReconcileResult<()> {
    let valid = match value.split_once('-') {
        Some((year, month)) => {
            year.len() == 4
                && year.chars().all(|c| c.is_ascii_digit())
                && month.len() == 2
                && matches!(month.parse::<u8>(), Ok(1..=12))
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ReconcileError::invalid(format!(
            "{field} '{value}' must be formatted YYYY-MM"
        )))
    }
}
