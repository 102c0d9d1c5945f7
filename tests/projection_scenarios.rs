//! End-to-end projection scenarios: query kinds resolved through the
//! reconciler expose the flattened attribute surface consumers assert on,
//! and projection is deterministic for arbitrary inputs.

use cloud_reconciler::projector::project;
use cloud_reconciler::remote::InMemoryControlPlane;
use cloud_reconciler::resource::{DesiredState, ManagedResource, ResourceStatus};
use cloud_reconciler::{Reconciler, RequestContext, TaskPoller};
use proptest::prelude::*;
use serde_json::{Value, json};

#[tokio::test]
async fn test_group_listing_scenario() {
    let remote = InMemoryControlPlane::new();
    remote
        .script_create_response(
            "GroupListing",
            json!({
                "zone_id": "z-s64jh54hbcra",
                "groups": [
                    {"group_id": "g-01", "group_name": "platform", "group_type": "Manual"},
                    {"group_id": "g-02", "group_name": "security", "group_type": "Synchronized"},
                ],
            }),
        )
        .await;
    let reconciler = Reconciler::new(remote, TaskPoller::default());
    let context = RequestContext::with_generated_id();

    let mut listing = ManagedResource::new(DesiredState::GroupListing {
        zone_id: "z-s64jh54hbcra".to_string(),
    });
    reconciler.create(&mut listing, &context).await.unwrap();
    assert_eq!(listing.status(), ResourceStatus::Ready);

    let observed = listing.observed();
    let count = observed.count("groups").unwrap();
    assert!(count > 0);
    for index in 0..count {
        for field in ["group_id", "group_name", "group_type"] {
            let value = observed
                .get_str(&format!("groups.{index}.{field}"))
                .unwrap_or_else(|| panic!("groups.{index}.{field} must be set"));
            assert!(!value.is_empty());
        }
    }
}

#[tokio::test]
async fn test_billing_summary_scenario() {
    let remote = InMemoryControlPlane::new();
    remote
        .script_create_response(
            "BillingSummary",
            json!({
                "end_month": "2023-05",
                "member_uins": [100026517717u64],
                "total_cost": null,
            }),
        )
        .await;
    let reconciler = Reconciler::new(remote, TaskPoller::default());
    let context = RequestContext::with_generated_id();

    let mut summary = ManagedResource::new(DesiredState::BillingSummary {
        member_uins: vec![100026517717],
        end_month: "2023-05".to_string(),
    });
    reconciler.create(&mut summary, &context).await.unwrap();

    let observed = summary.observed();
    assert_eq!(observed.get_str("end_month"), Some("2023-05"));
    assert_eq!(observed.get_str("member_uins.0"), Some("100026517717"));
    // Null fields surface as the unset marker, not as a zero value
    assert!(!observed.get("total_cost").is_set());
}

fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| json!(n)),
        "[a-z0-9_#.]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::btree_map("[a-z_]{1,8}", inner, 0..6)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #[test]
    fn projection_is_deterministic(raw in arb_json()) {
        let first = project(&raw);
        let second = project(&raw);
        prop_assert_eq!(&first, &second);

        let paths_first: Vec<&str> = first.iter().map(|(p, _)| p).collect();
        let paths_second: Vec<&str> = second.iter().map(|(p, _)| p).collect();
        prop_assert_eq!(paths_first, paths_second);
    }

    #[test]
    fn every_array_exposes_a_count(items in prop::collection::vec(any::<i64>(), 0..8)) {
        let raw = json!({ "values": items });
        let attrs = project(&raw);
        prop_assert_eq!(attrs.count("values"), Some(raw["values"].as_array().unwrap().len()));
    }
}
