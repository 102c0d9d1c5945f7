//! State projection: raw API responses to observed attributes.
//!
//! [`project`] is the only bridge between the control plane's JSON payloads
//! and the attribute surface consumers assert on. It is a pure function: no
//! I/O, no clock, and the same input always produces attribute-for-attribute
//! identical output.
//!
//! Flattening rules:
//! - object fields concatenate with `.` (`meta.created_at`);
//! - array elements use their zero-based index (`groups.0.group_id`) in the
//!   order the API returned them, and the array itself contributes a count
//!   entry under `path.#`;
//! - scalars render in canonical string form (numbers in plain decimal,
//!   booleans as `true`/`false`);
//! - JSON `null` projects to the explicit unset marker, never to `""` or `0`.

use crate::resource::observed::{AttributeValue, ObservedAttributes};
use serde_json::Value;

/// Project a raw control-plane response into observed attributes.
///
/// A non-object root is stored under the single path `value`.
pub fn project(raw: &Value) -> ObservedAttributes {
    let mut attrs = ObservedAttributes::new();
    match raw {
        Value::Object(_) | Value::Array(_) => flatten(raw, "", &mut attrs),
        other => flatten(other, "value", &mut attrs),
    }
    attrs
}

fn join(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

fn flatten(value: &Value, path: &str, attrs: &mut ObservedAttributes) {
    match value {
        Value::Null => attrs.insert(path, AttributeValue::Unset),
        Value::Bool(b) => attrs.insert(path, AttributeValue::Set(b.to_string())),
        Value::Number(n) => attrs.insert(path, AttributeValue::Set(n.to_string())),
        Value::String(s) => attrs.insert(path, AttributeValue::Set(s.clone())),
        Value::Array(items) => {
            attrs.insert(
                join(path, "#"),
                AttributeValue::Set(items.len().to_string()),
            );
            for (index, item) in items.iter().enumerate() {
                flatten(item, &join(path, &index.to_string()), attrs);
            }
        }
        Value::Object(fields) => {
            for (field, item) in fields {
                flatten(item, &join(path, field), attrs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_project_to_canonical_strings() {
        let attrs = project(&json!({
            "zone_id": "z-s64jh54hbcra",
            "group_count": 3,
            "sso_enabled": true,
        }));
        assert_eq!(attrs.get_str("zone_id"), Some("z-s64jh54hbcra"));
        assert_eq!(attrs.get_str("group_count"), Some("3"));
        assert_eq!(attrs.get_str("sso_enabled"), Some("true"));
    }

    #[test]
    fn test_arrays_expose_counts_and_index_paths() {
        let attrs = project(&json!({
            "member_uins": [100026517717u64, 100026517718u64],
        }));
        assert_eq!(attrs.count("member_uins"), Some(2));
        assert_eq!(attrs.get_str("member_uins.0"), Some("100026517717"));
        assert_eq!(attrs.get_str("member_uins.1"), Some("100026517718"));
    }

    #[test]
    fn test_nested_list_elements_keep_api_order() {
        let attrs = project(&json!({
            "groups": [
                {"group_id": "g-2", "group_name": "ops"},
                {"group_id": "g-1", "group_name": "dev"},
            ],
        }));
        // Index 0 is the first element the API returned, not the smallest id
        assert_eq!(attrs.get_str("groups.0.group_id"), Some("g-2"));
        assert_eq!(attrs.get_str("groups.1.group_id"), Some("g-1"));
    }

    #[test]
    fn test_null_projects_to_unset() {
        let attrs = project(&json!({"description": null, "name": ""}));
        assert_eq!(attrs.get("description"), &AttributeValue::Unset);
        assert_eq!(attrs.get_str("name"), Some(""));
    }

    #[test]
    fn test_projection_is_deterministic() {
        let raw = json!({
            "groups": [{"group_id": "g-1", "group_type": "Manual"}],
            "zone_id": "z-1",
            "x509_certificate": null,
        });
        let a = project(&raw);
        let b = project(&raw);
        assert_eq!(a, b);
        let paths_a: Vec<&str> = a.iter().map(|(p, _)| p).collect();
        let paths_b: Vec<&str> = b.iter().map(|(p, _)| p).collect();
        assert_eq!(paths_a, paths_b);
    }

    #[test]
    fn test_empty_array_still_counts() {
        let attrs = project(&json!({"users": []}));
        assert_eq!(attrs.count("users"), Some(0));
    }
}
