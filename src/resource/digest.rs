//! Content digest of observed state, used for drift detection.
//!
//! A digest is a SHA-256 hash of the canonical rendering of an
//! [`ObservedAttributes`] set, base64-encoded. Because projection is
//! deterministic, two reads that observed the same remote state produce equal
//! digests; a digest change on read is drift.

use crate::resource::observed::{AttributeValue, ObservedAttributes};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Opaque digest of a projected attribute set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateDigest(String);

impl StateDigest {
    /// Compute the digest of an attribute set.
    ///
    /// Unset values hash distinctly from any set value, so flipping an
    /// attribute between `""` and unset changes the digest.
    pub fn of(attributes: &ObservedAttributes) -> Self {
        let mut hasher = Sha256::new();
        for (path, value) in attributes.iter() {
            hasher.update(path.as_bytes());
            match value {
                AttributeValue::Set(s) => {
                    hasher.update([0x01]);
                    hasher.update(s.as_bytes());
                }
                AttributeValue::Unset => hasher.update([0x00]),
            }
            hasher.update([0xff]);
        }
        Self(BASE64.encode(hasher.finalize()))
    }
}

impl fmt::Display for StateDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttributeValue)]) -> ObservedAttributes {
        let mut out = ObservedAttributes::new();
        for (path, value) in pairs {
            out.insert(*path, value.clone());
        }
        out
    }

    #[test]
    fn test_equal_state_equal_digest() {
        let a = attrs(&[("zone_id", AttributeValue::Set("z-1".into()))]);
        let b = attrs(&[("zone_id", AttributeValue::Set("z-1".into()))]);
        assert_eq!(StateDigest::of(&a), StateDigest::of(&b));
    }

    #[test]
    fn test_value_change_changes_digest() {
        let a = attrs(&[("zone_id", AttributeValue::Set("z-1".into()))]);
        let b = attrs(&[("zone_id", AttributeValue::Set("z-2".into()))]);
        assert_ne!(StateDigest::of(&a), StateDigest::of(&b));
    }

    #[test]
    fn test_unset_differs_from_empty_string() {
        let a = attrs(&[("description", AttributeValue::Set(String::new()))]);
        let b = attrs(&[("description", AttributeValue::Unset)]);
        assert_ne!(StateDigest::of(&a), StateDigest::of(&b));
    }
}
