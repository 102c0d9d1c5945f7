//! Observed attributes of a remote object.
//!
//! The externally visible surface of a reconciled resource is a flat mapping
//! of attribute paths to values: list elements are addressed with dotted
//! index paths (`groups.0.group_id`) and every list exposes its element count
//! under a `#`-suffixed path (`groups.#`). Index paths preserve the order the
//! API returned, so consumers asserting on specific positions see exactly
//! what the control plane sent.
//!
//! Absent or null attributes are an explicit [`AttributeValue::Unset`], never
//! an empty string or zero that could be mistaken for a real value.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single observed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// A concrete value, rendered in its canonical string form
    Set(String),
    /// Explicitly absent; distinct from any set value including ""
    Unset,
}

impl AttributeValue {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// The contained value, `None` when unset.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Set(s) => Some(s),
            Self::Unset => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Set(s) => f.write_str(s),
            Self::Unset => f.write_str("<unset>"),
        }
    }
}

/// Flattened, deterministically ordered attribute set.
///
/// Backed by a `BTreeMap`, so iteration order is a pure function of the
/// contained paths; two projections of the same raw response are identical
/// attribute-for-attribute and order-for-order. Paths compare as strings,
/// which means index segments of two or more digits sort before shorter
/// ones (`groups.10` ahead of `groups.2`); reconstruct list sequences with
/// [`count`](Self::count) and indexed lookups, not from iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedAttributes {
    attributes: BTreeMap<String, AttributeValue>,
}

impl ObservedAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value at an attribute path.
    pub fn insert(&mut self, path: impl Into<String>, value: AttributeValue) {
        self.attributes.insert(path.into(), value);
    }

    /// Look up an attribute; missing paths read as [`AttributeValue::Unset`].
    pub fn get(&self, path: &str) -> &AttributeValue {
        self.attributes.get(path).unwrap_or(&AttributeValue::Unset)
    }

    /// The set value at a path, `None` when unset or absent.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).as_str()
    }

    /// The element count of a list attribute, from its `path.#` entry.
    pub fn count(&self, path: &str) -> Option<usize> {
        self.get_str(&format!("{path}.#"))
            .and_then(|raw| raw.parse().ok())
    }

    /// Number of stored attribute entries.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Iterate entries in deterministic lexicographic path order.
    ///
    /// Note this is string order, not numeric: `groups.10.*` entries appear
    /// before `groups.2.*`. List elements keep their API positions under
    /// their index paths regardless.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v))
    }
}
