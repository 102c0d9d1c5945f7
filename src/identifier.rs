//! Structured composite identifiers.
//!
//! Provider-assigned identifiers for shared resources are composite: a
//! human-assigned unit name joined to a server-assigned opaque id with a
//! single `#` delimiter (for example `finance-unit#su-8f2kq1`). This module
//! replaces ad hoc `split('#')` calls with one parsed type carrying named
//! parts, so consumers that only need the server id never re-implement the
//! split (and never split on the wrong occurrence when the name itself
//! contains no delimiter but the id is opaque).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a composite identifier cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentifierError {
    #[error("Composite identifier is missing the '#' delimiter: '{raw}'")]
    MissingDelimiter { raw: String },

    #[error("Composite identifier has an empty {part} part: '{raw}'")]
    EmptyPart { part: &'static str, raw: String },
}

/// A two-part resource identifier of the form `name#id`.
///
/// The name is human-assigned, the id is server-assigned. Parsing splits on
/// the FIRST `#`, so a server id containing further `#` characters survives
/// round-tripping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeId {
    name: String,
    id: String,
}

impl CompositeId {
    /// Create a composite identifier from its parts.
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Result<Self, IdentifierError> {
        let name = name.into();
        let id = id.into();
        if name.is_empty() {
            return Err(IdentifierError::EmptyPart {
                part: "name",
                raw: format!("#{id}"),
            });
        }
        if id.is_empty() {
            return Err(IdentifierError::EmptyPart {
                part: "id",
                raw: format!("{name}#"),
            });
        }
        Ok(Self { name, id })
    }

    /// The human-assigned name part.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The server-assigned id part.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

impl FromStr for CompositeId {
    type Err = IdentifierError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.split_once('#') {
            Some((name, id)) => Self::new(name, id).map_err(|_| IdentifierError::EmptyPart {
                part: if name.is_empty() { "name" } else { "id" },
                raw: raw.to_string(),
            }),
            None => Err(IdentifierError::MissingDelimiter {
                raw: raw.to_string(),
            }),
        }
    }
}
