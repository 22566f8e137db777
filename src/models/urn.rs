// src/models/urn.rs

//! URN identifiers.
//!
//! Every entity the crawler touches is addressed by a colon-delimited
//! hierarchical URN (`urn:repo:12`, `urn:repo:12:issue:27:issue_comments`).
//! URNs are plain values: comparison is literal string comparison, and the
//! builder does no validation of segment syntax. Callers are trusted.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A Uniform Resource Name identifying one entity or collection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    /// URN for a top-level entity: `urn:<kind>:<id>`.
    pub fn entity(kind: &str, id: impl fmt::Display) -> Self {
        Urn(format!("urn:{kind}:{id}"))
    }

    /// URN for an entity subordinate to `qualifier`: `<qualifier>:<kind>:<id>`.
    pub fn child(qualifier: &Urn, kind: &str, id: impl fmt::Display) -> Self {
        Urn(format!("{qualifier}:{kind}:{id}"))
    }

    /// URN for a collection under `qualifier`: `<qualifier>:<name>`.
    ///
    /// Pluralization is the caller's choice; handlers pass the form they want.
    pub fn collection(qualifier: &Urn, name: &str) -> Self {
        Urn(format!("{qualifier}:{name}"))
    }

    /// URN for a many-to-many relation collection: `<qualifier>:<name>:pages:*`.
    pub fn relation(qualifier: &Urn, name: &str) -> Self {
        Urn(format!("{qualifier}:{name}:pages:*"))
    }

    /// Append colon-joined segments to an arbitrary prefix.
    pub fn qualified(prefix: &str, parts: &[&str]) -> Self {
        if parts.is_empty() {
            return Urn(prefix.to_string());
        }
        Urn(format!("{prefix}:{}", parts.join(":")))
    }

    /// A bare root URN such as `urn:orgs` (siblings of top-level entities).
    pub fn root(name: &str) -> Self {
        Urn(format!("urn:{name}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Urn> for String {
    fn from(urn: Urn) -> Self {
        urn.0
    }
}

impl From<&str> for Urn {
    fn from(raw: &str) -> Self {
        Urn(raw.to_string())
    }
}
