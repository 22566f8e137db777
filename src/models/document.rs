// src/models/document.rs

//! Canonical documents.
//!
//! A [`Document`] is the fetched JSON payload plus a `_metadata` envelope:
//! entity type, source URL, the typed link map that places the entity in
//! the URN graph, and processing bookkeeping (version, etag, timestamps).
//!
//! Link entries come in three shapes, tagged by `type`:
//! - `resource`: singleton outbound edge (or a list via `hrefs`)
//! - `collection`: a child collection fully enumerated under a qualifier
//! - `relation`: a many-to-many edge living in its own collection, whose
//!   URN carries the `pages:*` wildcard

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::urn::Urn;

/// The shape tag of a link entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Resource,
    Collection,
    Relation,
}

/// One typed edge out of a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "type")]
    pub kind: LinkKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<Urn>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hrefs: Option<Vec<Urn>>,
}

impl Link {
    pub fn resource(href: Urn) -> Self {
        Self {
            kind: LinkKind::Resource,
            href: Some(href),
            hrefs: None,
        }
    }

    pub fn resources(hrefs: Vec<Urn>) -> Self {
        Self {
            kind: LinkKind::Resource,
            href: None,
            hrefs: Some(hrefs),
        }
    }

    pub fn collection(href: Urn) -> Self {
        Self {
            kind: LinkKind::Collection,
            href: Some(href),
            hrefs: None,
        }
    }

    pub fn relation(href: Urn) -> Self {
        Self {
            kind: LinkKind::Relation,
            href: Some(href),
            hrefs: None,
        }
    }
}

/// Processing envelope attached to every document under `_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Entity type of the payload.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Canonical source URL (GitHub API form).
    #[serde(default)]
    pub url: String,

    /// Role -> link map. Ordered for stable serialization.
    #[serde(default)]
    pub links: BTreeMap<String, Link>,

    /// Processor version that last handled this document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// A JSON payload with its `_metadata` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(flatten)]
    pub content: Map<String, Value>,

    #[serde(rename = "_metadata")]
    pub metadata: Metadata,
}

impl Document {
    /// Wrap a fetched payload. The link map starts empty; the handler
    /// populates it.
    pub fn new(kind: impl Into<String>, url: impl Into<String>, content: Map<String, Value>) -> Self {
        Self {
            content,
            metadata: Metadata {
                kind: kind.into(),
                url: url.into(),
                ..Metadata::default()
            },
        }
    }

    /// Wrap an arbitrary JSON value. Bare arrays (collection pages) are
    /// stored under an `elements` key; other non-objects become the empty
    /// payload.
    pub fn from_value(kind: impl Into<String>, url: impl Into<String>, value: Value) -> Self {
        let content = match value {
            Value::Object(map) => map,
            Value::Array(items) => {
                let mut map = Map::new();
                map.insert("elements".to_string(), Value::Array(items));
                map
            }
            _ => Map::new(),
        };
        Self::new(kind, url, content)
    }

    /// The store key: `_metadata.links.self.href`, when linked.
    pub fn self_urn(&self) -> Option<&Urn> {
        self.metadata
            .links
            .get("self")
            .and_then(|link| link.href.as_ref())
    }

    /// Resolve a JSON pointer into the payload.
    pub fn value_at(&self, pointer: &str) -> Option<&Value> {
        if !pointer.starts_with('/') {
            return None;
        }
        let mut segments = pointer.split('/').skip(1);
        let mut current = self.content.get(segments.next()?)?;
        for segment in segments {
            current = match current {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// String field at a JSON pointer.
    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.value_at(pointer).and_then(Value::as_str)
    }

    /// Unsigned integer field at a JSON pointer.
    pub fn u64_at(&self, pointer: &str) -> Option<u64> {
        self.value_at(pointer).and_then(Value::as_u64)
    }

    // --- Link builder ---
    //
    // Each operation is idempotent at the role level: a later write for the
    // same role overwrites the earlier one.

    pub fn add_resource(&mut self, role: &str, href: Urn) {
        self.metadata.links.insert(role.to_string(), Link::resource(href));
    }

    pub fn add_resource_list(&mut self, role: &str, hrefs: Vec<Urn>) {
        self.metadata
            .links
            .insert(role.to_string(), Link::resources(hrefs));
    }

    pub fn add_collection(&mut self, role: &str, href: Urn) {
        self.metadata
            .links
            .insert(role.to_string(), Link::collection(href));
    }

    pub fn add_relation(&mut self, role: &str, href: Urn) {
        self.metadata
            .links
            .insert(role.to_string(), Link::relation(href));
    }

    /// Conventional shorthand: `self` as a resource, `siblings` as the
    /// natural collection containing it.
    pub fn add_self_and_siblings(&mut self, self_urn: Urn, siblings: Urn) {
        self.add_resource("self", self_urn);
        self.add_collection("siblings", siblings);
    }
}

/// Store listing entry: enough to enumerate a type without loading bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub urn: Urn,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document() -> Document {
        let payload = json!({
            "id": 12,
            "owner": { "id": 45, "url": "http://user/45" },
            "topics": ["rust", "crawler"]
        });
        Document::from_value("repo", "http://foo/repo/12", payload)
    }

    #[test]
    fn test_pointer_access() {
        let doc = sample_document();
        assert_eq!(doc.u64_at("/id"), Some(12));
        assert_eq!(doc.u64_at("/owner/id"), Some(45));
        assert_eq!(doc.str_at("/owner/url"), Some("http://user/45"));
        assert_eq!(doc.str_at("/topics/1"), Some("crawler"));
        assert!(doc.value_at("/missing/field").is_none());
    }

    #[test]
    fn test_link_roles_overwrite() {
        let mut doc = sample_document();
        doc.add_resource("owner", Urn::entity("user", 1));
        doc.add_resource("owner", Urn::entity("user", 2));
        assert_eq!(
            doc.metadata.links.get("owner").unwrap().href,
            Some(Urn::entity("user", 2))
        );
        assert_eq!(doc.metadata.links.len(), 1);
    }

    #[test]
    fn test_self_and_siblings() {
        let mut doc = sample_document();
        doc.add_self_and_siblings(
            Urn::entity("repo", 12),
            Urn::collection(&Urn::entity("user", 45), "repos"),
        );
        assert_eq!(doc.self_urn(), Some(&Urn::entity("repo", 12)));
        let siblings = doc.metadata.links.get("siblings").unwrap();
        assert_eq!(siblings.kind, LinkKind::Collection);
        assert_eq!(siblings.href, Some(Urn::from("urn:user:45:repos")));
    }

    #[test]
    fn test_metadata_serialization_shape() {
        let mut doc = sample_document();
        doc.add_resource("self", Urn::entity("repo", 12));
        let value = serde_json::to_value(&doc).unwrap();

        // Payload fields stay top-level, metadata nests under _metadata.
        assert_eq!(value["id"], 12);
        assert_eq!(value["_metadata"]["type"], "repo");
        assert_eq!(value["_metadata"]["links"]["self"]["type"], "resource");
        assert_eq!(value["_metadata"]["links"]["self"]["href"], "urn:repo:12");
    }

    #[test]
    fn test_roundtrip() {
        let mut doc = sample_document();
        doc.add_relation("teams", Urn::relation(&Urn::entity("repo", 12), "teams"));
        let text = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&text).unwrap();
        assert_eq!(back, doc);
    }
}
