// src/models/request.rs

//! The unit of crawl work.
//!
//! A [`Request`] carries everything the processor needs for one document:
//! the expected entity type, the source URL, traversal context (qualifier
//! and optional relation descriptor), the governing [`TraversalPolicy`],
//! and, once the fetch layer has run, the payload document and response
//! envelope.
//!
//! Handlers never talk to queues directly. Follow-up requests accumulate in
//! the request's outbox and the host drains them after `process` returns,
//! which keeps the processor purely functional per request.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Document;
use super::policy::{EdgeRole, TraversalPolicy};
use super::urn::Urn;
use crate::utils::url::strip_template;

/// Queue priority classes for follow-up work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Immediate,
    Soon,
    Normal,
    Later,
}

/// Describes a many-to-many edge so a relation page can emit back-links
/// into its origin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDescriptor {
    /// Entity type that emitted the relation.
    pub origin: String,
    /// URN of the emitting entity.
    pub qualifier: Urn,
    /// Relation collection name (`teams`, `collaborators`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Opaque correlation id, fresh per enqueue.
    pub guid: String,
}

impl RelationDescriptor {
    pub fn new(origin: impl Into<String>, qualifier: Urn, kind: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            qualifier,
            kind: kind.into(),
            guid: Uuid::new_v4().to_string(),
        }
    }
}

/// Traversal context attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    /// URN prefix scoping subordinate entities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<Urn>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationDescriptor>,
}

/// Response envelope captured by the fetch layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseInfo {
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Raw `Link` header, parsed by dispatch for pagination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_header: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Follow-up requests emitted while handling one document.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    items: Vec<(Request, Priority)>,
}

impl Outbox {
    /// Enqueue one request at default priority.
    pub fn push(&mut self, request: Request) {
        self.items.push((request, Priority::Normal));
    }

    /// Bulk enqueue at an explicit priority.
    pub fn push_many(&mut self, requests: Vec<Request>, priority: Priority) {
        self.items
            .extend(requests.into_iter().map(|r| (r, priority)));
    }

    pub fn drain(&mut self) -> Vec<(Request, Priority)> {
        std::mem::take(&mut self.items)
    }

    pub fn items(&self) -> &[(Request, Priority)] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// One unit of crawl work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Entity type expected of the payload.
    #[serde(rename = "type")]
    pub kind: String,

    pub url: String,

    #[serde(default)]
    pub context: RequestContext,

    #[serde(default)]
    pub policy: TraversalPolicy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ResponseInfo>,

    #[serde(skip)]
    pub outbox: Outbox,
}

impl Request {
    pub fn new(kind: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            url: url.into(),
            context: RequestContext::default(),
            policy: TraversalPolicy::default(),
            document: None,
            response: None,
            outbox: Outbox::default(),
        }
    }

    pub fn with_policy(mut self, policy: TraversalPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_qualifier(mut self, qualifier: Urn) -> Self {
        self.context.qualifier = Some(qualifier);
        self
    }

    pub fn with_relation(mut self, relation: RelationDescriptor) -> Self {
        self.context.relation = Some(relation);
        self
    }

    /// Build a child request across an edge of the given role.
    ///
    /// The child inherits this request's qualifier (unless overridden later)
    /// and the policy the transition table assigns for `role`. The URL has
    /// its URI Template variables stripped.
    pub fn child(&self, kind: impl Into<String>, url: &str, role: EdgeRole) -> Request {
        Request {
            kind: kind.into(),
            url: strip_template(url),
            context: RequestContext {
                qualifier: self.context.qualifier.clone(),
                relation: None,
            },
            policy: self.policy.child_for(role),
            document: None,
            response: None,
            outbox: Outbox::default(),
        }
    }

    /// Enqueue a resource follow-up: a singleton entity reference.
    pub fn queue_resource(&mut self, kind: &str, url: &str, qualifier: Option<Urn>) {
        let mut child = self.child(kind, url, EdgeRole::Resource);
        child.context.qualifier = qualifier;
        self.outbox.push(child);
    }

    /// Enqueue a collection follow-up scoped under `qualifier`.
    pub fn queue_collection(&mut self, kind: &str, url: &str, qualifier: Urn) {
        let child = self
            .child(kind, url, EdgeRole::CollectionPage)
            .with_qualifier(qualifier);
        self.outbox.push(child);
    }

    /// Enqueue a relation page with a fresh relation descriptor.
    pub fn queue_relation(&mut self, kind: &str, url: &str, descriptor: RelationDescriptor) {
        let child = self
            .child(kind, url, EdgeRole::CollectionPage)
            .with_qualifier(descriptor.qualifier.clone())
            .with_relation(descriptor);
        self.outbox.push(child);
    }
}
