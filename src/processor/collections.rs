// src/processor/collections.rs

//! Collection and relation page handlers.
//!
//! A collection request's document holds the fetched page under an
//! `elements` array. The handler links each element's URN, emits the
//! `origin` back-link for relation pages, and enqueues one child request
//! per element. Root collections (`orgs`, `users`) decay their elements'
//! policy one step further than interior collections.

use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::models::{Document, EdgeRole, Request, Urn};
use crate::utils::url::{page_of, strip_template};

use super::events::event_scope;

/// Collection request types served by [`process_collection`].
pub(crate) const COLLECTION_KINDS: &[&str] = &[
    "orgs",
    "users",
    "repos",
    "teams",
    "members",
    "team_members",
    "team_repos",
    "collaborators",
    "contributors",
    "subscribers",
    "issues",
    "pull_requests",
    "commits",
    "events",
    "issue_comments",
    "review_comments",
    "commit_comments",
    "statuses",
    "deployments",
];

/// Element type and root-ness for each collection type.
fn collection_spec(kind: &str) -> Option<(&'static str, bool)> {
    match kind {
        "orgs" => Some(("org", true)),
        "users" => Some(("user", true)),
        "repos" | "team_repos" => Some(("repo", false)),
        "teams" => Some(("team", false)),
        "members" | "team_members" | "collaborators" | "contributors" | "subscribers" => {
            Some(("user", false))
        }
        "issues" => Some(("issue", false)),
        "pull_requests" => Some(("pull_request", false)),
        "commits" => Some(("commit", false)),
        "events" => Some(("event", false)),
        "issue_comments" => Some(("issue_comment", false)),
        "review_comments" => Some(("review_comment", false)),
        "commit_comments" => Some(("commit_comment", false)),
        "statuses" => Some(("status", false)),
        "deployments" => Some(("deployment", false)),
        _ => None,
    }
}

/// Identity of one element: optional URN (needs an id), the child request
/// type, and an optional URL to reach it. The URN feeds the `resources`
/// link; only the enqueue needs the URL.
fn element_identity(
    collection_kind: &str,
    element_kind: &str,
    qualifier: Option<&Urn>,
    element: &Value,
) -> Option<(Option<Urn>, String, Option<String>)> {
    if collection_kind == "events" {
        // Events carry their concrete type and have no API URL of their
        // own; the canonical URL is synthesized under the repo.
        let id = element_id(element)?;
        let kind = element.get("type")?.as_str()?.to_string();
        let scope = event_scope(element)?;
        let url = format!("{}/events/{}", element.get("repo")?.get("url")?.as_str()?, id);
        return Some((Some(Urn::child(&scope, &kind, &id)), kind, Some(url)));
    }

    let urn = element_id(element).map(|id| match qualifier {
        Some(qualifier) => Urn::child(qualifier, element_kind, &id),
        None => Urn::entity(element_kind, &id),
    });
    let url = element
        .get("url")
        .and_then(Value::as_str)
        .map(str::to_string);
    if urn.is_none() && url.is_none() {
        return None;
    }
    Some((urn, element_kind.to_string(), url))
}

/// Element id, accepting both numeric ids and sha strings.
fn element_id(element: &Value) -> Option<String> {
    match element.get("id").or_else(|| element.get("sha"))? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn process_collection(request: &mut Request, document: &mut Document) -> Result<bool> {
    let (element_kind, root) = match collection_spec(&request.kind) {
        Some(spec) => spec,
        None => return Ok(false),
    };

    let elements: Vec<Value> = match document.value_at("/elements") {
        Some(Value::Array(items)) => items.clone(),
        _ => {
            warn!(kind = %request.kind, url = %request.url, "collection page has no elements");
            return Ok(false);
        }
    };

    let qualifier = request.context.qualifier.clone();
    let collection_urn = match &qualifier {
        Some(qualifier) => Urn::collection(qualifier, &request.kind),
        None => Urn::root(&request.kind),
    };
    let page = page_of(&request.url).unwrap_or(1);
    document.add_resource("self", Urn::child(&collection_urn, "pages", page));

    let role = if root {
        EdgeRole::RootCollectionElement
    } else {
        EdgeRole::CollectionElement
    };

    let mut resource_urns = Vec::new();
    let mut children = Vec::new();
    for element in &elements {
        let (urn, kind, url) =
            match element_identity(&request.kind, element_kind, qualifier.as_ref(), element) {
                Some(identity) => identity,
                None => continue,
            };
        if let Some(urn) = urn {
            resource_urns.push(urn);
        }
        if let Some(url) = url {
            let mut child = request.child(kind.clone(), &strip_template(&url), role);
            child.context.qualifier = qualifier.clone();
            if request.kind == "events" {
                // Events have no endpoint of their own; the page payload is
                // the only source, so it rides along on the child request.
                child.document =
                    Some(Document::from_value(kind, child.url.clone(), element.clone()));
            }
            children.push(child);
        }
    }

    document.add_resource_list("resources", resource_urns);

    if let Some(relation) = request.context.relation.clone() {
        document.add_resource("origin", relation.qualifier.clone());
        document.metadata.extra.insert(
            "relation".to_string(),
            serde_json::json!({ "type": relation.kind, "guid": relation.guid }),
        );
    }

    for child in children {
        request.outbox.push(child);
    }

    Ok(true)
}
