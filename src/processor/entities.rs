// src/processor/entities.rs

//! Per-entity handlers.
//!
//! Every handler follows the same shape: emit `self` and `siblings`, link
//! each referenced entity and enqueue it, link child collections and
//! relations and enqueue their first pages, strip URI templates from every
//! outgoing URL. A handler that cannot find its essential payload returns
//! the document untouched and enqueues nothing.

use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::models::{Document, RelationDescriptor, Request, Urn};

/// Id of a referenced entity, accepting numeric ids and sha strings.
fn id_of(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Link a referenced top-level entity and enqueue it as a resource.
fn entity_ref(
    request: &mut Request,
    document: &mut Document,
    role: &str,
    kind: &str,
    pointer: &str,
) -> Option<Urn> {
    let value = document.value_at(pointer)?.clone();
    let id = id_of(&value)?;
    let urn = Urn::entity(kind, &id);
    document.add_resource(role, urn.clone());
    if let Some(url) = value.get("url").and_then(Value::as_str) {
        request.queue_resource(kind, url, None);
    }
    Some(urn)
}

/// Link a child collection and enqueue its first page.
fn collection_edge(
    request: &mut Request,
    document: &mut Document,
    qualifier: &Urn,
    name: &str,
    url_pointer: &str,
) {
    if let Some(url) = document.str_at(url_pointer).map(str::to_string) {
        document.add_collection(name, Urn::collection(qualifier, name));
        request.queue_collection(name, &url, qualifier.clone());
    }
}

/// Link a many-to-many relation and enqueue its first page with a fresh
/// relation descriptor.
fn relation_edge(
    request: &mut Request,
    document: &mut Document,
    qualifier: &Urn,
    origin: &str,
    role: &str,
    name: &str,
    url_pointer: &str,
) {
    if let Some(url) = document.str_at(url_pointer).map(str::to_string) {
        document.add_relation(role, Urn::relation(qualifier, name));
        let descriptor = RelationDescriptor::new(origin, qualifier.clone(), name);
        request.queue_relation(name, &url, descriptor);
    }
}

/// Self URN for an entity that may be scoped by a context qualifier.
fn scoped_self(qualifier: Option<&Urn>, kind: &str, id: &str) -> Urn {
    match qualifier {
        Some(qualifier) => Urn::child(qualifier, kind, id),
        None => Urn::entity(kind, id),
    }
}

pub(crate) fn process_org(request: &mut Request, document: &mut Document) -> Result<bool> {
    let id = match document.u64_at("/id") {
        Some(id) => id,
        None => {
            warn!(url = %request.url, "org payload has no id");
            return Ok(false);
        }
    };
    let self_urn = Urn::entity("org", id);
    document.add_self_and_siblings(self_urn.clone(), Urn::root("orgs"));

    collection_edge(request, document, &self_urn, "repos", "/repos_url");
    relation_edge(
        request, document, &self_urn, "org", "members", "members", "/members_url",
    );
    collection_edge(request, document, &self_urn, "events", "/events_url");
    Ok(true)
}

pub(crate) fn process_user(request: &mut Request, document: &mut Document) -> Result<bool> {
    let id = match document.u64_at("/id") {
        Some(id) => id,
        None => {
            warn!(url = %request.url, "user payload has no id");
            return Ok(false);
        }
    };
    let self_urn = Urn::entity("user", id);
    document.add_self_and_siblings(self_urn.clone(), Urn::root("users"));

    collection_edge(request, document, &self_urn, "repos", "/repos_url");
    Ok(true)
}

pub(crate) fn process_repo(request: &mut Request, document: &mut Document) -> Result<bool> {
    let (id, owner_id) = match (document.u64_at("/id"), document.u64_at("/owner/id")) {
        (Some(id), Some(owner_id)) => (id, owner_id),
        _ => {
            warn!(url = %request.url, "repo payload missing id or owner");
            return Ok(false);
        }
    };
    let self_urn = Urn::entity("repo", id);
    let owner_urn = Urn::entity("user", owner_id);
    document.add_self_and_siblings(self_urn.clone(), Urn::collection(&owner_urn, "repos"));

    document.add_resource("owner", owner_urn);
    if let Some(url) = document.str_at("/owner/url").map(str::to_string) {
        request.queue_resource("user", &url, None);
    }

    if let Some(org_id) = document.u64_at("/organization/id") {
        document.add_resource("organization", Urn::entity("org", org_id));
        if let Some(url) = document.str_at("/organization/url").map(str::to_string) {
            request.queue_resource("org", &url, None);
        }
    }

    relation_edge(
        request, document, &self_urn, "repo", "teams", "teams", "/teams_url",
    );
    relation_edge(
        request,
        document,
        &self_urn,
        "repo",
        "collaborators",
        "collaborators",
        "/collaborators_url",
    );
    relation_edge(
        request,
        document,
        &self_urn,
        "repo",
        "contributors",
        "contributors",
        "/contributors_url",
    );
    relation_edge(
        request,
        document,
        &self_urn,
        "repo",
        "subscribers",
        "subscribers",
        "/subscribers_url",
    );

    collection_edge(request, document, &self_urn, "issues", "/issues_url");
    collection_edge(request, document, &self_urn, "commits", "/commits_url");
    collection_edge(request, document, &self_urn, "events", "/events_url");
    Ok(true)
}

pub(crate) fn process_team(request: &mut Request, document: &mut Document) -> Result<bool> {
    let id = match document.u64_at("/id") {
        Some(id) => id,
        None => {
            warn!(url = %request.url, "team payload has no id");
            return Ok(false);
        }
    };
    let self_urn = Urn::entity("team", id);
    document.add_resource("self", self_urn.clone());

    if let Some(org_urn) = entity_ref(request, document, "organization", "org", "/organization") {
        document.add_collection("siblings", Urn::collection(&org_urn, "teams"));
    }

    relation_edge(
        request,
        document,
        &self_urn,
        "team",
        "members",
        "team_members",
        "/members_url",
    );
    relation_edge(
        request,
        document,
        &self_urn,
        "team",
        "repos",
        "team_repos",
        "/repositories_url",
    );
    Ok(true)
}

pub(crate) fn process_commit(request: &mut Request, document: &mut Document) -> Result<bool> {
    let sha = match document.str_at("/sha").map(str::to_string) {
        Some(sha) => sha,
        None => {
            warn!(url = %request.url, "commit payload has no sha");
            return Ok(false);
        }
    };
    let qualifier = request.context.qualifier.clone();
    let self_urn = scoped_self(qualifier.as_ref(), "commit", &sha);
    let siblings = match &qualifier {
        Some(qualifier) => Urn::collection(qualifier, "commits"),
        None => Urn::root("commits"),
    };
    document.add_self_and_siblings(self_urn.clone(), siblings);
    if let Some(repo_urn) = qualifier {
        document.add_resource("repo", repo_urn);
    }

    entity_ref(request, document, "author", "user", "/author");
    entity_ref(request, document, "committer", "user", "/committer");

    collection_edge(
        request,
        document,
        &self_urn,
        "commit_comments",
        "/comments_url",
    );
    Ok(true)
}

pub(crate) fn process_pull_request(
    request: &mut Request,
    document: &mut Document,
) -> Result<bool> {
    let id = match document.u64_at("/id") {
        Some(id) => id,
        None => {
            warn!(url = %request.url, "pull_request payload has no id");
            return Ok(false);
        }
    };
    let qualifier = request.context.qualifier.clone();
    let self_urn = scoped_self(qualifier.as_ref(), "pull_request", &id.to_string());
    let siblings = match &qualifier {
        Some(qualifier) => Urn::collection(qualifier, "pull_requests"),
        None => Urn::root("pull_requests"),
    };
    document.add_self_and_siblings(self_urn.clone(), siblings);

    entity_ref(request, document, "user", "user", "/user");
    entity_ref(request, document, "merged_by", "user", "/merged_by");
    entity_ref(request, document, "assignee", "user", "/assignee");

    if let Some(head_id) = document.u64_at("/head/repo/id") {
        document.add_resource("head", Urn::entity("repo", head_id));
    }
    if let Some(base_id) = document.u64_at("/base/repo/id") {
        document.add_resource("base", Urn::entity("repo", base_id));
        if let Some(url) = document.str_at("/base/repo/url").map(str::to_string) {
            request.queue_resource("repo", &url, None);
        }
    }

    // The backing issue shares the pull request's number, not its id; the
    // handler reached through issue_url will compute the canonical URN.
    if let Some(url) = document.str_at("/issue_url").map(str::to_string) {
        request.queue_resource("issue", &url, qualifier.clone());
    }

    collection_edge(
        request,
        document,
        &self_urn,
        "review_comments",
        "/review_comments_url",
    );
    Ok(true)
}

pub(crate) fn process_issue(request: &mut Request, document: &mut Document) -> Result<bool> {
    let id = match document.u64_at("/id") {
        Some(id) => id,
        None => {
            warn!(url = %request.url, "issue payload has no id");
            return Ok(false);
        }
    };
    let qualifier = request.context.qualifier.clone();
    let self_urn = scoped_self(qualifier.as_ref(), "issue", &id.to_string());
    let siblings = match &qualifier {
        Some(qualifier) => Urn::collection(qualifier, "issues"),
        None => Urn::root("issues"),
    };
    document.add_self_and_siblings(self_urn.clone(), siblings);
    if let Some(repo_urn) = qualifier.clone() {
        document.add_resource("repo", repo_urn);
    }

    entity_ref(request, document, "user", "user", "/user");
    entity_ref(request, document, "assignee", "user", "/assignee");

    if let Some(Value::Array(assignees)) = document.value_at("/assignees").cloned() {
        let urns: Vec<Urn> = assignees
            .iter()
            .filter_map(id_of)
            .map(|id| Urn::entity("user", id))
            .collect();
        if !urns.is_empty() {
            document.add_resource_list("assignees", urns);
        }
        for assignee in &assignees {
            if let Some(url) = assignee.get("url").and_then(Value::as_str) {
                request.queue_resource("user", url, None);
            }
        }
    }

    if let Some(Value::Array(labels)) = document.value_at("/labels").cloned() {
        let urns: Vec<Urn> = labels
            .iter()
            .filter_map(id_of)
            .map(|id| scoped_self(qualifier.as_ref(), "label", &id))
            .collect();
        if !urns.is_empty() {
            document.add_resource_list("labels", urns);
        }
    }

    if let Some(milestone_id) = document.u64_at("/milestone/id") {
        document.add_resource(
            "milestone",
            scoped_self(qualifier.as_ref(), "milestone", &milestone_id.to_string()),
        );
    }

    if let Some(url) = document.str_at("/pull_request/url").map(str::to_string) {
        request.queue_resource("pull_request", &url, qualifier);
    }

    collection_edge(
        request,
        document,
        &self_urn,
        "issue_comments",
        "/comments_url",
    );
    Ok(true)
}

/// Shared shape of the three comment handlers.
fn process_comment(
    request: &mut Request,
    document: &mut Document,
    kind: &str,
    siblings_name: &str,
) -> Result<bool> {
    let id = match document.u64_at("/id") {
        Some(id) => id,
        None => {
            warn!(url = %request.url, kind, "comment payload has no id");
            return Ok(false);
        }
    };
    let qualifier = request.context.qualifier.clone();
    let self_urn = scoped_self(qualifier.as_ref(), kind, &id.to_string());
    let siblings = match &qualifier {
        Some(qualifier) => Urn::collection(qualifier, siblings_name),
        None => Urn::root(siblings_name),
    };
    document.add_self_and_siblings(self_urn, siblings);

    entity_ref(request, document, "user", "user", "/user");
    Ok(true)
}

pub(crate) fn process_issue_comment(
    request: &mut Request,
    document: &mut Document,
) -> Result<bool> {
    process_comment(request, document, "issue_comment", "issue_comments")
}

pub(crate) fn process_review_comment(
    request: &mut Request,
    document: &mut Document,
) -> Result<bool> {
    process_comment(request, document, "review_comment", "review_comments")
}

pub(crate) fn process_commit_comment(
    request: &mut Request,
    document: &mut Document,
) -> Result<bool> {
    process_comment(request, document, "commit_comment", "commit_comments")
}

pub(crate) fn process_deployment(request: &mut Request, document: &mut Document) -> Result<bool> {
    let id = match document.u64_at("/id") {
        Some(id) => id,
        None => {
            warn!(url = %request.url, "deployment payload has no id");
            return Ok(false);
        }
    };
    let qualifier = request.context.qualifier.clone();
    let self_urn = scoped_self(qualifier.as_ref(), "deployment", &id.to_string());
    let siblings = match &qualifier {
        Some(qualifier) => Urn::collection(qualifier, "deployments"),
        None => Urn::root("deployments"),
    };
    document.add_self_and_siblings(self_urn, siblings);

    entity_ref(request, document, "creator", "user", "/creator");

    if let (Some(repo_urn), Some(sha)) = (qualifier.as_ref(), document.str_at("/sha")) {
        let commit = Urn::child(repo_urn, "commit", sha);
        document.add_resource("commit", commit);
    }
    Ok(true)
}

pub(crate) fn process_status(request: &mut Request, document: &mut Document) -> Result<bool> {
    let id = match document.u64_at("/id") {
        Some(id) => id,
        None => {
            warn!(url = %request.url, "status payload has no id");
            return Ok(false);
        }
    };
    let qualifier = request.context.qualifier.clone();
    let self_urn = scoped_self(qualifier.as_ref(), "status", &id.to_string());
    let siblings = match &qualifier {
        Some(qualifier) => Urn::collection(qualifier, "statuses"),
        None => Urn::root("statuses"),
    };
    document.add_self_and_siblings(self_urn, siblings);

    entity_ref(request, document, "creator", "user", "/creator");
    Ok(true)
}
