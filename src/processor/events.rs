// src/processor/events.rs

//! Activity event handlers.
//!
//! All `*Event` types share one shell: scope the event under its repo
//! (falling back to the payload team, then the org), emit `self` and the
//! scope's `events` collection as siblings, link and enqueue actor, repo
//! and org, then decode the payload for the event family and link the
//! distinguishing entities. An event with no scope at all is terminal: the
//! document is persisted untouched for audit.

use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::models::{Document, Request, Urn};

/// Event request types served by [`process_event`].
pub(crate) const EVENT_KINDS: &[&str] = &[
    "CommitCommentEvent",
    "CreateEvent",
    "DeleteEvent",
    "DeploymentEvent",
    "DeploymentStatusEvent",
    "ForkEvent",
    "GollumEvent",
    "IssueCommentEvent",
    "IssuesEvent",
    "LabelEvent",
    "MemberEvent",
    "MembershipEvent",
    "MilestoneEvent",
    "OrgBlockEvent",
    "OrganizationEvent",
    "PageBuildEvent",
    "PublicEvent",
    "PullRequestEvent",
    "PullRequestReviewEvent",
    "PullRequestReviewCommentEvent",
    "PushEvent",
    "ReleaseEvent",
    "RepositoryEvent",
    "StarEvent",
    "StatusEvent",
    "TeamEvent",
    "TeamAddEvent",
    "WatchEvent",
];

/// Scope URN for an event payload: repo, then payload team, then org.
pub(crate) fn event_scope(event: &Value) -> Option<Urn> {
    if let Some(id) = event.get("repo").and_then(|r| r.get("id")).and_then(Value::as_u64) {
        return Some(Urn::entity("repo", id));
    }
    if let Some(id) = event
        .pointer("/payload/team/id")
        .and_then(Value::as_u64)
    {
        return Some(Urn::entity("team", id));
    }
    event
        .get("org")
        .and_then(|o| o.get("id"))
        .and_then(Value::as_u64)
        .map(|id| Urn::entity("org", id))
}

/// Event id, a string in the API but tolerated as a number.
fn event_id(document: &Document) -> Option<String> {
    match document.value_at("/id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Link a referenced entity under `role` and enqueue it.
fn link_ref(
    request: &mut Request,
    document: &mut Document,
    role: &str,
    kind: &str,
    urn: Urn,
    url: Option<&str>,
    qualifier: Option<Urn>,
) {
    document.add_resource(role, urn);
    if let Some(url) = url {
        let owned = url.to_string();
        request.queue_resource(kind, &owned, qualifier);
    }
}

pub(crate) fn process_event(request: &mut Request, document: &mut Document) -> Result<bool> {
    let id = match event_id(document) {
        Some(id) => id,
        None => {
            warn!(kind = %request.kind, url = %request.url, "event payload has no id");
            return Ok(false);
        }
    };
    let content = Value::Object(document.content.clone());
    let scope = match event_scope(&content) {
        Some(scope) => scope,
        None => {
            warn!(kind = %request.kind, url = %request.url, "event has no repo, team, or org");
            return Ok(false);
        }
    };

    document.add_self_and_siblings(
        Urn::child(&scope, &request.kind, &id),
        Urn::collection(&scope, "events"),
    );

    if let Some(actor_id) = document.u64_at("/actor/id") {
        let url = document.str_at("/actor/url").map(str::to_string);
        link_ref(
            request,
            document,
            "actor",
            "user",
            Urn::entity("user", actor_id),
            url.as_deref(),
            None,
        );
    }
    let repo_urn = document.u64_at("/repo/id").map(|id| Urn::entity("repo", id));
    if let Some(repo_urn) = repo_urn.clone() {
        let url = document.str_at("/repo/url").map(str::to_string);
        link_ref(request, document, "repo", "repo", repo_urn, url.as_deref(), None);
    }
    if let Some(org_id) = document.u64_at("/org/id") {
        let url = document.str_at("/org/url").map(str::to_string);
        link_ref(
            request,
            document,
            "org",
            "org",
            Urn::entity("org", org_id),
            url.as_deref(),
            None,
        );
    }

    // Some event families (TeamEvent, RepositoryEvent, ...) carry a full
    // repository object in the payload.
    if let Some(repository_id) = document.u64_at("/payload/repository/id") {
        let url = document.str_at("/payload/repository/url").map(str::to_string);
        link_ref(
            request,
            document,
            "repository",
            "repo",
            Urn::entity("repo", repository_id),
            url.as_deref(),
            None,
        );
    }

    decode_payload(request, document, repo_urn);
    Ok(true)
}

/// Family-specific payload links and follow-ups.
fn decode_payload(request: &mut Request, document: &mut Document, repo_urn: Option<Urn>) {
    match request.kind.as_str() {
        "CommitCommentEvent" => {
            let repo_urn = match repo_urn {
                Some(urn) => urn,
                None => return,
            };
            let sha = match document.str_at("/payload/comment/commit_id").map(str::to_string) {
                Some(sha) => sha,
                None => return,
            };
            let commit_urn = Urn::child(&repo_urn, "commit", &sha);
            document.add_resource("commit", commit_urn.clone());
            if let Some(repo_url) = document.str_at("/repo/url").map(str::to_string) {
                let commit_url = format!("{repo_url}/commits/{sha}");
                request.queue_resource("commit", &commit_url, Some(repo_urn));
            }
            if let Some(comment_id) = document.u64_at("/payload/comment/id") {
                let comment_urn =
                    Urn::child(&commit_urn, "commit_comment", comment_id);
                let url = document.str_at("/payload/comment/url").map(str::to_string);
                link_ref(
                    request,
                    document,
                    "comment",
                    "commit_comment",
                    comment_urn,
                    url.as_deref(),
                    Some(commit_urn),
                );
            }
        }
        "DeploymentEvent" => {
            if let (Some(repo_urn), Some(deployment_id)) =
                (repo_urn, document.u64_at("/payload/deployment/id"))
            {
                let urn = Urn::child(&repo_urn, "deployment", deployment_id);
                let url = document.str_at("/payload/deployment/url").map(str::to_string);
                link_ref(
                    request,
                    document,
                    "deployment",
                    "deployment",
                    urn,
                    url.as_deref(),
                    Some(repo_urn),
                );
            }
        }
        "DeploymentStatusEvent" => {
            let repo_urn = match repo_urn {
                Some(urn) => urn,
                None => return,
            };
            let deployment_id = match document.u64_at("/payload/deployment/id") {
                Some(id) => id,
                None => return,
            };
            let deployment_urn = Urn::child(&repo_urn, "deployment", deployment_id);
            document.add_resource("deployment", deployment_urn.clone());
            if let Some(status_id) = document.u64_at("/payload/deployment_status/id") {
                let status_urn = Urn::child(&deployment_urn, "status", status_id);
                let url = document
                    .str_at("/payload/deployment_status/url")
                    .map(str::to_string);
                link_ref(
                    request,
                    document,
                    "deployment_status",
                    "status",
                    status_urn,
                    url.as_deref(),
                    Some(deployment_urn),
                );
            }
        }
        "ForkEvent" => {
            if let Some(forkee_id) = document.u64_at("/payload/forkee/id") {
                let url = document.str_at("/payload/forkee/url").map(str::to_string);
                link_ref(
                    request,
                    document,
                    "forkee",
                    "repo",
                    Urn::entity("repo", forkee_id),
                    url.as_deref(),
                    None,
                );
            }
        }
        "IssueCommentEvent" => {
            let repo_urn = match repo_urn {
                Some(urn) => urn,
                None => return,
            };
            let issue_id = match document.u64_at("/payload/issue/id") {
                Some(id) => id,
                None => return,
            };
            let issue_urn = Urn::child(&repo_urn, "issue", issue_id);
            let issue_url = document.str_at("/payload/issue/url").map(str::to_string);
            link_ref(
                request,
                document,
                "issue",
                "issue",
                issue_urn.clone(),
                issue_url.as_deref(),
                Some(repo_urn),
            );
            if let Some(comment_id) = document.u64_at("/payload/comment/id") {
                let comment_urn = Urn::child(&issue_urn, "issue_comment", comment_id);
                let url = document.str_at("/payload/comment/url").map(str::to_string);
                link_ref(
                    request,
                    document,
                    "comment",
                    "issue_comment",
                    comment_urn,
                    url.as_deref(),
                    Some(issue_urn),
                );
            }
        }
        "IssuesEvent" => {
            if let (Some(repo_urn), Some(issue_id)) =
                (repo_urn, document.u64_at("/payload/issue/id"))
            {
                let urn = Urn::child(&repo_urn, "issue", issue_id);
                let url = document.str_at("/payload/issue/url").map(str::to_string);
                link_ref(
                    request, document, "issue", "issue", urn, url.as_deref(), Some(repo_urn),
                );
            }
        }
        "MemberEvent" => {
            if let Some(member_id) = document.u64_at("/payload/member/id") {
                let url = document.str_at("/payload/member/url").map(str::to_string);
                link_ref(
                    request,
                    document,
                    "member",
                    "user",
                    Urn::entity("user", member_id),
                    url.as_deref(),
                    None,
                );
            }
        }
        "MembershipEvent" => {
            if let Some(member_id) = document.u64_at("/payload/member/id") {
                let url = document.str_at("/payload/member/url").map(str::to_string);
                link_ref(
                    request,
                    document,
                    "member",
                    "user",
                    Urn::entity("user", member_id),
                    url.as_deref(),
                    None,
                );
            }
            if let Some(team_id) = document.u64_at("/payload/team/id") {
                let url = document.str_at("/payload/team/url").map(str::to_string);
                link_ref(
                    request,
                    document,
                    "team",
                    "team",
                    Urn::entity("team", team_id),
                    url.as_deref(),
                    None,
                );
            }
        }
        "MilestoneEvent" => {
            if let (Some(repo_urn), Some(milestone_id)) =
                (repo_urn, document.u64_at("/payload/milestone/id"))
            {
                document.add_resource(
                    "milestone",
                    Urn::child(&repo_urn, "milestone", milestone_id),
                );
            }
        }
        "OrgBlockEvent" => {
            if let Some(blocked_id) = document.u64_at("/payload/blocked_user/id") {
                let url = document
                    .str_at("/payload/blocked_user/url")
                    .map(str::to_string);
                link_ref(
                    request,
                    document,
                    "blocked_user",
                    "user",
                    Urn::entity("user", blocked_id),
                    url.as_deref(),
                    None,
                );
            }
        }
        "OrganizationEvent" => {
            if let Some(member_id) = document.u64_at("/payload/membership/user/id") {
                let url = document
                    .str_at("/payload/membership/user/url")
                    .map(str::to_string);
                link_ref(
                    request,
                    document,
                    "member",
                    "user",
                    Urn::entity("user", member_id),
                    url.as_deref(),
                    None,
                );
            }
        }
        "PullRequestEvent" => {
            if let (Some(repo_urn), Some(pull_id)) =
                (repo_urn, document.u64_at("/payload/pull_request/id"))
            {
                let urn = Urn::child(&repo_urn, "pull_request", pull_id);
                let url = document
                    .str_at("/payload/pull_request/url")
                    .map(str::to_string);
                link_ref(
                    request,
                    document,
                    "pull_request",
                    "pull_request",
                    urn,
                    url.as_deref(),
                    Some(repo_urn),
                );
            }
        }
        "PullRequestReviewEvent" => {
            let repo_urn = match repo_urn {
                Some(urn) => urn,
                None => return,
            };
            let pull_id = match document.u64_at("/payload/pull_request/id") {
                Some(id) => id,
                None => return,
            };
            let pull_urn = Urn::child(&repo_urn, "pull_request", pull_id);
            let url = document
                .str_at("/payload/pull_request/url")
                .map(str::to_string);
            link_ref(
                request,
                document,
                "pull_request",
                "pull_request",
                pull_urn.clone(),
                url.as_deref(),
                Some(repo_urn),
            );
            if let Some(review_id) = document.u64_at("/payload/review/id") {
                document.add_resource("review", Urn::child(&pull_urn, "review", review_id));
            }
        }
        "PullRequestReviewCommentEvent" => {
            let repo_urn = match repo_urn {
                Some(urn) => urn,
                None => return,
            };
            let pull_id = match document.u64_at("/payload/pull_request/id") {
                Some(id) => id,
                None => return,
            };
            let pull_urn = Urn::child(&repo_urn, "pull_request", pull_id);
            let pull_url = document
                .str_at("/payload/pull_request/url")
                .map(str::to_string);
            link_ref(
                request,
                document,
                "pull_request",
                "pull_request",
                pull_urn.clone(),
                pull_url.as_deref(),
                Some(repo_urn),
            );
            if let Some(comment_id) = document.u64_at("/payload/comment/id") {
                let comment_urn = Urn::child(&pull_urn, "review_comment", comment_id);
                let url = document.str_at("/payload/comment/url").map(str::to_string);
                link_ref(
                    request,
                    document,
                    "comment",
                    "review_comment",
                    comment_urn,
                    url.as_deref(),
                    Some(pull_urn),
                );
            }
        }
        "PushEvent" => {
            if let Some(repo_urn) = repo_urn {
                if let Some(Value::Array(commits)) = document.value_at("/payload/commits").cloned()
                {
                    let urns: Vec<Urn> = commits
                        .iter()
                        .filter_map(|c| c.get("sha").and_then(Value::as_str))
                        .map(|sha| Urn::child(&repo_urn, "commit", sha))
                        .collect();
                    if !urns.is_empty() {
                        document.add_resource_list("commits", urns);
                    }
                }
            }
        }
        "ReleaseEvent" => {
            if let (Some(repo_urn), Some(release_id)) =
                (repo_urn, document.u64_at("/payload/release/id"))
            {
                document.add_resource("release", Urn::child(&repo_urn, "release", release_id));
            }
        }
        "StatusEvent" => {
            // The payload carries only a sha; synthesize the commit URN and
            // do not enqueue (no URL is known).
            if let (Some(repo_urn), Some(sha)) = (repo_urn, document.str_at("/payload/sha")) {
                let commit = Urn::child(&repo_urn, "commit", sha);
                document.add_resource("commit", commit);
            }
        }
        "TeamEvent" | "TeamAddEvent" => {
            if let Some(team_id) = document.u64_at("/payload/team/id") {
                let url = document.str_at("/payload/team/url").map(str::to_string);
                link_ref(
                    request,
                    document,
                    "team",
                    "team",
                    Urn::entity("team", team_id),
                    url.as_deref(),
                    None,
                );
            }
        }
        // CreateEvent, DeleteEvent, GollumEvent, LabelEvent, PageBuildEvent,
        // PublicEvent, RepositoryEvent, StarEvent, WatchEvent: the shell
        // links cover everything addressable.
        _ => {}
    }
}
