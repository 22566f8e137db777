// src/processor/mod.rs

//! Document processor: dispatch, freshness gating, pagination.
//!
//! The processor owns a registry mapping request types to handlers. For
//! each request it decides whether the document should be handled at all
//! (the freshness gate), dispatches to the per-type handler that links the
//! canonical document and fills the request's outbox, then stamps the
//! processing envelope and fans out pagination.
//!
//! The processor is purely functional per request: it reads the request
//! and its document, mutates only those, and performs no I/O besides the
//! store reads the freshness gate may need.

mod collections;
mod entities;
mod events;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::models::{Document, EdgeRole, Freshness, GateVerdict, Priority, Request};
use crate::storage::DocumentStore;
use crate::utils::url::{parse_link_header, with_page};

/// Version stamped into `_metadata.version` by this code revision.
/// Bump when handler output changes shape so stored documents reprocess.
pub const PROCESSOR_VERSION: u32 = 11;

/// A per-type document handler.
///
/// Returns `true` when the document was handled, `false` for a terminal
/// state (essential payload missing): the document is returned unmodified
/// and nothing is enqueued, but it is still persisted for audit.
pub type Handler = fn(&mut Request, &mut Document) -> Result<bool>;

/// Dispatching processor.
pub struct Processor {
    version: u32,
    store: Arc<dyn DocumentStore>,
    handlers: HashMap<&'static str, Handler>,
    warned_types: Mutex<HashSet<String>>,
}

impl Processor {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_version(store, PROCESSOR_VERSION)
    }

    pub fn with_version(store: Arc<dyn DocumentStore>, version: u32) -> Self {
        Self {
            version,
            store,
            handlers: registry(),
            warned_types: Mutex::new(HashSet::new()),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Types this processor can handle at all.
    pub fn queued_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.keys().copied()
    }

    /// Decide whether `request` should be handled.
    ///
    /// False when the type has no handler, or when the freshness gate says
    /// the stored document is still fresh. Store reads made for the gate
    /// can fail with `StoreUnavailable`; the host should retry the request.
    pub async fn can_handle(&self, request: &Request) -> Result<bool> {
        if !self.handlers.contains_key(request.kind.as_str()) {
            let mut warned = self.warned_types.lock().expect("warned set poisoned");
            if warned.insert(request.kind.clone()) {
                warn!(kind = %request.kind, "no handler registered for request type");
            }
            return Ok(false);
        }

        // Only the store reads the active freshness rule needs.
        let stored_version = match request.policy.freshness {
            Freshness::Version | Freshness::Mutables => {
                match request.document.as_ref().and_then(|d| d.metadata.version) {
                    Some(version) => Some(version),
                    None => self
                        .store
                        .get(&request.kind, &request.url)
                        .await
                        .map_err(AppError::store)?
                        .and_then(|doc| doc.metadata.version),
                }
            }
            _ => None,
        };
        let stored_etag = match request.policy.freshness {
            Freshness::Match => self
                .store
                .etag(&request.kind, &request.url)
                .await
                .map_err(AppError::store)?,
            _ => None,
        };
        let fetched_etag = request.response.as_ref().and_then(|r| r.etag.clone());

        match request.policy.gate(
            stored_version,
            self.version,
            stored_etag.as_deref(),
            fetched_etag.as_deref(),
        ) {
            GateVerdict::Process => Ok(true),
            GateVerdict::Skip => {
                debug!(kind = %request.kind, url = %request.url, "fresh; skipping");
                Ok(false)
            }
            GateVerdict::SkipNewer => {
                warn!(
                    kind = %request.kind,
                    url = %request.url,
                    stored = stored_version,
                    current = self.version,
                    "stored document is newer than this processor"
                );
                Ok(false)
            }
        }
    }

    /// Transform the request's document and fill its outbox.
    ///
    /// Returns the document for upsert. When the gate skips, the document
    /// is returned bytewise unchanged and nothing is enqueued.
    pub async fn process(&self, request: &mut Request) -> Result<Option<Document>> {
        if !self.can_handle(request).await? {
            return Ok(request.document.clone());
        }

        let mut document = match request.document.take() {
            Some(document) => document,
            None => return Ok(None),
        };

        let handler = self.handlers[request.kind.as_str()];
        let handled = handler(request, &mut document)?;

        if handled {
            document.metadata.version = Some(self.version);
            document.metadata.processed_at = Some(Utc::now());
            self.queue_remaining_pages(request);
        }

        request.document = Some(document.clone());
        Ok(Some(document))
    }

    /// Enqueue the remaining pages of a paginated response in one bulk
    /// push at `soon`, typed like the parent, pages `current+1..=last`.
    fn queue_remaining_pages(&self, request: &mut Request) {
        let header = match request
            .response
            .as_ref()
            .and_then(|r| r.link_header.as_deref())
        {
            Some(header) => header,
            None => return,
        };

        let links = parse_link_header(header);
        let (next_url, next_page) = match (links.next.as_deref(), links.next_page()) {
            (Some(url), Some(page)) => (url, page),
            _ => return,
        };
        let last_page = match links.last_page() {
            Some(page) => page,
            // A next without a last is unparseable for fan-out purposes.
            None => {
                warn!(url = %request.url, "pagination header has next but no last; continuing");
                return;
            }
        };

        let mut pages = Vec::new();
        for page in next_page..=last_page {
            let url = match with_page(next_url, page) {
                Some(url) => url,
                None => {
                    warn!(url = %next_url, "unparseable pagination URL; continuing");
                    return;
                }
            };
            let mut child = request.child(request.kind.clone(), &url, EdgeRole::CollectionPage);
            child.context.relation = request.context.relation.clone();
            pages.push(child);
        }
        request.outbox.push_many(pages, Priority::Soon);
    }
}

/// Build the type -> handler registry.
fn registry() -> HashMap<&'static str, Handler> {
    let mut handlers: HashMap<&'static str, Handler> = HashMap::new();

    // Singleton entities.
    handlers.insert("org", entities::process_org as Handler);
    handlers.insert("user", entities::process_user);
    handlers.insert("repo", entities::process_repo);
    handlers.insert("team", entities::process_team);
    handlers.insert("commit", entities::process_commit);
    handlers.insert("pull_request", entities::process_pull_request);
    handlers.insert("issue", entities::process_issue);
    handlers.insert("issue_comment", entities::process_issue_comment);
    handlers.insert("review_comment", entities::process_review_comment);
    handlers.insert("commit_comment", entities::process_commit_comment);
    handlers.insert("deployment", entities::process_deployment);
    handlers.insert("status", entities::process_status);

    // Collections and relation pages.
    for kind in collections::COLLECTION_KINDS.iter().copied() {
        handlers.insert(kind, collections::process_collection);
    }

    // Activity events.
    for kind in events::EVENT_KINDS.iter().copied() {
        handlers.insert(kind, events::process_event);
    }

    handlers
}
