// src/services/finder.rs

//! Event dedup against the store.
//!
//! A page of activity events is filtered down to the events not yet
//! persisted, keyed by `<repo.url>/events/<id>`. Lookups fan out
//! concurrently; output order matches input order. Store failures bubble
//! up as `StoreUnavailable` so the host can retry the page.

use futures::stream::{self, StreamExt};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::storage::DocumentStore;

/// Concurrent store lookups in flight per page.
const LOOKUP_CONCURRENCY: usize = 8;

/// Store key for one event: its type plus `<repo.url>/events/<id>`.
fn event_key(event: &Value) -> Option<(String, String)> {
    let kind = event
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("event")
        .to_string();
    let repo_url = event.get("repo")?.get("url")?.as_str()?;
    let id = match event.get("id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some((kind, format!("{repo_url}/events/{id}")))
}

/// Return the subset of `events` not yet present in the store, preserving
/// input order. Events with no computable key cannot be deduplicated and
/// are passed through as new.
pub async fn find_new(store: &dyn DocumentStore, events: Vec<Value>) -> Result<Vec<Value>> {
    let lookups: Vec<Result<bool>> = stream::iter(events.iter().map(event_key))
        .map(|key| async move {
            match key {
                Some((kind, key)) => match store.get(&kind, &key).await {
                    Ok(stored) => Ok(stored.is_some()),
                    Err(e) => Err(AppError::store(e)),
                },
                None => Ok(false),
            }
        })
        .buffered(LOOKUP_CONCURRENCY)
        .collect()
        .await;
    let hits = lookups.into_iter().collect::<Result<Vec<bool>>>()?;

    Ok(events
        .into_iter()
        .zip(hits)
        .filter_map(|(event, seen)| (!seen).then_some(event))
        .collect())
}
