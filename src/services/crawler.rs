// src/services/crawler.rs

//! The crawl loop.
//!
//! Ties the pieces together: pop a request, fetch its body, filter event
//! pages against the store, process, upsert the transformed document, and
//! drain the request's outbox into the queues. The loop is bounded by
//! `max_requests` and paces itself with the configured delay.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{Config, Request};
use crate::processor::Processor;
use crate::services::fetcher::{FetchOutcome, Fetcher};
use crate::services::finder::find_new;
use crate::services::queue::InMemoryQueue;
use crate::storage::DocumentStore;

/// Statistics for a crawl run.
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub processed: usize,
    pub upserted: usize,
    pub missing: usize,
    pub failures: usize,
    pub remaining: usize,
}

/// Queue-driven crawler over a store and fetcher.
pub struct Crawler {
    queue: Arc<InMemoryQueue>,
    store: Arc<dyn DocumentStore>,
    fetcher: Arc<dyn Fetcher>,
    processor: Processor,
    request_delay: Duration,
    max_requests: usize,
}

impl Crawler {
    pub fn new(
        config: &Config,
        queue: Arc<InMemoryQueue>,
        store: Arc<dyn DocumentStore>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            queue,
            store: store.clone(),
            fetcher,
            processor: Processor::new(store),
            request_delay: Duration::from_millis(config.crawler.request_delay_ms),
            max_requests: config.crawler.max_requests,
        }
    }

    /// Seed the queue with a starting request.
    pub fn seed(&self, request: Request) {
        self.queue.queue(request);
    }

    /// Drain the queue until it is empty or the request bound is reached.
    pub async fn run(&self) -> Result<RunStats> {
        let mut stats = RunStats::default();

        loop {
            if self.max_requests > 0 && stats.processed >= self.max_requests {
                info!(limit = self.max_requests, "request bound reached");
                break;
            }
            let mut request = match self.queue.pop() {
                Some(request) => request,
                None => break,
            };
            stats.processed += 1;

            match self.step(&mut request).await {
                Ok(true) => stats.upserted += 1,
                Ok(false) => stats.missing += 1,
                Err(e) => {
                    warn!(kind = %request.kind, url = %request.url, error = %e, "request failed");
                    stats.failures += 1;
                }
            }

            for (child, priority) in request.outbox.drain() {
                self.queue.push(vec![child], priority);
            }

            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
        }

        stats.remaining = self.queue.len();
        Ok(stats)
    }

    /// Fetch, process and upsert one request. True when a document landed
    /// in the store.
    async fn step(&self, request: &mut Request) -> Result<bool> {
        let outcome = self.fetcher.fetch(request).await?;
        if outcome == FetchOutcome::Missing {
            debug!(kind = %request.kind, url = %request.url, "nothing to fetch");
            return Ok(false);
        }

        if request.kind == "events" {
            self.drop_seen_events(request).await?;
        }

        let document = self.processor.process(request).await?;
        match document {
            Some(document) if document.self_urn().is_some() => {
                self.store.upsert(&document).await?;
                Ok(true)
            }
            Some(_) => {
                debug!(kind = %request.kind, url = %request.url, "document has no self URN; not persisted");
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Filter an events page down to events not yet in the store.
    async fn drop_seen_events(&self, request: &mut Request) -> Result<()> {
        let document = match request.document.as_mut() {
            Some(document) => document,
            None => return Ok(()),
        };
        let elements = match document.content.get("elements") {
            Some(Value::Array(items)) => items.clone(),
            _ => return Ok(()),
        };

        let total = elements.len();
        let fresh = find_new(self.store.as_ref(), elements).await?;
        if fresh.len() < total {
            debug!(
                url = %request.url,
                dropped = total - fresh.len(),
                "dropped already-seen events"
            );
        }
        document
            .content
            .insert("elements".to_string(), Value::Array(fresh));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Document, Urn};
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fetcher serving canned payloads by URL.
    struct CannedFetcher {
        payloads: Mutex<HashMap<String, Value>>,
    }

    impl CannedFetcher {
        fn new(payloads: Vec<(&str, Value)>) -> Self {
            Self {
                payloads: Mutex::new(
                    payloads
                        .into_iter()
                        .map(|(url, v)| (url.to_string(), v))
                        .collect(),
                ),
            }
        }
    }

    #[async_trait]
    impl Fetcher for CannedFetcher {
        async fn fetch(&self, request: &mut Request) -> Result<FetchOutcome> {
            if request.document.is_some() {
                return Ok(FetchOutcome::Preloaded);
            }
            let payloads = self.payloads.lock().unwrap();
            match payloads.get(&request.url) {
                Some(payload) => {
                    request.document = Some(Document::from_value(
                        request.kind.clone(),
                        request.url.clone(),
                        payload.clone(),
                    ));
                    Ok(FetchOutcome::Origin)
                }
                None => Ok(FetchOutcome::Missing),
            }
        }
    }

    fn crawler_with(
        fetcher: CannedFetcher,
        max_requests: usize,
    ) -> (Crawler, Arc<MemoryStore>, Arc<InMemoryQueue>) {
        let mut config = Config::default();
        config.crawler.max_requests = max_requests;
        config.crawler.request_delay_ms = 0;
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(InMemoryQueue::with_dedup());
        let crawler = Crawler::new(
            &config,
            queue.clone(),
            store.clone(),
            Arc::new(fetcher),
        );
        (crawler, store, queue)
    }

    #[tokio::test]
    async fn test_crawl_repo_expands_graph() {
        let fetcher = CannedFetcher::new(vec![
            (
                "http://foo/repo/12",
                json!({
                    "id": 12,
                    "owner": { "id": 45, "url": "http://user/45" }
                }),
            ),
            (
                "http://user/45",
                json!({ "id": 45, "repos_url": "http://user/45/repos" }),
            ),
        ]);
        let (crawler, store, _) = crawler_with(fetcher, 0);

        crawler.seed(Request::new("repo", "http://foo/repo/12"));
        let stats = crawler.run().await.unwrap();

        assert_eq!(stats.failures, 0);
        assert!(stats.processed >= 2);
        assert!(store
            .get("repo", "urn:repo:12")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .get("user", "urn:user:45")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_request_bound_respected() {
        let fetcher = CannedFetcher::new(vec![(
            "http://foo/repo/12",
            json!({
                "id": 12,
                "owner": { "id": 45, "url": "http://user/45" }
            }),
        )]);
        let (crawler, _, _) = crawler_with(fetcher, 1);

        crawler.seed(Request::new("repo", "http://foo/repo/12"));
        let stats = crawler.run().await.unwrap();

        assert_eq!(stats.processed, 1);
        assert!(stats.remaining > 0);
    }

    #[tokio::test]
    async fn test_events_page_deduplicated_before_processing() {
        // Event 3 is already stored; only event 5 should land.
        let fetcher = CannedFetcher::new(vec![(
            "http://repo/4/events",
            json!([
                {
                    "id": "3",
                    "type": "WatchEvent",
                    "repo": { "id": 4, "url": "http://repo/4" },
                    "actor": { "id": 1, "url": "http://user/1" }
                },
                {
                    "id": "5",
                    "type": "WatchEvent",
                    "repo": { "id": 4, "url": "http://repo/4" },
                    "actor": { "id": 1, "url": "http://user/1" }
                }
            ]),
        )]);
        let (crawler, store, _) = crawler_with(fetcher, 0);

        let mut seen = Document::from_value(
            "WatchEvent",
            "http://repo/4/events/3",
            json!({ "id": "3" }),
        );
        seen.add_self_and_siblings(
            Urn::from("urn:repo:4:WatchEvent:3"),
            Urn::from("urn:repo:4:events"),
        );
        store.upsert(&seen).await.unwrap();

        crawler.seed(
            Request::new("events", "http://repo/4/events")
                .with_qualifier(Urn::entity("repo", 4)),
        );
        let stats = crawler.run().await.unwrap();
        assert_eq!(stats.failures, 0);

        let fresh = store
            .get("WatchEvent", "urn:repo:4:WatchEvent:5")
            .await
            .unwrap()
            .unwrap();
        assert!(fresh.metadata.version.is_some());

        // The seen event was dropped before processing: never stamped.
        let seen = store
            .get("WatchEvent", "urn:repo:4:WatchEvent:3")
            .await
            .unwrap()
            .unwrap();
        assert!(seen.metadata.version.is_none());
    }

    struct OfflineFetcher;

    #[async_trait]
    impl Fetcher for OfflineFetcher {
        async fn fetch(&self, _: &mut Request) -> Result<FetchOutcome> {
            Err(AppError::fetch("http://x", "connection refused"))
        }
    }

    #[tokio::test]
    async fn test_fetch_failure_counts_and_continues() {
        let mut config = Config::default();
        config.crawler.request_delay_ms = 0;
        let store = Arc::new(MemoryStore::new());
        let queue = Arc::new(InMemoryQueue::new());
        let crawler = Crawler::new(&config, queue, store, Arc::new(OfflineFetcher));

        crawler.seed(Request::new("repo", "http://foo/repo/12"));
        crawler.seed(Request::new("repo", "http://foo/repo/13"));
        let stats = crawler.run().await.unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.failures, 2);
    }
}
