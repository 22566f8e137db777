// src/services/fetcher.rs

//! Document fetching.
//!
//! The narrow contract between the crawl loop and the outside world: given
//! a request, attach a document and response envelope. The HTTP fetcher
//! performs conditional GETs against the GitHub REST API and falls back to
//! the store on `304 Not Modified`; the `none`/`storage` fetch strategies
//! never touch the network.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, Document, FetchStrategy, Request, ResponseInfo};
use crate::storage::DocumentStore;

/// How a request's document was sourced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Body came from origin.
    Origin,
    /// Body came from the store.
    Storage,
    /// Origin said 304; stored body reused.
    NotModified,
    /// The request already carried its document (event fan-out).
    Preloaded,
    /// Nothing available; the request cannot be processed.
    Missing,
}

/// Trait for document fetchers.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &mut Request) -> Result<FetchOutcome>;
}

/// Fetcher backed by the GitHub REST API.
pub struct HttpFetcher {
    client: Client,
    store: Arc<dyn DocumentStore>,
}

impl HttpFetcher {
    /// Create a fetcher with the configured user agent, timeout and token.
    pub fn new(config: &CrawlerConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        if let Some(token) = &config.auth_token {
            let value = header::HeaderValue::from_str(&format!("token {token}"))
                .map_err(|e| AppError::config(format!("invalid auth token: {e}")))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, store })
    }

    async fn from_store(&self, request: &mut Request) -> Result<FetchOutcome> {
        match self.store.get(&request.kind, &request.url).await? {
            Some(document) => {
                request.document = Some(document);
                Ok(FetchOutcome::Storage)
            }
            None => Ok(FetchOutcome::Missing),
        }
    }

    async fn from_origin(&self, request: &mut Request) -> Result<FetchOutcome> {
        let stored_etag = self.store.etag(&request.kind, &request.url).await?;

        let mut http_request = self.client.get(&request.url);
        if let Some(etag) = &stored_etag {
            http_request = http_request.header(header::IF_NONE_MATCH, etag);
        }
        let response = http_request.send().await?;

        let status = response.status();
        let etag = header_string(&response, header::ETAG);
        let link_header = header_string(&response, header::LINK);
        request.response = Some(ResponseInfo {
            status: status.as_u16(),
            etag: etag.clone(),
            link_header,
            fetched_at: Some(Utc::now()),
        });

        if status == reqwest::StatusCode::NOT_MODIFIED {
            return match self.store.get(&request.kind, &request.url).await? {
                Some(document) => {
                    request.document = Some(document);
                    Ok(FetchOutcome::NotModified)
                }
                None => Ok(FetchOutcome::Missing),
            };
        }
        if !status.is_success() {
            return Err(AppError::fetch(
                request.url.clone(),
                format!("unexpected status {status}"),
            ));
        }

        let body: serde_json::Value = response.json().await?;
        let mut document = Document::from_value(request.kind.clone(), request.url.clone(), body);
        document.metadata.etag = etag;
        document.metadata.fetched_at = Some(Utc::now());
        request.document = Some(document);
        Ok(FetchOutcome::Origin)
    }
}

fn header_string(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &mut Request) -> Result<FetchOutcome> {
        if request.document.is_some() {
            return Ok(FetchOutcome::Preloaded);
        }
        match request.policy.fetch {
            FetchStrategy::None | FetchStrategy::Storage => self.from_store(request).await,
            FetchStrategy::OriginStorage | FetchStrategy::Mutables | FetchStrategy::Always => {
                self.from_origin(request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Freshness, Transitivity, TraversalPolicy, Urn};
    use crate::storage::MemoryStore;
    use serde_json::json;

    fn storage_policy() -> TraversalPolicy {
        TraversalPolicy::new(
            Transitivity::Shallow,
            Freshness::Version,
            FetchStrategy::Storage,
        )
    }

    #[tokio::test]
    async fn test_storage_strategy_reads_store() {
        let store = Arc::new(MemoryStore::new());
        let mut doc = Document::from_value("repo", "http://foo/repo/12", json!({ "id": 12 }));
        doc.add_self_and_siblings(
            Urn::entity("repo", 12),
            Urn::collection(&Urn::entity("user", 45), "repos"),
        );
        store.upsert(&doc).await.unwrap();

        let fetcher = HttpFetcher::new(&CrawlerConfig::default(), store).unwrap();
        let mut request =
            Request::new("repo", "http://foo/repo/12").with_policy(storage_policy());

        let outcome = fetcher.fetch(&mut request).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Storage);
        assert_eq!(request.document.unwrap().u64_at("/id"), Some(12));
    }

    #[tokio::test]
    async fn test_storage_strategy_missing() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = HttpFetcher::new(&CrawlerConfig::default(), store).unwrap();
        let mut request = Request::new("repo", "http://gone").with_policy(storage_policy());

        let outcome = fetcher.fetch(&mut request).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Missing);
        assert!(request.document.is_none());
    }

    #[tokio::test]
    async fn test_preloaded_document_short_circuits() {
        let store = Arc::new(MemoryStore::new());
        let fetcher = HttpFetcher::new(&CrawlerConfig::default(), store).unwrap();

        let mut request = Request::new("PushEvent", "http://repo/4/events/1");
        request.document = Some(Document::from_value(
            "PushEvent",
            "http://repo/4/events/1",
            json!({ "id": "1" }),
        ));

        let outcome = fetcher.fetch(&mut request).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Preloaded);
    }

    #[test]
    fn test_bad_token_is_config_error() {
        let config = CrawlerConfig {
            auth_token: Some("bad\ntoken".to_string()),
            ..CrawlerConfig::default()
        };
        let store = Arc::new(MemoryStore::new());
        assert!(matches!(
            HttpFetcher::new(&config, store),
            Err(AppError::Config(_))
        ));
    }
}
