// src/storage/cache.rs

//! Read-through TTL cache over a document store.
//!
//! Process-local and best-effort: entries expire after the configured TTL
//! and the cache never substitutes for the backing store's durability.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use crate::error::Result;
use crate::models::{Document, DocumentSummary, Urn};
use crate::storage::DocumentStore;

/// Caching wrapper around any [`DocumentStore`].
pub struct CachedStore<S> {
    inner: S,
    cache: Cache<String, Document>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<S: DocumentStore> CachedStore<S> {
    /// Wrap a store with a TTL cache of the given capacity.
    pub fn new(inner: S, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self {
            inner,
            cache,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    fn cache_key(kind: &str, key: &str) -> String {
        format!("{kind}\u{1}{key}")
    }

    /// (hits, misses) counters since construction.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[async_trait]
impl<S: DocumentStore> DocumentStore for CachedStore<S> {
    async fn get(&self, kind: &str, key: &str) -> Result<Option<Document>> {
        let cache_key = Self::cache_key(kind, key);
        if let Some(doc) = self.cache.get(&cache_key).await {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(doc));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let fetched = self.inner.get(kind, key).await?;
        if let Some(doc) = &fetched {
            self.cache.insert(cache_key, doc.clone()).await;
        }
        Ok(fetched)
    }

    async fn etag(&self, kind: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(kind, key)
            .await?
            .and_then(|doc| doc.metadata.etag))
    }

    async fn upsert(&self, document: &Document) -> Result<Urn> {
        let urn = self.inner.upsert(document).await?;
        let kind = &document.metadata.kind;
        self.cache
            .insert(Self::cache_key(kind, urn.as_str()), document.clone())
            .await;
        if !document.metadata.url.is_empty() {
            self.cache
                .insert(Self::cache_key(kind, &document.metadata.url), document.clone())
                .await;
        }
        Ok(urn)
    }

    async fn list(&self, kind: &str) -> Result<Vec<DocumentSummary>> {
        self.inner.list(kind).await
    }

    async fn delete(&self, kind: &str, urn: &Urn) -> Result<()> {
        if let Some(doc) = self.inner.get(kind, urn.as_str()).await? {
            self.cache
                .invalidate(&Self::cache_key(kind, &doc.metadata.url))
                .await;
        }
        self.cache
            .invalidate(&Self::cache_key(kind, urn.as_str()))
            .await;
        self.inner.delete(kind, urn).await
    }

    async fn count(&self, kind: &str) -> Result<usize> {
        self.inner.count(kind).await
    }
}
