// src/storage/memory.rs

//! In-memory document store for tests and dry runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Document, DocumentSummary, Urn};
use crate::storage::{upsert_key, DocumentStore};

#[derive(Default)]
struct TypeBucket {
    by_urn: HashMap<String, Document>,
    url_index: HashMap<String, String>,
}

/// HashMap-backed store. Concurrent reads and last-writer-wins upserts.
#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, TypeBucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn resolve(bucket: &TypeBucket, key: &str) -> Option<Document> {
        if let Some(doc) = bucket.by_urn.get(key) {
            return Some(doc.clone());
        }
        bucket
            .url_index
            .get(key)
            .and_then(|urn| bucket.by_urn.get(urn))
            .cloned()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, kind: &str, key: &str) -> Result<Option<Document>> {
        let buckets = self.buckets.lock().expect("store lock poisoned");
        Ok(buckets.get(kind).and_then(|b| Self::resolve(b, key)))
    }

    async fn etag(&self, kind: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(kind, key)
            .await?
            .and_then(|doc| doc.metadata.etag))
    }

    async fn upsert(&self, document: &Document) -> Result<Urn> {
        let urn = upsert_key(document)?;
        let mut buckets = self.buckets.lock().expect("store lock poisoned");
        let bucket = buckets
            .entry(document.metadata.kind.clone())
            .or_default();
        if !document.metadata.url.is_empty() {
            bucket
                .url_index
                .insert(document.metadata.url.clone(), urn.to_string());
        }
        bucket.by_urn.insert(urn.to_string(), document.clone());
        Ok(urn)
    }

    async fn list(&self, kind: &str) -> Result<Vec<DocumentSummary>> {
        let buckets = self.buckets.lock().expect("store lock poisoned");
        let mut summaries: Vec<DocumentSummary> = buckets
            .get(kind)
            .map(|bucket| {
                bucket
                    .by_urn
                    .iter()
                    .map(|(urn, doc)| DocumentSummary {
                        urn: Urn::from(urn.as_str()),
                        url: doc.metadata.url.clone(),
                        version: doc.metadata.version,
                        etag: doc.metadata.etag.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        summaries.sort_by(|a, b| a.urn.cmp(&b.urn));
        Ok(summaries)
    }

    async fn delete(&self, kind: &str, urn: &Urn) -> Result<()> {
        let mut buckets = self.buckets.lock().expect("store lock poisoned");
        if let Some(bucket) = buckets.get_mut(kind) {
            if let Some(doc) = bucket.by_urn.remove(urn.as_str()) {
                bucket.url_index.remove(&doc.metadata.url);
            }
        }
        Ok(())
    }

    async fn count(&self, kind: &str) -> Result<usize> {
        let buckets = self.buckets.lock().expect("store lock poisoned");
        Ok(buckets.get(kind).map(|b| b.by_urn.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_document(id: u64, url: &str) -> Document {
        let mut doc = Document::from_value("repo", url, json!({ "id": id }));
        doc.add_self_and_siblings(
            Urn::entity("repo", id),
            Urn::collection(&Urn::entity("user", 1), "repos"),
        );
        doc
    }

    #[tokio::test]
    async fn test_upsert_and_get_by_urn_and_url() {
        let store = MemoryStore::new();
        let doc = sample_document(12, "http://foo/repo/12");
        store.upsert(&doc).await.unwrap();

        let by_urn = store.get("repo", "urn:repo:12").await.unwrap().unwrap();
        let by_url = store.get("repo", "http://foo/repo/12").await.unwrap().unwrap();
        assert_eq!(by_urn, by_url);
        assert_eq!(by_urn.u64_at("/id"), Some(12));
    }

    #[tokio::test]
    async fn test_upsert_requires_self_link() {
        let store = MemoryStore::new();
        let doc = Document::from_value("repo", "http://x", json!({ "id": 1 }));
        assert!(store.upsert(&doc).await.is_err());
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = MemoryStore::new();
        let mut first = sample_document(12, "http://foo/repo/12");
        first.metadata.version = Some(1);
        let mut second = sample_document(12, "http://foo/repo/12");
        second.metadata.version = Some(2);

        store.upsert(&first).await.unwrap();
        store.upsert(&second).await.unwrap();

        let stored = store.get("repo", "urn:repo:12").await.unwrap().unwrap();
        assert_eq!(stored.metadata.version, Some(2));
        assert_eq!(store.count("repo").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_and_delete() {
        let store = MemoryStore::new();
        store.upsert(&sample_document(1, "http://r/1")).await.unwrap();
        store.upsert(&sample_document(2, "http://r/2")).await.unwrap();

        let listed = store.list("repo").await.unwrap();
        assert_eq!(listed.len(), 2);

        store.delete("repo", &Urn::entity("repo", 1)).await.unwrap();
        assert_eq!(store.count("repo").await.unwrap(), 1);
        assert!(store.get("repo", "http://r/1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_etag() {
        let store = MemoryStore::new();
        let mut doc = sample_document(12, "http://foo/repo/12");
        doc.metadata.etag = Some("\"abc\"".to_string());
        store.upsert(&doc).await.unwrap();
        assert_eq!(
            store.etag("repo", "urn:repo:12").await.unwrap().as_deref(),
            Some("\"abc\"")
        );
        assert!(store.etag("repo", "urn:repo:99").await.unwrap().is_none());
    }
}
