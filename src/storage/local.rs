// src/storage/local.rs

//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! └── {kind}/
//!     ├── {sha256(urn)}.json    # document bodies, keyed by self URN
//!     └── urls/
//!         └── {sha256(url)}.key # URL -> URN sidecar index
//! ```
//!
//! Writes are atomic (temp file + rename). Reads of missing keys return
//! `None` rather than an error.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{Document, DocumentSummary, Urn};
use crate::storage::{paths, upsert_key, DocumentStore};

/// Filesystem store backend.
#[derive(Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Logical key to absolute path under the store root.
    fn locate(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Persist bytes under a logical key. The bytes land in a scratch file
    /// beside the target and are renamed over it, so a concurrent reader
    /// sees either the old document or the new one, never a torn write.
    async fn put_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let target = self.locate(key);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let stem = target
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("entry");
        let scratch = target.with_file_name(format!(".{stem}.{}", Uuid::new_v4().simple()));
        tokio::fs::write(&scratch, bytes).await?;
        tokio::fs::rename(&scratch, &target).await?;
        Ok(())
    }

    async fn put_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.put_bytes(key, &serde_json::to_vec_pretty(value)?)
            .await
    }

    /// Bytes stored under a key; an absent key is `None`, not an error.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.locate(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_bytes(key)
            .await?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(AppError::from)
    }

    /// Resolve a key (URN or URL) to the document file key.
    async fn resolve_key(&self, kind: &str, key: &str) -> Result<Option<String>> {
        if key.starts_with("urn:") {
            return Ok(Some(paths::document_key(kind, key)));
        }
        match self.get_bytes(&paths::url_index_key(kind, key)).await? {
            Some(bytes) => {
                let urn = String::from_utf8_lossy(&bytes).trim().to_string();
                Ok(Some(paths::document_key(kind, &urn)))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DocumentStore for LocalStore {
    async fn get(&self, kind: &str, key: &str) -> Result<Option<Document>> {
        match self.resolve_key(kind, key).await? {
            Some(file_key) => self.get_json(&file_key).await,
            None => Ok(None),
        }
    }

    async fn etag(&self, kind: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .get(kind, key)
            .await?
            .and_then(|doc| doc.metadata.etag))
    }

    async fn upsert(&self, document: &Document) -> Result<Urn> {
        let urn = upsert_key(document)?;
        let kind = &document.metadata.kind;

        self.put_json(&paths::document_key(kind, urn.as_str()), document)
            .await?;
        if !document.metadata.url.is_empty() {
            self.put_bytes(
                &paths::url_index_key(kind, &document.metadata.url),
                urn.as_str().as_bytes(),
            )
            .await?;
        }
        Ok(urn)
    }

    async fn list(&self, kind: &str) -> Result<Vec<DocumentSummary>> {
        let dir = self.locate(&paths::kind_prefix(kind));
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            let doc: Document = serde_json::from_slice(&bytes)?;
            if let Some(urn) = doc.self_urn() {
                summaries.push(DocumentSummary {
                    urn: urn.clone(),
                    url: doc.metadata.url.clone(),
                    version: doc.metadata.version,
                    etag: doc.metadata.etag.clone(),
                });
            }
        }
        summaries.sort_by(|a, b| a.urn.cmp(&b.urn));
        Ok(summaries)
    }

    async fn delete(&self, kind: &str, urn: &Urn) -> Result<()> {
        let file_key = paths::document_key(kind, urn.as_str());
        // Remove the URL index entry first; it needs the stored URL.
        if let Some(doc) = self.get_json::<Document>(&file_key).await? {
            if !doc.metadata.url.is_empty() {
                let index_path = self.locate(&paths::url_index_key(kind, &doc.metadata.url));
                match tokio::fs::remove_file(&index_path).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(AppError::Io(e)),
                }
            }
        }
        match tokio::fs::remove_file(self.locate(&file_key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn count(&self, kind: &str) -> Result<usize> {
        Ok(self.list(kind).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_document(id: u64, url: &str) -> Document {
        let mut doc = Document::from_value("repo", url, json!({ "id": id }));
        doc.add_self_and_siblings(
            Urn::entity("repo", id),
            Urn::collection(&Urn::entity("user", 1), "repos"),
        );
        doc
    }

    #[tokio::test]
    async fn test_put_bytes_creates_nested_dirs_and_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store
            .put_bytes("repo/urls/deadbeef.key", b"urn:repo:1")
            .await
            .unwrap();
        store
            .put_bytes("repo/urls/deadbeef.key", b"urn:repo:2")
            .await
            .unwrap();

        // Rename-over-existing leaves only the latest content.
        let stored = store.get_bytes("repo/urls/deadbeef.key").await.unwrap();
        assert_eq!(stored, Some(b"urn:repo:2".to_vec()));

        // No scratch files survive a completed write.
        let mut dir = tokio::fs::read_dir(tmp.path().join("repo/urls")).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["deadbeef.key".to_string()]);
    }

    #[tokio::test]
    async fn test_get_bytes_absent_key_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());
        assert!(store.get_bytes("repo/missing.json").await.unwrap().is_none());
        assert!(store
            .get_json::<Document>("repo/missing.json")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_upsert_then_get_both_forms() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        let doc = sample_document(12, "http://foo/repo/12");
        let urn = store.upsert(&doc).await.unwrap();
        assert_eq!(urn, Urn::entity("repo", 12));

        let by_urn = store.get("repo", "urn:repo:12").await.unwrap().unwrap();
        let by_url = store.get("repo", "http://foo/repo/12").await.unwrap().unwrap();
        assert_eq!(by_urn, by_url);
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        store.upsert(&sample_document(1, "http://r/1")).await.unwrap();
        store.upsert(&sample_document(2, "http://r/2")).await.unwrap();

        let listed = store.list("repo").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].urn, Urn::entity("repo", 1));
        assert_eq!(store.count("repo").await.unwrap(), 2);
        assert_eq!(store.count("user").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_both_keys() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        let doc = sample_document(12, "http://foo/repo/12");
        store.upsert(&doc).await.unwrap();
        store.delete("repo", &Urn::entity("repo", 12)).await.unwrap();

        assert!(store.get("repo", "urn:repo:12").await.unwrap().is_none());
        assert!(store
            .get("repo", "http://foo/repo/12")
            .await
            .unwrap()
            .is_none());
    }
}
