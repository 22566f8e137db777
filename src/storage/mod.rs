// src/storage/mod.rs

//! Storage abstractions for document persistence.
//!
//! Documents are keyed canonically by their self URN
//! (`_metadata.links.self.href`); the source URL is kept as a secondary
//! index so reads accept either form.

pub mod cache;
pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Document, DocumentSummary, Urn};

pub use cache::CachedStore;
pub use local::LocalStore;
pub use memory::MemoryStore;

/// Trait for document store backends.
///
/// `key` arguments accept a URN (`urn:...`) or a source URL; both resolve
/// to the same document. Upserts are last-writer-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document, or None if absent.
    async fn get(&self, kind: &str, key: &str) -> Result<Option<Document>>;

    /// Stored etag for a document, or None if absent.
    async fn etag(&self, kind: &str, key: &str) -> Result<Option<String>>;

    /// Insert or replace a document, keyed by its self URN.
    async fn upsert(&self, document: &Document) -> Result<Urn>;

    /// Enumerate stored documents of a type without loading bodies.
    async fn list(&self, kind: &str) -> Result<Vec<DocumentSummary>>;

    async fn delete(&self, kind: &str, urn: &Urn) -> Result<()>;

    async fn count(&self, kind: &str) -> Result<usize>;
}

/// Extract the canonical upsert key from a document.
pub(crate) fn upsert_key(document: &Document) -> Result<Urn> {
    document
        .self_urn()
        .cloned()
        .ok_or_else(|| crate::error::AppError::store("document has no self link"))
}

/// Path utilities (logical key-space shared by all backends).
pub mod paths {
    use sha2::{Digest, Sha256};

    /// Filesystem-safe digest of an arbitrary key string.
    pub fn digest(key: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn document_key(kind: &str, urn: &str) -> String {
        format!("{}/{}.json", kind, digest(urn))
    }

    pub fn url_index_key(kind: &str, url: &str) -> String {
        format!("{}/urls/{}.key", kind, digest(url))
    }

    pub fn kind_prefix(kind: &str) -> String {
        kind.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable_and_safe() {
        let a = paths::digest("urn:repo:12");
        let b = paths::digest("urn:repo:12");
        assert_eq!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_layout() {
        let key = paths::document_key("repo", "urn:repo:12");
        assert!(key.starts_with("repo/"));
        assert!(key.ends_with(".json"));
        assert!(paths::url_index_key("repo", "http://x").contains("/urls/"));
    }
}
