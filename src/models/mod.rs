//! Domain models for the crawler core.
//!
//! This module contains the value types the processor operates on: URNs,
//! traversal policies, documents with their `_metadata` envelopes, and the
//! request carrier.

mod config;
mod document;
mod policy;
mod request;
mod urn;

// Re-export all public types
pub use config::{Config, CrawlerConfig, LoggingConfig, StorageConfig};
pub use document::{Document, DocumentSummary, Link, LinkKind, Metadata};
pub use policy::{
    EdgeRole, FetchStrategy, Freshness, GateVerdict, Transitivity, TraversalPolicy,
};
pub use request::{
    Outbox, Priority, RelationDescriptor, Request, RequestContext, ResponseInfo,
};
pub use urn::Urn;
