//! octolink Crawler Core
//!
//! A content-addressed crawler over the GitHub REST API: each fetched JSON
//! document is rewritten into a canonical document whose `_metadata.links`
//! place it in a stable URN graph, and the URLs it references are enqueued
//! as further work under a traversal policy.
//!
//! # Architecture
//!
//! - `models`: Value types (URN, TraversalPolicy, Request, Document, Config)
//! - `processor`: Dispatch and the per-entity/collection/event handlers
//! - `services`: Queues, fetching, event dedup, the crawl loop
//! - `storage`: Persistence backends (memory, local filesystem, TTL cache)
//! - `utils`: Shared utilities (URL templates, pagination headers)
//! - `error`: Unified error handling

pub mod config;
pub mod error;
pub mod models;
pub mod processor;
pub mod services;
pub mod storage;
pub mod utils;

// Re-export commonly used items
pub use error::{AppError, Result};
pub use models::{Document, Request, TraversalPolicy, Urn};
pub use processor::Processor;
