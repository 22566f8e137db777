//! Crawl services: queues, fetching, event dedup, the run loop.

pub mod crawler;
pub mod fetcher;
pub mod finder;
pub mod queue;

pub use crawler::{Crawler, RunStats};
pub use fetcher::{FetchOutcome, Fetcher, HttpFetcher};
pub use finder::find_new;
pub use queue::InMemoryQueue;
