// src/main.rs

//! octolink CLI
//!
//! Local entry point for seeding and running crawls against the
//! filesystem store, and for inspecting what has been stored.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use octolink::config::load_or_default;
use octolink::error::{AppError, Result};
use octolink::models::{Request, TraversalPolicy};
use octolink::processor::Processor;
use octolink::services::{Crawler, HttpFetcher, InMemoryQueue};
use octolink::storage::{CachedStore, DocumentStore, LocalStore};

#[derive(Parser, Debug)]
#[command(
    name = "octolink",
    version,
    about = "Content-addressed GitHub crawler core"
)]
struct Cli {
    #[arg(short, long, default_value = "data/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seed the queue with a URL and run the crawl loop
    Crawl {
        /// Seed URL (GitHub API form)
        #[arg(long)]
        seed: String,

        /// Entity type expected at the seed URL
        #[arg(long, default_value = "org")]
        kind: String,

        /// Traversal policy preset: standard, refresh, events
        #[arg(long, default_value = "standard")]
        policy: String,

        /// Override the configured request bound
        #[arg(long)]
        max_requests: Option<usize>,
    },
    /// Per-type document counts from the store
    Stats,
    /// Dump one stored document as JSON
    Show {
        #[arg(long)]
        kind: String,

        #[arg(long)]
        urn: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = load_or_default(Path::new(&cli.config));

    let store: Arc<dyn DocumentStore> = Arc::new(CachedStore::new(
        LocalStore::new(&config.storage.root),
        Duration::from_secs(config.storage.cache_ttl_secs),
        config.storage.cache_capacity,
    ));

    match cli.command {
        Command::Crawl {
            seed,
            kind,
            policy,
            max_requests,
        } => {
            if let Some(bound) = max_requests {
                config.crawler.max_requests = bound;
            }
            let policy = TraversalPolicy::named(&policy)
                .ok_or_else(|| AppError::config(format!("unknown policy preset '{policy}'")))?;

            let queue = Arc::new(InMemoryQueue::with_dedup());
            let fetcher = Arc::new(HttpFetcher::new(&config.crawler, store.clone())?);
            let crawler = Crawler::new(&config, queue, store, fetcher);

            crawler.seed(Request::new(kind, seed).with_policy(policy));
            let stats = crawler.run().await?;

            tracing::info!(
                processed = stats.processed,
                upserted = stats.upserted,
                missing = stats.missing,
                failures = stats.failures,
                remaining = stats.remaining,
                "crawl finished"
            );
        }
        Command::Stats => {
            let processor = Processor::new(store.clone());
            let mut kinds: Vec<&str> = processor.queued_types().collect();
            kinds.sort_unstable();
            for kind in kinds {
                let count = store.count(kind).await?;
                if count > 0 {
                    println!("{kind}: {count}");
                }
            }
        }
        Command::Show { kind, urn } => match store.get(&kind, &urn).await? {
            Some(document) => println!("{}", serde_json::to_string_pretty(&document)?),
            None => {
                eprintln!("no document for {kind} {urn}");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
