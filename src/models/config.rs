// src/models/config.rs

use serde::Deserialize;

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Crawler behavior settings
#[derive(Debug, Deserialize, Clone)]
pub struct CrawlerConfig {
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,

    /// Delay between processed requests, for origin politeness.
    #[serde(default = "defaults::request_delay_ms")]
    pub request_delay_ms: u64,

    /// Upper bound on requests handled in one run. 0 means unbounded.
    #[serde(default = "defaults::max_requests")]
    pub max_requests: usize,

    #[serde(default = "defaults::api_root")]
    pub api_root: String,

    /// Personal access token for authenticated API calls.
    #[serde(default)]
    pub auth_token: Option<String>,
}

/// Storage backend settings
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "defaults::storage_root")]
    pub root: String,

    /// TTL of the process-local read cache, in seconds.
    #[serde(default = "defaults::cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "defaults::cache_capacity")]
    pub cache_capacity: u64,
}

/// Logging configurations
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

mod defaults {
    pub fn user_agent() -> String {
        concat!("octolink/", env!("CARGO_PKG_VERSION")).to_string()
    }

    pub fn timeout_secs() -> u64 {
        30
    }

    pub fn request_delay_ms() -> u64 {
        0
    }

    pub fn max_requests() -> usize {
        1000
    }

    pub fn api_root() -> String {
        "https://api.github.com".to_string()
    }

    pub fn storage_root() -> String {
        "data/store".to_string()
    }

    pub fn cache_ttl_secs() -> u64 {
        60
    }

    pub fn cache_capacity() -> u64 {
        10_000
    }

    pub fn log_level() -> String {
        "info".to_string()
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout_secs(),
            request_delay_ms: defaults::request_delay_ms(),
            max_requests: defaults::max_requests(),
            api_root: defaults::api_root(),
            auth_token: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: defaults::storage_root(),
            cache_ttl_secs: defaults::cache_ttl_secs(),
            cache_capacity: defaults::cache_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.crawler.timeout_secs, 30);
        assert_eq!(config.crawler.api_root, "https://api.github.com");
        assert_eq!(config.storage.cache_ttl_secs, 60);
    }

    #[test]
    fn test_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            max_requests = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.crawler.max_requests, 50);
        assert_eq!(config.crawler.timeout_secs, 30);
    }
}
