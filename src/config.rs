// src/config.rs

//! Configuration loading utilities.

use std::path::Path;

use tracing::warn;

use crate::error::Result;
use crate::models::Config;

/// Load configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

/// Load configuration, falling back to defaults if loading fails.
pub fn load_or_default(path: &Path) -> Config {
    match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config; using defaults");
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[crawler]\nmax_requests = 7\n\n[storage]\nroot = \"/tmp/store\""
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.crawler.max_requests, 7);
        assert_eq!(config.storage.root, "/tmp/store");
    }

    #[test]
    fn test_load_or_default_on_missing_file() {
        let config = load_or_default(Path::new("/definitely/not/here.toml"));
        assert_eq!(config.crawler.timeout_secs, 30);
    }
}
