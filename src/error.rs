// src/error.rs

//! Unified error handling for the crawler core.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No handler registered for a request type
    #[error("Unknown request type '{0}'")]
    UnknownType(String),

    /// Payload is missing a field the handler requires
    #[error("Malformed payload for '{entity}': {message}")]
    MalformedPayload { entity: String, message: String },

    /// The document store could not serve a read or write
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Fetching a document from origin failed
    #[error("Fetch error for {url}: {message}")]
    Fetch { url: String, message: String },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a malformed-payload error with entity context.
    pub fn malformed(entity: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::MalformedPayload {
            entity: entity.into(),
            message: message.to_string(),
        }
    }

    /// Create a store-unavailable error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::StoreUnavailable(message.to_string())
    }

    /// Create a fetch error with URL context.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }
}
