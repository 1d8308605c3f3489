//! Sumi-Delta: an incremental, change-detecting crawl pipeline
//!
//! This crate implements a persistent frontier queue and a crawl worker that
//! re-fetches pages with conditional HTTP caching, segments their content into
//! heading-bounded chunks, and forwards only materially changed chunks to a
//! downstream text index while keeping an append-only version history.

pub mod config;
pub mod content;
pub mod crawler;
pub mod frontier;
pub mod index;
pub mod server;
pub mod storage;

use thiserror::Error;

/// Main error type for Sumi-Delta operations
#[derive(Debug, Error)]
pub enum DeltaError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unexpected status {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Index rejected document {docid} with status {status}: {body}")]
    IndexRejected {
        docid: String,
        status: u16,
        body: String,
    },

    #[error("Frontier protocol error: {0}")]
    Frontier(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeltaError {
    /// Wraps a reqwest error for `url`, separating timeouts from other failures
    pub fn from_request(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source,
            }
        }
    }

    /// Whether this error is a transient network failure (timeout, connect,
    /// broken transfer) that natural redelivery is expected to resolve
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http { source, .. } | Self::Reqwest(source) => {
                source.is_timeout() || source.is_connect() || source.is_request() || source.is_body()
            }
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {message}")]
    Env { var: String, message: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Sumi-Delta operations
pub type Result<T> = std::result::Result<T, DeltaError>;


// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOutcome, CrawlWorker, PollLoop};
pub use frontier::{FrontierClient, QueueItem};
pub use storage::{SqliteQueue, SqliteStorage};
