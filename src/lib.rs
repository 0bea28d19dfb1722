//! dir-harvest: a resumable directory crawler
//!
//! This crate walks a hierarchical web directory (batches, paginated listing
//! pages, company detail pages) through a rotating pool of outbound proxies
//! and extracts one record per company. Completed batches are checkpointed so
//! an interrupted run picks up where it left off.

pub mod config;
pub mod crawler;
pub mod output;
pub mod proxy;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for dir-harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error for {url}: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} for {url}")]
    BadStatus { url: String, status: u16 },

    #[error("All {attempts} fetch attempts failed for {url}")]
    FetchExhausted { url: String, attempts: u32 },

    #[error("No proxy endpoint is currently available")]
    ProxyPoolEmpty,

    #[error("Proxy source error: {0}")]
    ProxySource(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Result type alias for dir-harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CompanyOutcome, CompanyRecord, Coordinator, RunSummary};
pub use proxy::ProxyPool;
