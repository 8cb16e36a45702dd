//! Inkcap: a polite batch web scraper
//!
//! This crate fetches a bounded list of URLs, extracts structured content
//! from each page, cleans the results, and persists them as JSON, CSV, or
//! SQLite, while staying polite to the scraped servers: robots.txt
//! compliance, per-origin rate limiting, and exponential backoff on retry.

pub mod config;
pub mod extract;
pub mod limiter;
pub mod output;
pub mod robots;
pub mod schedule;
pub mod scrape;
pub mod url;

use thiserror::Error;

/// Main error type for Inkcap operations
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL disallowed by robots.txt: {url}")]
    RobotsDenied { url: String },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Connection error for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("Dynamic rendering failed for {url}: {message}")]
    Render { url: String, message: String },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Extraction error: {0}")]
    Extract(#[from] extract::ExtractError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Scheduler error: {0}")]
    Schedule(String),

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

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Inkcap operations
pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::PageRecord;
pub use limiter::RateLimiter;
pub use robots::RobotsPolicy;
pub use scrape::{FetchResult, FetchStatus, Fetcher, WorkerPool};
pub use url::Origin;
