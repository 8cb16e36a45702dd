//! Configuration module for Inkcap
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use inkcap::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Rate limit: {}s", config.scraper.rate_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ExtractConfig, OutputConfig, OutputFormat, PoolConfig, ScraperConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};

// Re-export validation entry point
pub use validation::validate;
