use crate::config::types::{Config, OutputConfig, PoolConfig, ScraperConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_pool_config(&config.pool)?;
    validate_output_config(&config.output)?;
    validate_urls(&config.urls)?;
    validate_user_agents(&config.user_agents)?;
    Ok(())
}

/// Validates politeness and request settings
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if !config.rate_limit.is_finite() || config.rate_limit < 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate-limit must be a non-negative number of seconds, got {}",
            config.rate_limit
        )));
    }

    if config.max_retries > 20 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be <= 20, got {}",
            config.max_retries
        )));
    }

    if config.timeout < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout must be >= 1 second, got {}",
            config.timeout
        )));
    }

    Ok(())
}

/// Validates worker pool settings
fn validate_pool_config(config: &PoolConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max-workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if !config.batch_delay.is_finite() || config.batch_delay < 0.0 {
        return Err(ConfigError::Validation(format!(
            "batch-delay must be a non-negative number of seconds, got {}",
            config.batch_delay
        )));
    }

    Ok(())
}

/// Validates output settings
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.dir.is_empty() {
        return Err(ConfigError::Validation(
            "output dir cannot be empty".to_string(),
        ));
    }

    if config.file.is_empty() {
        return Err(ConfigError::Validation(
            "output file cannot be empty".to_string(),
        ));
    }

    validate_table_name(&config.table_name)?;

    Ok(())
}

/// Validates the SQLite table name as a plain identifier
///
/// The name is interpolated into DDL statements, so it must never carry
/// quoting or punctuation.
fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "table-name cannot be empty".to_string(),
        ));
    }

    let mut chars = name.chars();
    let first = chars.next().unwrap_or('_');
    if !(first.is_ascii_alphabetic() || first == '_') {
        return Err(ConfigError::Validation(format!(
            "table-name must start with a letter or underscore, got '{}'",
            name
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "table-name must contain only ASCII letters, digits and underscores, got '{}'",
            name
        )));
    }

    Ok(())
}

/// Validates configured seed URLs
fn validate_urls(urls: &[String]) -> Result<(), ConfigError> {
    for url_str in urls {
        let url = Url::parse(url_str)
            .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", url_str, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "'{}': only http and https URLs are supported",
                url_str
            )));
        }
    }

    Ok(())
}

/// Validates extra User-Agent strings
fn validate_user_agents(agents: &[String]) -> Result<(), ConfigError> {
    for agent in agents {
        if agent.trim().is_empty() {
            return Err(ConfigError::Validation(
                "user-agents entries cannot be empty".to_string(),
            ));
        }
    }
    Ok(())
}
