use crate::config::types::{Config, CrawlerConfig, FrontierConfig, IndexConfig};
use crate::ConfigError;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_frontier_config(&config.frontier)?;
    validate_crawler_config(&config.crawler)?;
    validate_index_config(&config.index)?;
    Ok(())
}

/// Validates frontier configuration
fn validate_frontier_config(config: &FrontierConfig) -> Result<(), ConfigError> {
    validate_http_url("frontier addr", &config.addr)?;
    validate_bind("frontier rpc-bind", &config.rpc_bind)?;
    validate_bind("frontier rest-bind", &config.rest_bind)?;

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "frontier database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawl worker configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.scope.is_empty() {
        return Err(ConfigError::Validation("scope cannot be empty".to_string()));
    }

    if config.batch_size < 1 || config.batch_size > 1000 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be between 1 and 1000, got {}",
            config.batch_size
        )));
    }

    if config.max_chunk_len < 1 {
        return Err(ConfigError::Validation(
            "max_chunk_len must be >= 1".to_string(),
        ));
    }

    if config.fetch_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "fetch_timeout_secs must be >= 1".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "crawler database_path cannot be empty".to_string(),
        ));
    }

    validate_bind("versions-bind", &config.versions_bind)?;

    Ok(())
}

/// Validates downstream index configuration
fn validate_index_config(config: &IndexConfig) -> Result<(), ConfigError> {
    validate_http_url("index base_url", &config.base_url)?;

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "index timeout_secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_http_url(what: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", what, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must use http or https, got '{}'",
            what, value
        )));
    }

    Ok(())
}

fn validate_bind(what: &str, value: &str) -> Result<(), ConfigError> {
    value.parse::<SocketAddr>().map_err(|e| {
        ConfigError::Validation(format!("{} '{}' is not a socket address: {}", what, value, e))
    })?;
    Ok(())
}
