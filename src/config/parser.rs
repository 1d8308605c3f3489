use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::str::FromStr;

/// Loads the configuration from defaults, an optional TOML file and the
/// process environment, in increasing order of precedence
///
/// # Arguments
///
/// * `path` - Optional path to a TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to read, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use sumi_delta::config::load_config;
///
/// let config = load_config(None).unwrap();
/// println!("Polling scope: {}", config.crawler.scope);
/// ```
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    load_config_from(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`], reading variables through `lookup` instead of the
/// process environment
pub fn load_config_from<F>(path: Option<&Path>, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => Config::default(),
    };

    apply_env(&mut config, &lookup)?;
    validate(&config)?;

    Ok(config)
}

/// Overrides configuration values with any environment variables that are set
///
/// Unset or empty variables leave the current value untouched.
pub fn apply_env<F>(config: &mut Config, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("FRONTIER_ADDR") {
        config.frontier.addr = v;
    }
    if let Some(v) = get("FRONTIER_RPC_BIND") {
        config.frontier.rpc_bind = v;
    }
    if let Some(v) = get("FRONTIER_REST_BIND") {
        config.frontier.rest_bind = v;
    }
    if let Some(v) = get("FRONTIER_DB_PATH") {
        config.frontier.database_path = v;
    }
    if let Some(v) = get("INDEX_BASE_URL") {
        config.index.base_url = v;
    }
    if let Some(v) = get("INDEX_TIMEOUT_SECS") {
        config.index.timeout_secs = parse_var("INDEX_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = get("CRAWLER_DB_PATH") {
        config.crawler.database_path = v;
    }
    if let Some(v) = get("USER_AGENT") {
        config.crawler.user_agent = v;
    }
    if let Some(v) = get("CRAWL_DELAY_MS") {
        config.crawler.crawl_delay_ms = parse_var("CRAWL_DELAY_MS", &v)?;
    }
    if let Some(v) = get("POLL_INTERVAL_MS") {
        config.crawler.poll_interval_ms = parse_var("POLL_INTERVAL_MS", &v)?;
    }
    if let Some(v) = get("CRAWL_SCOPE") {
        config.crawler.scope = v;
    }
    if let Some(v) = get("CRAWL_BATCH_SIZE") {
        config.crawler.batch_size = parse_var("CRAWL_BATCH_SIZE", &v)?;
    }
    if let Some(v) = get("MAX_CHUNK_LEN") {
        config.crawler.max_chunk_len = parse_var("MAX_CHUNK_LEN", &v)?;
    }
    if let Some(v) = get("FETCH_TIMEOUT_SECS") {
        config.crawler.fetch_timeout_secs = parse_var("FETCH_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = get("ARCHIVE_DIR") {
        config.crawler.archive_dir = v;
    }
    if let Some(v) = get("VERSIONS_BIND") {
        config.crawler.versions_bind = v;
    }

    Ok(())
}

fn parse_var<T>(var: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        var: var.to_string(),
        message: format!("'{}': {}", value, e),
    })
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so operators can tell which file a service was started with.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns it with the hash of the file it came from
///
/// The hash is `None` when no file was given.
pub fn load_config_with_hash(path: Option<&Path>) -> Result<(Config, Option<String>), ConfigError> {
    let config = load_config(path)?;
    let hash = path.map(compute_config_hash).transpose()?;
    Ok((config, hash))
}
