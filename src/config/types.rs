use serde::Deserialize;

/// Main configuration structure for Sumi-Delta
///
/// Every field has a default, so an empty TOML document (or no file at all)
/// yields a runnable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub frontier: FrontierConfig,
    pub crawler: CrawlerConfig,
    pub index: IndexConfig,
}

/// Frontier queue service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FrontierConfig {
    /// Base URL the crawl worker uses to reach the frontier RPC listener
    pub addr: String,

    /// Listen address for the Put/GetNext/Ack endpoints
    pub rpc_bind: String,

    /// Listen address for the `/stats` and `/seed` endpoints
    pub rest_bind: String,

    /// Path to the queue's SQLite database file
    pub database_path: String,
}

impl Default for FrontierConfig {
    fn default() -> Self {
        Self {
            addr: "http://localhost:7071".to_string(),
            rpc_bind: "0.0.0.0:7071".to_string(),
            rest_bind: "0.0.0.0:7072".to_string(),
            database_path: "/data/frontier.db".to_string(),
        }
    }
}

/// Crawl worker configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Path to the crawler's SQLite database file
    pub database_path: String,

    /// User-Agent header sent with every fetch
    pub user_agent: String,

    /// Delay between consecutive fetches (milliseconds)
    pub crawl_delay_ms: u64,

    /// Sleep after an empty batch (milliseconds)
    pub poll_interval_ms: u64,

    /// Scope the poll loop pulls work for
    pub scope: String,

    /// Maximum number of items pulled per GetNext call
    pub batch_size: u32,

    /// Maximum chunk length in characters
    pub max_chunk_len: usize,

    /// Per-request fetch timeout (seconds)
    pub fetch_timeout_secs: u64,

    /// Directory for best-effort archival records
    pub archive_dir: String,

    /// Listen address for the `/versions` endpoint
    pub versions_bind: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            database_path: "/data/crawler.db".to_string(),
            user_agent: "SumiDelta/0.2".to_string(),
            crawl_delay_ms: 500,
            poll_interval_ms: 500,
            scope: "default".to_string(),
            batch_size: 8,
            max_chunk_len: 1600,
            fetch_timeout_secs: 30,
            archive_dir: "/warc".to_string(),
            versions_bind: "0.0.0.0:8081".to_string(),
        }
    }
}

/// Downstream text index configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IndexConfig {
    /// Base URL of the index (documents are posted to `<base>/documents/file`)
    pub base_url: String,

    /// Timeout for a single document submission (seconds)
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:9621".to_string(),
            timeout_secs: 120,
        }
    }
}
