//! Configuration module for Sumi-Delta
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables. A missing variable never fails startup; a
//! malformed one does.
//!
//! # Example
//!
//! ```no_run
//! use sumi_delta::config::load_config;
//!
//! let config = load_config(None).unwrap();
//! println!("Crawl delay: {}ms", config.crawler.crawl_delay_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, FrontierConfig, IndexConfig};

// Re-export parser functions
pub use parser::{
    apply_env, compute_config_hash, load_config, load_config_from, load_config_with_hash,
};
