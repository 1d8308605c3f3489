//! Storage module for persisting crawl data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Conditional-cache metadata per page
//! - Per-chunk fingerprints and append-only version history
//! - The frontier work queue (in its own database)

mod queue;
mod schema;
mod sqlite;
mod traits;

pub use queue::SqliteQueue;
pub use sqlite::SqliteStorage;
pub use traits::{QueueStorage, Storage, StorageError, StorageResult};

use serde::Serialize;

/// Conditional-cache metadata for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRecord {
    pub url: String,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub last_seen: i64,
}

/// The live structural fingerprint of one chunk slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFingerprint {
    pub docid: String,
    pub url: String,
    pub scope: String,
    pub chunk_id: u32,
    pub simhash: u64,
    pub updated_at: i64,
}

/// One recorded version of a chunk's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
    #[serde(skip)]
    pub url: String,
    pub chunk_id: u32,
    pub version_ts: i64,
    pub text: String,
}

/// Simhashes are stored in SQLite's signed INTEGER column bit-for-bit
pub(crate) fn simhash_to_sql(value: u64) -> i64 {
    value as i64
}

pub(crate) fn simhash_from_sql(value: i64) -> u64 {
    value as u64
}
