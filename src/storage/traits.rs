//! Storage traits and error types
//!
//! This module defines the trait interfaces for the crawl worker's store and
//! the frontier queue's store, along with their shared error type.

use crate::frontier::{NewQueueItem, QueueItem};
use crate::storage::{ChunkFingerprint, PageRecord, VersionRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage interface for the crawl worker
///
/// Implementations must be safe to share between the poll loop and the
/// read-only reporting endpoint; every method is one statement or one
/// transaction.
pub trait Storage {
    // ===== Page Records =====

    /// Gets the conditional-cache record for a URL
    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Inserts or replaces the record for `page.url`
    fn upsert_page(&self, page: &PageRecord) -> StorageResult<()>;

    /// Refreshes only `last_seen` for a URL
    ///
    /// Returns true if a record existed.
    fn touch_page(&self, url: &str, last_seen: i64) -> StorageResult<bool>;

    // ===== Fingerprints =====

    /// Gets the live fingerprint for a (url, chunk_id) slot
    fn get_fingerprint(&self, url: &str, chunk_id: u32) -> StorageResult<Option<ChunkFingerprint>>;

    /// Inserts a fingerprint, replacing whatever occupied its slot
    fn upsert_fingerprint(&self, fingerprint: &ChunkFingerprint) -> StorageResult<()>;

    /// Persists a chunk judged changed: replaces the slot's fingerprint and
    /// appends the version row, atomically
    ///
    /// # Arguments
    ///
    /// * `fingerprint` - The new fingerprint (its `updated_at` becomes the version timestamp)
    /// * `text` - The chunk text to record
    ///
    /// Fails without touching either table if the slot already has a version
    /// at that timestamp.
    fn record_changed_chunk(&self, fingerprint: &ChunkFingerprint, text: &str)
        -> StorageResult<()>;

    // ===== Versions =====

    /// Newest version timestamp recorded for one chunk slot
    fn latest_version_ts(&self, url: &str, chunk_id: u32) -> StorageResult<Option<i64>>;

    /// Lists versions of a URL, newest first
    ///
    /// # Arguments
    ///
    /// * `url` - The page URL
    /// * `chunk_id` - Restrict to one chunk, or `None` for all chunks
    /// * `limit` - Maximum number of rows
    fn list_versions(
        &self,
        url: &str,
        chunk_id: Option<u32>,
        limit: u32,
    ) -> StorageResult<Vec<VersionRecord>>;

    // ===== Statistics =====

    /// Counts page records
    fn count_pages(&self) -> StorageResult<u64>;

    /// Counts live fingerprints
    fn count_fingerprints(&self) -> StorageResult<u64>;

    /// Counts version rows
    fn count_versions(&self) -> StorageResult<u64>;
}

/// Storage interface for the frontier queue
pub trait QueueStorage {
    /// Inserts items with insert-or-ignore semantics keyed by id
    ///
    /// Items without an id get one from a monotonic clock. Returns the number
    /// of rows actually inserted; the whole batch is one transaction.
    fn put(&self, items: &[NewQueueItem]) -> StorageResult<usize>;

    /// Peeks at up to `limit` items of `scope`, highest priority first and
    /// FIFO within a priority. Nothing is removed or leased.
    fn get_next(&self, scope: &str, limit: u32) -> StorageResult<Vec<QueueItem>>;

    /// Deletes the given ids; returns how many rows existed and were removed
    fn ack(&self, ids: &[String]) -> StorageResult<usize>;

    /// Counts all queued items
    fn count(&self) -> StorageResult<u64>;

    /// Counts queued items in one scope
    fn count_scope(&self, scope: &str) -> StorageResult<u64>;
}
