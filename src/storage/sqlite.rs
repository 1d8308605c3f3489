//! SQLite storage implementation for the crawl worker
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_crawler_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{simhash_from_sql, simhash_to_sql, ChunkFingerprint, PageRecord, VersionRecord};
use crate::DeltaError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite storage backend for pages, fingerprints and versions
///
/// Cloning is cheap and every clone shares the same connection; callers
/// serialize only for the duration of one statement or transaction.
#[derive(Debug, Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(DeltaError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, DeltaError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_crawler_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, DeltaError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_crawler_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn map_fingerprint(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChunkFingerprint> {
    Ok(ChunkFingerprint {
        docid: row.get(0)?,
        url: row.get(1)?,
        scope: row.get(2)?,
        chunk_id: row.get(3)?,
        simhash: simhash_from_sql(row.get(4)?),
        updated_at: row.get(5)?,
    })
}

fn map_version(row: &rusqlite::Row<'_>) -> rusqlite::Result<VersionRecord> {
    Ok(VersionRecord {
        url: row.get(0)?,
        chunk_id: row.get(1)?,
        version_ts: row.get(2)?,
        text: row.get(3)?,
    })
}

const UPSERT_FINGERPRINT_SQL: &str =
    "INSERT OR REPLACE INTO chunks (docid, url, scope, chunk_id, simhash, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

impl Storage for SqliteStorage {
    // ===== Page Records =====

    fn get_page(&self, url: &str) -> StorageResult<Option<PageRecord>> {
        let conn = self.conn()?;
        let page = conn
            .query_row(
                "SELECT url, etag, last_modified, last_seen FROM pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok(PageRecord {
                        url: row.get(0)?,
                        etag: row.get(1)?,
                        last_modified: row.get(2)?,
                        last_seen: row.get(3)?,
                    })
                },
            )
            .optional()?;

        Ok(page)
    }

    fn upsert_page(&self, page: &PageRecord) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO pages (url, etag, last_modified, last_seen)
             VALUES (?1, ?2, ?3, ?4)",
            params![page.url, page.etag, page.last_modified, page.last_seen],
        )?;
        Ok(())
    }

    fn touch_page(&self, url: &str, last_seen: i64) -> StorageResult<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE pages SET last_seen = ?1 WHERE url = ?2",
            params![last_seen, url],
        )?;
        Ok(updated > 0)
    }

    // ===== Fingerprints =====

    fn get_fingerprint(&self, url: &str, chunk_id: u32) -> StorageResult<Option<ChunkFingerprint>> {
        let conn = self.conn()?;
        let fingerprint = conn
            .query_row(
                "SELECT docid, url, scope, chunk_id, simhash, updated_at
                 FROM chunks WHERE url = ?1 AND chunk_id = ?2",
                params![url, chunk_id],
                map_fingerprint,
            )
            .optional()?;

        Ok(fingerprint)
    }

    fn upsert_fingerprint(&self, fingerprint: &ChunkFingerprint) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            UPSERT_FINGERPRINT_SQL,
            params![
                fingerprint.docid,
                fingerprint.url,
                fingerprint.scope,
                fingerprint.chunk_id,
                simhash_to_sql(fingerprint.simhash),
                fingerprint.updated_at,
            ],
        )?;
        Ok(())
    }

    fn record_changed_chunk(
        &self,
        fingerprint: &ChunkFingerprint,
        text: &str,
    ) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        // REPLACE also evicts the previous docid through the (url, chunk_id) unique index
        tx.execute(
            UPSERT_FINGERPRINT_SQL,
            params![
                fingerprint.docid,
                fingerprint.url,
                fingerprint.scope,
                fingerprint.chunk_id,
                simhash_to_sql(fingerprint.simhash),
                fingerprint.updated_at,
            ],
        )?;
        tx.execute(
            "INSERT INTO versions (url, chunk_id, version_ts, text)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                fingerprint.url,
                fingerprint.chunk_id,
                fingerprint.updated_at,
                text
            ],
        )?;

        tx.commit()?;
        Ok(())
    }

    // ===== Versions =====

    fn latest_version_ts(&self, url: &str, chunk_id: u32) -> StorageResult<Option<i64>> {
        let conn = self.conn()?;
        let latest: Option<i64> = conn.query_row(
            "SELECT MAX(version_ts) FROM versions WHERE url = ?1 AND chunk_id = ?2",
            params![url, chunk_id],
            |row| row.get(0),
        )?;
        Ok(latest)
    }

    fn list_versions(
        &self,
        url: &str,
        chunk_id: Option<u32>,
        limit: u32,
    ) -> StorageResult<Vec<VersionRecord>> {
        let conn = self.conn()?;

        let versions = match chunk_id {
            Some(chunk_id) => {
                let mut stmt = conn.prepare(
                    "SELECT url, chunk_id, version_ts, text FROM versions
                     WHERE url = ?1 AND chunk_id = ?2
                     ORDER BY version_ts DESC LIMIT ?3",
                )?;
                let rows = stmt
                    .query_map(params![url, chunk_id, limit], map_version)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT url, chunk_id, version_ts, text FROM versions
                     WHERE url = ?1
                     ORDER BY version_ts DESC, chunk_id ASC LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![url, limit], map_version)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        Ok(versions)
    }

    // ===== Statistics =====

    fn count_pages(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_fingerprints(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_versions(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM versions", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
