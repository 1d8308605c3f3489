//! Database schema definitions
//!
//! The crawl worker and the frontier queue each own a separate SQLite file;
//! this module holds both schemas.

/// SQL schema for the crawl worker's database
pub const CRAWLER_SCHEMA_SQL: &str = r#"
-- Conditional-cache metadata, one row per URL
CREATE TABLE IF NOT EXISTS pages (
    url TEXT PRIMARY KEY,
    etag TEXT,
    last_modified TEXT,
    last_seen INTEGER NOT NULL
);

-- Current fingerprint per (url, chunk_id) slot
CREATE TABLE IF NOT EXISTS chunks (
    docid TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    scope TEXT NOT NULL,
    chunk_id INTEGER NOT NULL,
    simhash INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_chunks_slot ON chunks(url, chunk_id);

-- Append-only chunk history
CREATE TABLE IF NOT EXISTS versions (
    url TEXT NOT NULL,
    chunk_id INTEGER NOT NULL,
    version_ts INTEGER NOT NULL,
    text TEXT NOT NULL,
    PRIMARY KEY (url, chunk_id, version_ts)
);

CREATE INDEX IF NOT EXISTS idx_versions_url_ts ON versions(url, version_ts);
"#;

/// SQL schema for the frontier queue's database
pub const FRONTIER_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS queue (
    id TEXT PRIMARY KEY,
    url TEXT NOT NULL,
    scope TEXT NOT NULL,
    priority INTEGER NOT NULL DEFAULT 0,
    enqueued_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_queue_scope_order ON queue(scope, priority DESC, enqueued_at ASC);
"#;

/// Initializes the crawl worker schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_crawler_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(CRAWLER_SCHEMA_SQL)?;
    Ok(())
}

/// Initializes the frontier queue schema
pub fn initialize_frontier_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(FRONTIER_SCHEMA_SQL)?;
    Ok(())
}
