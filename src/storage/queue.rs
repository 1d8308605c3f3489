//! SQLite storage implementation for the frontier queue

use crate::frontier::{NewQueueItem, QueueItem};
use crate::storage::schema::initialize_frontier_schema;
use crate::storage::traits::{QueueStorage, StorageError, StorageResult};
use crate::DeltaError;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Persistent, priority-ordered work queue
///
/// Delivery is at-least-once: `get_next` only peeks, and rows disappear only
/// when acknowledged. Two consumers pulling the same scope can be handed the
/// same items.
#[derive(Debug, Clone)]
pub struct SqliteQueue {
    conn: Arc<Mutex<Connection>>,
    last_id: Arc<AtomicI64>,
}

impl SqliteQueue {
    /// Opens (or creates) the queue database at `path`
    pub fn new(path: &Path) -> Result<Self, DeltaError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
        ",
        )?;
        initialize_frontier_schema(&conn)?;

        Ok(Self::from_connection(conn))
    }

    /// Creates an in-memory queue (for testing)
    pub fn new_in_memory() -> Result<Self, DeltaError> {
        let conn = Connection::open_in_memory()?;
        initialize_frontier_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            last_id: Arc::new(AtomicI64::new(0)),
        }
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Generates an id from the wall clock in nanoseconds, bumped so that ids
    /// handed out by this queue are strictly increasing
    pub fn generate_id(&self) -> String {
        let now = Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros().saturating_mul(1000));

        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(nanos.max(last + 1))
            })
            .unwrap_or(nanos);

        nanos.max(previous + 1).to_string()
    }
}

impl QueueStorage for SqliteQueue {
    fn put(&self, items: &[NewQueueItem]) -> StorageResult<usize> {
        let enqueued_at = Utc::now().timestamp_millis();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut accepted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO queue (id, url, scope, priority, enqueued_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;

            for item in items {
                let id = match item.id.as_deref() {
                    Some(id) if !id.is_empty() => id.to_string(),
                    _ => self.generate_id(),
                };
                accepted += stmt.execute(params![id, item.url, item.scope, item.priority, enqueued_at])?;
            }
        }
        tx.commit()?;

        Ok(accepted)
    }

    fn get_next(&self, scope: &str, limit: u32) -> StorageResult<Vec<QueueItem>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, url, scope, priority, enqueued_at FROM queue
             WHERE scope = ?1
             ORDER BY priority DESC, enqueued_at ASC, rowid ASC
             LIMIT ?2",
        )?;

        let items = stmt
            .query_map(params![scope, limit], |row| {
                Ok(QueueItem {
                    id: row.get(0)?,
                    url: row.get(1)?,
                    scope: row.get(2)?,
                    priority: row.get(3)?,
                    enqueued_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn ack(&self, ids: &[String]) -> StorageResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut acked = 0;
        {
            let mut stmt = tx.prepare("DELETE FROM queue WHERE id = ?1")?;
            for id in ids {
                acked += stmt.execute(params![id])?;
            }
        }
        tx.commit()?;

        Ok(acked)
    }

    fn count(&self) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM queue", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_scope(&self, scope: &str) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM queue WHERE scope = ?1",
            params![scope],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
