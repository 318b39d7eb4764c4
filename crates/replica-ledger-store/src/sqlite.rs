//! SQLite implementation of the BlockStore trait.
//!
//! This is the reference persistent backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use replica_ledger_core::BlockId;

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::BlockStore;
use crate::updates::Updates;

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock()?;
            f(&mut *conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn latest_version(conn: &Connection, category: &str, key: &[u8]) -> Result<Option<Bytes>> {
    let row: Option<(Option<Vec<u8>>, bool)> = conn
        .query_row(
            "SELECT value, deleted FROM kv_versions
             WHERE category = ?1 AND key = ?2
             ORDER BY block_id DESC LIMIT 1",
            params![category, key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        None | Some((_, true)) => Ok(None),
        Some((Some(value), false)) => Ok(Some(Bytes::from(value))),
        Some((None, false)) => Err(StoreError::InvalidData(format!(
            "null value for live key in category {}",
            category
        ))),
    }
}

fn max_block_id(conn: &Connection) -> Result<u64> {
    let max: i64 = conn.query_row("SELECT COALESCE(MAX(block_id), 0) FROM blocks", [], |row| {
        row.get(0)
    })?;
    u64::try_from(max).map_err(|_| StoreError::InvalidData(format!("negative block id {}", max)))
}

fn append_block(conn: &mut Connection, updates: &Updates) -> Result<BlockId> {
    let tx = conn.transaction()?;
    let id = max_block_id(&tx)? + 1;

    tx.execute(
        "INSERT INTO blocks (block_id, write_count, appended_at) VALUES (?1, ?2, ?3)",
        params![id as i64, updates.len() as i64, now_millis()],
    )?;

    {
        let mut stmt = tx.prepare(
            "INSERT INTO kv_versions (category, key, block_id, value, deleted)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (category, key, write) in updates.writes() {
            let value = write.value().map(|v| v.as_ref());
            stmt.execute(params![category, key, id as i64, value, write.is_tombstone()])?;
        }
    }

    tx.commit()?;
    Ok(BlockId(id))
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl BlockStore for SqliteStore {
    async fn get_latest(&self, category: &str, key: &[u8]) -> Result<Option<Bytes>> {
        let category = category.to_owned();
        let key = key.to_vec();
        self.blocking(move |conn| latest_version(conn, &category, &key))
            .await
    }

    async fn last_reachable_block_id(&self) -> Result<BlockId> {
        self.blocking(|conn| max_block_id(conn).map(BlockId)).await
    }

    async fn append(&self, updates: Updates) -> Result<BlockId> {
        let writes = updates.len();
        let id = self
            .blocking(move |conn| append_block(conn, &updates))
            .await?;
        tracing::debug!(block_id = id.get(), writes, "appended block to sqlite store");
        Ok(id)
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}
