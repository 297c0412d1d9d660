//! SQLite offline store
//!
//! rusqlite behind a deadpool connection pool, so blocking SQLite calls run
//! on tokio's blocking threads via `interact`. The pool and schema are set up
//! lazily and exactly once; every public operation is a single statement or
//! transaction.

use crate::error::{EvalSyncError, Result};
use crate::storage::{expiry_from_now, OfflineStore};
use crate::types::{EvaluationId, NewEvaluation, PendingEvaluation, ScoreEntry};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::{params, OptionalExtension};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// How long a connection waits on a locked database
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS pending_evaluations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL,
    scores TEXT NOT NULL,
    comments TEXT,
    location TEXT NOT NULL,
    created_at TEXT NOT NULL,
    synced INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_pending_synced ON pending_evaluations(synced);
CREATE INDEX IF NOT EXISTS idx_pending_created_at ON pending_evaluations(created_at);

CREATE TABLE IF NOT EXISTS cached_data (
    key TEXT PRIMARY KEY NOT NULL,
    data TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    expiry INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cache_timestamp ON cached_data(timestamp);
"#;

/// Offline store backed by a single SQLite file
pub struct SqliteOfflineStore {
    path: PathBuf,
    pool: OnceCell<Pool>,
}

impl SqliteOfflineStore {
    /// Create a handle for the database at `path`
    ///
    /// Nothing touches the filesystem until `initialize` (or the first
    /// operation) runs.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            pool: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The live pool, opening it and applying the schema on first use
    async fn pool(&self) -> Result<&Pool> {
        self.pool.get_or_try_init(|| self.open_pool()).await
    }

    async fn open_pool(&self) -> Result<Pool> {
        info!("Opening offline store at: {}", self.path.display());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                EvalSyncError::StorageUnavailable(format!(
                    "Cannot create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let pool = Config::new(self.path.clone())
            .create_pool(Runtime::Tokio1)
            .map_err(|e| {
                EvalSyncError::StorageUnavailable(format!(
                    "Failed to create connection pool: {}",
                    e
                ))
            })?;

        let conn = pool.get().await.map_err(|e| {
            EvalSyncError::StorageUnavailable(format!(
                "Failed to open '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        conn.interact(|conn| -> rusqlite::Result<()> {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                row.get::<_, String>(0)
            })?;
            conn.execute_batch(SCHEMA)
        })
        .await
        .map_err(|e| EvalSyncError::StorageUnavailable(format!("Pool interaction failed: {}", e)))?
        .map_err(|e| EvalSyncError::StorageUnavailable(format!("Failed to apply schema: {}", e)))?;

        info!("Offline store ready");
        Ok(pool)
    }

    /// Run `f` on a pooled connection
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut rusqlite::Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.pool().await?.get().await.map_err(|e| {
            EvalSyncError::Database(format!("Failed to get connection from pool: {}", e))
        })?;

        conn.interact(move |conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            f(conn)
        })
        .await
        .map_err(|e| EvalSyncError::Database(format!("Pool interaction failed: {}", e)))?
    }

    async fn try_list_unsynced(&self) -> Result<Vec<PendingEvaluation>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, product_id, scores, comments, location, created_at, synced
                 FROM pending_evaluations
                 WHERE synced = 0
                 ORDER BY created_at, id",
            )?;

            let rows = stmt.query_map([], |row| {
                Ok(RawPending {
                    id: row.get(0)?,
                    product_id: row.get(1)?,
                    scores: row.get(2)?,
                    comments: row.get(3)?,
                    location: row.get(4)?,
                    created_at: row.get(5)?,
                    synced: row.get::<_, i64>(6)? != 0,
                })
            })?;

            let mut pending = Vec::new();
            for row in rows {
                let raw = row?;
                let id = raw.id;
                match raw.decode() {
                    Ok(record) => pending.push(record),
                    // One corrupt row must not hide the rest of the queue
                    Err(e) => warn!("Skipping unreadable pending evaluation {}: {}", id, e),
                }
            }
            Ok(pending)
        })
        .await
    }
}

/// Row as stored, before JSON and timestamp decoding
struct RawPending {
    id: i64,
    product_id: i64,
    scores: String,
    comments: Option<String>,
    location: String,
    created_at: String,
    synced: bool,
}

impl RawPending {
    fn decode(self) -> Result<PendingEvaluation> {
        let scores: Vec<ScoreEntry> = serde_json::from_str(&self.scores)?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| EvalSyncError::Database(format!("Bad created_at timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(PendingEvaluation {
            id: EvaluationId(self.id),
            product_id: self.product_id,
            scores,
            comments: self.comments,
            location: self.location,
            created_at,
            synced: self.synced,
        })
    }
}

#[async_trait]
impl OfflineStore for SqliteOfflineStore {
    async fn initialize(&self) -> Result<()> {
        self.pool().await.map(|_| ())
    }

    async fn enqueue_evaluation(&self, evaluation: NewEvaluation) -> Result<EvaluationId> {
        let scores = serde_json::to_string(&evaluation.scores)?;
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        let id = self
            .with_conn(move |conn| {
                conn.execute(
                    "INSERT INTO pending_evaluations
                        (product_id, scores, comments, location, created_at, synced)
                     VALUES (?1, ?2, ?3, ?4, ?5, 0)",
                    params![
                        evaluation.product_id,
                        scores,
                        evaluation.comments,
                        evaluation.location,
                        created_at
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        debug!("Enqueued pending evaluation {}", id);
        Ok(EvaluationId(id))
    }

    async fn list_unsynced_evaluations(&self) -> Vec<PendingEvaluation> {
        match self.try_list_unsynced().await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Failed to read pending evaluations, treating queue as empty: {}", e);
                Vec::new()
            }
        }
    }

    async fn mark_synced(&self, id: EvaluationId) -> Result<()> {
        let changed = self
            .with_conn(move |conn| {
                Ok(conn.execute(
                    "UPDATE pending_evaluations SET synced = 1 WHERE id = ?1 AND synced = 0",
                    params![id.0],
                )?)
            })
            .await?;

        if changed == 0 {
            debug!("mark_synced({}) changed nothing", id);
        }
        Ok(())
    }

    async fn remove_evaluation(&self, id: EvaluationId) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM pending_evaluations WHERE id = ?1", params![id.0])?;
            Ok(())
        })
        .await
    }

    async fn put_cache(&self, key: &str, payload: serde_json::Value, ttl: Duration) -> Result<()> {
        let key = key.to_string();
        let data = serde_json::to_string(&payload)?;
        let timestamp = Utc::now().timestamp_millis();
        let expiry = expiry_from_now(ttl).timestamp_millis();

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO cached_data (key, data, timestamp, expiry)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                    data = excluded.data,
                    timestamp = excluded.timestamp,
                    expiry = excluded.expiry",
                params![key, data, timestamp, expiry],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let key = key.to_string();

        self.with_conn(move |conn| {
            let row: Option<(String, i64)> = conn
                .query_row(
                    "SELECT data, expiry FROM cached_data WHERE key = ?1",
                    params![key],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let now = Utc::now().timestamp_millis();
            match row {
                Some((data, expiry)) if now < expiry => Ok(Some(serde_json::from_str(&data)?)),
                Some(_) => {
                    conn.execute(
                        "DELETE FROM cached_data WHERE key = ?1 AND expiry <= ?2",
                        params![key, now],
                    )?;
                    Ok(None)
                }
                None => Ok(None),
            }
        })
        .await
    }

    async fn purge_expired_cache(&self) -> Result<usize> {
        let now = Utc::now().timestamp_millis();
        let purged = self
            .with_conn(move |conn| {
                Ok(conn.execute("DELETE FROM cached_data WHERE expiry <= ?1", params![now])?)
            })
            .await?;

        if purged > 0 {
            debug!("Purged {} expired cache entries", purged);
        }
        Ok(purged)
    }

    async fn pending_count(&self) -> usize {
        let count = self
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM pending_evaluations WHERE synced = 0",
                    [],
                    |row| row.get::<_, i64>(0),
                )?)
            })
            .await;

        match count {
            Ok(count) => count.max(0) as usize,
            Err(e) => {
                warn!("Failed to count pending evaluations: {}", e);
                0
            }
        }
    }
}
