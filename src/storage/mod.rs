//! Local durable store for the offline subsystem
//!
//! Two independent collections live behind one handle:
//! - pending evaluations captured while disconnected
//! - cached remote-API responses with an absolute expiry

pub mod memory;
pub mod sqlite;

use crate::error::Result;
use crate::types::{EvaluationId, NewEvaluation, PendingEvaluation};
use async_trait::async_trait;
use std::time::Duration;

pub use memory::InMemoryOfflineStore;
pub use sqlite::SqliteOfflineStore;

/// Transactional keyed store with the operations the sync subsystem needs
///
/// Each operation is atomic on its own; nothing spans multiple calls.
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// Open (creating if absent) both collections and their indexes
    ///
    /// Idempotent. Fails with `StorageUnavailable` when the backing store
    /// cannot be opened.
    async fn initialize(&self) -> Result<()>;

    /// Insert with `synced = false` and return the fresh local id
    async fn enqueue_evaluation(&self, evaluation: NewEvaluation) -> Result<EvaluationId>;

    /// Every record with `synced = false`, oldest first
    ///
    /// Never fails: storage errors are logged and read as an empty queue.
    async fn list_unsynced_evaluations(&self) -> Vec<PendingEvaluation>;

    /// Flip `synced` to true; unknown ids are a no-op
    async fn mark_synced(&self, id: EvaluationId) -> Result<()>;

    /// Delete the record; unknown ids are a no-op
    async fn remove_evaluation(&self, id: EvaluationId) -> Result<()>;

    /// Upsert a cache entry expiring `ttl` from now
    async fn put_cache(&self, key: &str, payload: serde_json::Value, ttl: Duration) -> Result<()>;

    /// Payload if present and not yet expired
    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Physically drop expired cache entries, returning how many went
    async fn purge_expired_cache(&self) -> Result<usize>;

    /// Number of unsynced records; fails soft like the list
    async fn pending_count(&self) -> usize {
        self.list_unsynced_evaluations().await.len()
    }
}

/// Absolute expiry for a TTL starting now
pub(crate) fn expiry_from_now(ttl: Duration) -> chrono::DateTime<chrono::Utc> {
    let now = chrono::Utc::now();
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC)
}
