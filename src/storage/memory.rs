//! In-memory offline store
//!
//! Same contract as the SQLite store without durability. Used by tests and
//! by embedders that only need a volatile queue. `set_available(false)`
//! simulates a storage outage.

use crate::error::{EvalSyncError, Result};
use crate::storage::{expiry_from_now, OfflineStore};
use crate::types::{CacheEntry, EvaluationId, NewEvaluation, PendingEvaluation};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Default)]
struct Collections {
    next_id: i64,
    evaluations: BTreeMap<EvaluationId, PendingEvaluation>,
    cache: HashMap<String, CacheEntry>,
}

/// Volatile offline store
pub struct InMemoryOfflineStore {
    inner: RwLock<Collections>,
    available: AtomicBool,
}

impl Default for InMemoryOfflineStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryOfflineStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Collections::default()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle a simulated outage; data is kept across the outage
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(EvalSyncError::StorageUnavailable(
                "in-memory store marked unavailable".to_string(),
            ))
        }
    }

    /// Every record including synced ones, for assertions
    pub async fn all_evaluations(&self) -> Vec<PendingEvaluation> {
        self.inner.read().await.evaluations.values().cloned().collect()
    }
}

#[async_trait]
impl OfflineStore for InMemoryOfflineStore {
    async fn initialize(&self) -> Result<()> {
        self.check_available()
    }

    async fn enqueue_evaluation(&self, evaluation: NewEvaluation) -> Result<EvaluationId> {
        self.check_available()?;
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = EvaluationId(inner.next_id);
        inner
            .evaluations
            .insert(id, PendingEvaluation::from_new(id, evaluation, Utc::now()));
        debug!("Enqueued pending evaluation {} (memory)", id);
        Ok(id)
    }

    async fn list_unsynced_evaluations(&self) -> Vec<PendingEvaluation> {
        if let Err(e) = self.check_available() {
            warn!("Failed to read pending evaluations, treating queue as empty: {}", e);
            return Vec::new();
        }

        let inner = self.inner.read().await;
        let mut pending: Vec<_> = inner
            .evaluations
            .values()
            .filter(|e| !e.synced)
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        pending
    }

    async fn mark_synced(&self, id: EvaluationId) -> Result<()> {
        self.check_available()?;
        if let Some(record) = self.inner.write().await.evaluations.get_mut(&id) {
            record.synced = true;
        }
        Ok(())
    }

    async fn remove_evaluation(&self, id: EvaluationId) -> Result<()> {
        self.check_available()?;
        self.inner.write().await.evaluations.remove(&id);
        Ok(())
    }

    async fn put_cache(&self, key: &str, payload: serde_json::Value, ttl: Duration) -> Result<()> {
        self.check_available()?;
        let entry = CacheEntry {
            key: key.to_string(),
            payload,
            timestamp: Utc::now(),
            expiry: expiry_from_now(ttl),
        };
        self.inner.write().await.cache.insert(key.to_string(), entry);
        Ok(())
    }

    async fn get_cache(&self, key: &str) -> Result<Option<serde_json::Value>> {
        self.check_available()?;
        let inner = self.inner.read().await;
        Ok(inner
            .cache
            .get(key)
            .filter(|entry| entry.is_fresh_at(Utc::now()))
            .map(|entry| entry.payload.clone()))
    }

    async fn purge_expired_cache(&self) -> Result<usize> {
        self.check_available()?;
        let now = Utc::now();
        let mut inner = self.inner.write().await;
        let before = inner.cache.len();
        inner.cache.retain(|_, entry| entry.is_fresh_at(now));
        Ok(before - inner.cache.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let store = InMemoryOfflineStore::new();
        let id = store
            .enqueue_evaluation(NewEvaluation::new(1, "Store B").score(1, 3.0))
            .await
            .unwrap();

        store.remove_evaluation(id).await.unwrap();
        store.remove_evaluation(id).await.unwrap();
        assert!(store.all_evaluations().await.is_empty());
    }

    #[tokio::test]
    async fn test_outage_reads_soft_writes_hard() {
        let store = InMemoryOfflineStore::new();
        store
            .enqueue_evaluation(NewEvaluation::new(1, "Store B").score(1, 3.0))
            .await
            .unwrap();

        store.set_available(false);
        assert!(store.list_unsynced_evaluations().await.is_empty());
        assert_eq!(store.pending_count().await, 0);
        assert!(matches!(
            store.initialize().await,
            Err(EvalSyncError::StorageUnavailable(_))
        ));
        assert!(store
            .enqueue_evaluation(NewEvaluation::new(2, "Store B"))
            .await
            .is_err());

        store.set_available(true);
        assert_eq!(store.pending_count().await, 1);
    }

    #[tokio::test]
    async fn test_cache_ttl() {
        let store = InMemoryOfflineStore::new();
        store
            .put_cache("k", serde_json::json!({"v": 1}), Duration::from_millis(100))
            .await
            .unwrap();
        assert!(store.get_cache("k").await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(store.get_cache("k").await.unwrap().is_none());
        assert_eq!(store.purge_expired_cache().await.unwrap(), 1);
    }
}
