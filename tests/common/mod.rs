//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use evalsync_core::{
    error::{EvalSyncError, Result},
    RemoteApi, RemoteEvaluation, SqliteOfflineStore,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::TempDir;

/// Scripted stand-in for the evaluation API
///
/// Records every submission, fails for chosen products, and can be slowed
/// down to keep a sync pass in flight.
#[derive(Default)]
pub struct FakeRemoteApi {
    submissions: Mutex<Vec<RemoteEvaluation>>,
    failing_products: Mutex<HashSet<i64>>,
    responses: Mutex<HashMap<String, Value>>,
    delay: Mutex<Option<Duration>>,
    get_calls: AtomicUsize,
}

impl FakeRemoteApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        let api = Self::default();
        *api.delay.lock().unwrap() = Some(delay);
        api
    }

    /// Reject submissions for `product_id` until `accept_product` is called
    pub fn reject_product(&self, product_id: i64) {
        self.failing_products.lock().unwrap().insert(product_id);
    }

    pub fn accept_product(&self, product_id: i64) {
        self.failing_products.lock().unwrap().remove(&product_id);
    }

    /// Serve `body` for GET `path`
    pub fn respond(&self, path: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(path.to_string(), body);
    }

    pub fn submissions(&self) -> Vec<RemoteEvaluation> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }

    pub fn get_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteApi for FakeRemoteApi {
    async fn submit_evaluation(&self, evaluation: &RemoteEvaluation) -> Result<()> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.submissions.lock().unwrap().push(evaluation.clone());

        if self
            .failing_products
            .lock()
            .unwrap()
            .contains(&evaluation.product_id)
        {
            return Err(EvalSyncError::RemoteSubmissionFailed(format!(
                "product {} rejected",
                evaluation.product_id
            )));
        }
        Ok(())
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| EvalSyncError::RemoteApi(format!("no route for {}", path)))
    }
}

/// Fresh SQLite store in a temp dir; keep the `TempDir` alive for the test
pub async fn create_test_store() -> (SqliteOfflineStore, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let store = SqliteOfflineStore::new(temp_dir.path().join("offline.db"));
    evalsync_core::OfflineStore::initialize(&store)
        .await
        .expect("Failed to initialize test store");
    (store, temp_dir)
}
