//! Sync engine integration tests
//!
//! Single-flight passes, per-record failure isolation, and the auto-sync
//! timer's interaction with connectivity, against the SQLite store.

mod common;

use chrono::Utc;
use common::{create_test_store, FakeRemoteApi};
use evalsync_core::{
    ConnectivityObserver, NewEvaluation, OfflineStore, SyncEngine, SyncOutcome, SyncReport,
};
use std::sync::Arc;
use std::time::Duration;

fn evaluation(product_id: i64) -> NewEvaluation {
    NewEvaluation::new(product_id, "Store A").score(3, 4.0)
}

#[tokio::test]
async fn test_concurrent_triggers_run_one_pass() {
    let (store, _dir) = create_test_store().await;
    let store = Arc::new(store);
    store.enqueue_evaluation(evaluation(1)).await.unwrap();
    store.enqueue_evaluation(evaluation(2)).await.unwrap();

    let api = Arc::new(FakeRemoteApi::with_delay(Duration::from_millis(100)));
    let engine = SyncEngine::new(store.clone(), api.clone(), ConnectivityObserver::new(true));

    let (first, second) = tokio::join!(engine.sync_pending(), engine.sync_pending());

    assert_eq!(
        first,
        SyncOutcome::Completed(SyncReport {
            attempted: 2,
            synced: 2,
            failed: 0
        })
    );
    assert_eq!(second, SyncOutcome::AlreadyRunning);

    // Each record went out exactly once
    assert_eq!(api.submission_count(), 2);
    assert_eq!(store.pending_count().await, 0);
    assert!(!engine.is_syncing());
}

#[tokio::test]
async fn test_failed_record_does_not_block_the_rest() {
    let (store, _dir) = create_test_store().await;
    let store = Arc::new(store);
    for product_id in 1..=3 {
        store.enqueue_evaluation(evaluation(product_id)).await.unwrap();
    }

    let api = Arc::new(FakeRemoteApi::new());
    api.reject_product(2);
    let engine = SyncEngine::new(store.clone(), api.clone(), ConnectivityObserver::new(true));

    let outcome = engine.sync_pending().await;
    assert_eq!(
        outcome,
        SyncOutcome::Completed(SyncReport {
            attempted: 3,
            synced: 2,
            failed: 1
        })
    );

    // Submission order follows the queue
    let order: Vec<i64> = api.submissions().iter().map(|s| s.product_id).collect();
    assert_eq!(order, vec![1, 2, 3]);

    let remaining = store.list_unsynced_evaluations().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].product_id, 2);

    // The next pass retries only what is left
    api.accept_product(2);
    engine.sync_pending().await;
    assert_eq!(api.submission_count(), 4);
    assert_eq!(store.pending_count().await, 0);
}

#[tokio::test]
async fn test_submission_uses_pass_date_and_payload_fields() {
    let (store, _dir) = create_test_store().await;
    let store = Arc::new(store);
    store
        .enqueue_evaluation(
            NewEvaluation::new(7, "Store A")
                .score(3, 4.0)
                .comments("shelf edge damaged"),
        )
        .await
        .unwrap();

    let api = Arc::new(FakeRemoteApi::new());
    let engine = SyncEngine::new(store.clone(), api.clone(), ConnectivityObserver::new(true));
    engine.sync_pending().await;

    let sent = api.submissions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].product_id, 7);
    assert_eq!(sent[0].store_location, "Store A");
    assert_eq!(sent[0].notes.as_deref(), Some("shelf edge damaged"));
    assert_eq!(sent[0].scores.len(), 1);
    assert_eq!(sent[0].scores[0].criterion_id, 3);
    assert_eq!(sent[0].evaluation_date, Utc::now().date_naive());
}

#[tokio::test]
async fn test_empty_queue_pass_makes_no_calls() {
    let (store, _dir) = create_test_store().await;
    let api = Arc::new(FakeRemoteApi::new());
    let engine = SyncEngine::new(Arc::new(store), api.clone(), ConnectivityObserver::new(true));

    assert_eq!(
        engine.sync_pending().await,
        SyncOutcome::Completed(SyncReport::default())
    );
    assert_eq!(api.submission_count(), 0);
}

#[tokio::test]
async fn test_auto_sync_skips_offline_ticks() {
    let (store, _dir) = create_test_store().await;
    let store = Arc::new(store);
    store.enqueue_evaluation(evaluation(7)).await.unwrap();

    let connectivity = ConnectivityObserver::new(false);
    let api = Arc::new(FakeRemoteApi::new());
    let engine = Arc::new(SyncEngine::new(store.clone(), api.clone(), connectivity.clone()));

    engine.start_auto_sync(Duration::from_millis(50)).await;
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(api.submission_count(), 0);
    assert_eq!(store.pending_count().await, 1);

    connectivity.set_online(true);
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(api.submission_count(), 1);
    assert_eq!(store.pending_count().await, 0);

    engine.stop_auto_sync().await;
    assert!(!engine.is_auto_sync_active().await);
}

#[tokio::test]
async fn test_stopping_auto_sync_lets_in_flight_pass_finish() {
    let (store, _dir) = create_test_store().await;
    let store = Arc::new(store);
    store.enqueue_evaluation(evaluation(7)).await.unwrap();

    let api = Arc::new(FakeRemoteApi::with_delay(Duration::from_millis(300)));
    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        api.clone(),
        ConnectivityObserver::new(true),
    ));

    engine.start_auto_sync(Duration::from_millis(50)).await;
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert!(engine.is_syncing());

    engine.stop_auto_sync().await;
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(!engine.is_syncing());
    assert_eq!(api.submission_count(), 1);
    assert_eq!(store.pending_count().await, 0);
}

#[tokio::test]
async fn test_restarting_auto_sync_cancels_previous_timer() {
    let (store, _dir) = create_test_store().await;
    let store = Arc::new(store);
    store.enqueue_evaluation(evaluation(7)).await.unwrap();

    let api = Arc::new(FakeRemoteApi::new());
    let engine = Arc::new(SyncEngine::new(
        store.clone(),
        api.clone(),
        ConnectivityObserver::new(true),
    ));

    engine.start_auto_sync(Duration::from_millis(50)).await;
    engine.start_auto_sync(Duration::from_secs(60)).await;
    assert!(engine.is_auto_sync_active().await);

    // A leftover 50ms timer would have drained the queue by now
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(api.submission_count(), 0);
    assert_eq!(store.pending_count().await, 1);

    engine.stop_auto_sync().await;
    assert!(!engine.is_auto_sync_active().await);
}
