//! End-to-end offline capture: queue while disconnected, drain on reconnect

mod common;

use common::{create_test_store, FakeRemoteApi};
use evalsync_core::{
    EvalSyncConfig, NewEvaluation, OfflineRuntime, OfflineStore, SubmissionOutcome,
};
use std::sync::Arc;
use std::time::Duration;

fn fast_config() -> EvalSyncConfig {
    EvalSyncConfig {
        sync_interval_secs: 1,
        status_refresh_secs: 1,
        ..Default::default()
    }
}

async fn wait_for_pending(runtime: &OfflineRuntime, expected: usize, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if runtime.sync_status().await.pending_count == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_offline_capture_then_background_sync() {
    let (store, _dir) = create_test_store().await;
    let store: Arc<dyn OfflineStore> = Arc::new(store);
    let api = Arc::new(FakeRemoteApi::new());
    let runtime = OfflineRuntime::with_parts(fast_config(), api.clone(), Some(store.clone()));

    runtime.connectivity().set_online(false);
    runtime.start_background().await;

    let outcome = runtime
        .submitter()
        .submit(NewEvaluation::new(7, "Store A").score(3, 4.0))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Queued(_)));

    let status = runtime.sync_status().await;
    assert_eq!(status.pending_count, 1);
    assert!(!status.online);
    assert!(status.is_visible());
    assert_eq!(status.label(), "Offline - 1 evaluation pending sync");

    // Offline ticks leave the queue alone
    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert_eq!(api.submission_count(), 0);

    runtime.connectivity().set_online(true);
    assert!(wait_for_pending(&runtime, 0, Duration::from_secs(3)).await);

    let sent = api.submissions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].product_id, 7);
    assert_eq!(sent[0].store_location, "Store A");
    assert_eq!(sent[0].scores[0].criterion_id, 3);
    assert_eq!(sent[0].scores[0].score, 4.0);

    // Background status refresher converges too
    let mut rx = runtime.status().subscribe();
    let settled = tokio::time::timeout(
        Duration::from_secs(3),
        rx.wait_for(|s| s.pending_count == 0 && s.online),
    )
    .await
    .map(|seen| seen.is_ok())
    .unwrap_or(false);
    assert!(settled);
    assert!(!runtime.status().current().is_visible());

    runtime.shutdown().await;
}

#[tokio::test]
async fn test_failed_direct_submission_is_queued_not_lost() {
    let (store, _dir) = create_test_store().await;
    let store: Arc<dyn OfflineStore> = Arc::new(store);
    let api = Arc::new(FakeRemoteApi::new());
    api.reject_product(7);
    let runtime = OfflineRuntime::with_parts(fast_config(), api.clone(), Some(store.clone()));

    let outcome = runtime
        .submitter()
        .submit(NewEvaluation::new(7, "Store A").score(3, 4.0))
        .await
        .unwrap();
    assert!(matches!(outcome, SubmissionOutcome::Queued(_)));
    assert_eq!(store.pending_count().await, 1);

    api.accept_product(7);
    runtime.sync_now().await;
    assert_eq!(store.pending_count().await, 0);
    assert_eq!(api.submission_count(), 2);
}

#[tokio::test]
async fn test_online_only_mode_rejects_offline_capture() {
    let api = Arc::new(FakeRemoteApi::new());
    let runtime = OfflineRuntime::with_parts(fast_config(), api.clone(), None);

    runtime.connectivity().set_online(false);
    let result = runtime
        .submitter()
        .submit(NewEvaluation::new(7, "Store A").score(3, 4.0))
        .await;

    assert!(result.is_err());
    assert_eq!(runtime.sync_status().await.pending_count, 0);
    assert!(runtime.sync_now().await.is_none());
    assert_eq!(api.submission_count(), 0);
}

#[tokio::test]
async fn test_catalog_is_served_from_cache() {
    let (store, _dir) = create_test_store().await;
    let api = Arc::new(FakeRemoteApi::new());
    api.respond(
        "/api/products",
        serde_json::json!([{ "id": 7, "sku": "TS-007", "name": "Trail Shoe", "category_id": 2 }]),
    );
    let runtime = OfflineRuntime::with_parts(fast_config(), api.clone(), Some(Arc::new(store)));

    let first = runtime.catalog().products().await.unwrap();
    let second = runtime.catalog().products().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first[0].id, 7);
    assert_eq!(api.get_count(), 1);
}
