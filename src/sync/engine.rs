//! Sync engine
//!
//! Drains the pending-evaluation queue to the remote API.
//!
//! # Design
//!
//! - Single-flight: a pass only starts from Idle; a trigger while a pass is
//!   running returns `SyncOutcome::AlreadyRunning` and does nothing else
//! - Records are independent: a failed submission is logged and left queued
//!   while the rest of the pass continues
//! - No backoff: every online tick retries every unsynced record
//! - The submission date is the day the pass runs
//! - Auto-sync ticks are skipped while offline; each online tick spawns the
//!   pass as its own task, so stopping the timer never cancels a pass

use crate::error::Result;
use crate::services::api::RemoteApi;
use crate::storage::OfflineStore;
use crate::sync::connectivity::ConnectivityObserver;
use crate::sync::task::TaskHandle;
use crate::types::PendingEvaluation;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Default auto-sync interval
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(30);

/// Per-pass counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Records read from the queue at the start of the pass
    pub attempted: usize,
    /// Accepted remotely and removed from the queue
    pub synced: usize,
    /// Left queued for the next pass
    pub failed: usize,
}

/// Result of asking for a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Another pass held the single-flight flag
    AlreadyRunning,
    /// The pass ran to the end, whatever happened to individual records
    Completed(SyncReport),
}

/// Clears the syncing flag however the pass ends
struct SyncingGuard<'a>(&'a AtomicBool);

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SyncEngine {
    store: Arc<dyn OfflineStore>,
    api: Arc<dyn RemoteApi>,
    connectivity: ConnectivityObserver,
    syncing: AtomicBool,
    auto_sync: Mutex<Option<TaskHandle>>,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn OfflineStore>,
        api: Arc<dyn RemoteApi>,
        connectivity: ConnectivityObserver,
    ) -> Self {
        Self {
            store,
            api,
            connectivity,
            syncing: AtomicBool::new(false),
            auto_sync: Mutex::new(None),
        }
    }

    /// True while a pass holds the single-flight flag
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Run one pass unless one is already running
    pub async fn sync_pending(&self) -> SyncOutcome {
        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Sync pass already running, ignoring trigger");
            return SyncOutcome::AlreadyRunning;
        }
        let _guard = SyncingGuard(&self.syncing);

        let pending = self.store.list_unsynced_evaluations().await;
        let mut report = SyncReport {
            attempted: pending.len(),
            ..Default::default()
        };

        if pending.is_empty() {
            debug!("No pending evaluations to sync");
        } else {
            info!("Syncing {} pending evaluation(s)", pending.len());
        }

        let today = Utc::now().date_naive();
        for record in &pending {
            match self.sync_one(record, today).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    report.failed += 1;
                    warn!("Failed to sync evaluation {}: {}", record.id, e);
                }
            }
        }

        // Housekeeping only; expired entries already read as absent
        if let Err(e) = self.store.purge_expired_cache().await {
            debug!("Cache purge skipped: {}", e);
        }

        if report.attempted > 0 {
            info!(
                "Sync pass finished: {} synced, {} still pending",
                report.synced, report.failed
            );
        }
        SyncOutcome::Completed(report)
    }

    async fn sync_one(&self, record: &PendingEvaluation, date: NaiveDate) -> Result<()> {
        if record.synced {
            return Ok(());
        }

        self.api.submit_evaluation(&record.to_remote(date)).await?;
        self.store.mark_synced(record.id).await?;

        // A synced record is already invisible to the queue; a failed delete
        // only leaves a tombstone row behind
        if let Err(e) = self.store.remove_evaluation(record.id).await {
            warn!("Evaluation {} synced but not removed: {}", record.id, e);
        }

        debug!("Evaluation {} synced", record.id);
        Ok(())
    }

    /// Start the recurring timer, replacing any previous one
    ///
    /// The first tick fires one `period` after the call.
    pub async fn start_auto_sync(self: &Arc<Self>, period: Duration) {
        let mut slot = self.auto_sync.lock().await;
        if let Some(mut previous) = slot.take() {
            previous.stop().await;
        }

        let engine = Arc::downgrade(self);
        *slot = Some(TaskHandle::spawn("Auto-sync", move |shutdown_rx| {
            run_auto_sync_loop(engine, period, shutdown_rx)
        }));
        info!("Auto-sync started (every {:?})", period);
    }

    /// Cancel future ticks; a pass already in flight runs to completion
    pub async fn stop_auto_sync(&self) {
        if let Some(mut handle) = self.auto_sync.lock().await.take() {
            handle.stop().await;
            info!("Auto-sync stopped");
        }
    }

    pub async fn is_auto_sync_active(&self) -> bool {
        self.auto_sync
            .lock()
            .await
            .as_ref()
            .map(TaskHandle::is_running)
            .unwrap_or(false)
    }

    /// What one timer tick does
    ///
    /// Returns the spawned pass, or `None` when the tick was skipped.
    fn tick(self: Arc<Self>) -> Option<tokio::task::JoinHandle<SyncOutcome>> {
        if !self.connectivity.is_online() {
            debug!("Offline, skipping auto-sync tick");
            return None;
        }
        Some(tokio::spawn(async move { self.sync_pending().await }))
    }
}

async fn run_auto_sync_loop(
    engine: Weak<SyncEngine>,
    period: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let Some(engine) = engine.upgrade() else {
                    debug!("Sync engine dropped, ending auto-sync loop");
                    break;
                };

                if let Some(pass) = engine.tick() {
                    tokio::spawn(async move {
                        if let Err(e) = pass.await {
                            error!("Sync pass task failed: {}", e);
                        }
                    });
                }
            }

            _ = shutdown_rx.recv() => break,
        }
    }
}
