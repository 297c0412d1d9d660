//! Sync status surface
//!
//! Read-only projection of queue depth and connectivity for user feedback,
//! refreshed on its own timer independent of the sync engine's tick.

use crate::storage::OfflineStore;
use crate::sync::connectivity::ConnectivityObserver;
use crate::sync::task::TaskHandle;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

/// Default refresh cadence
pub const DEFAULT_STATUS_REFRESH: Duration = Duration::from_secs(5);

/// What the status indicator shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub pending_count: usize,
    pub online: bool,
}

impl Default for SyncStatus {
    fn default() -> Self {
        Self {
            pending_count: 0,
            online: true,
        }
    }
}

impl SyncStatus {
    /// The indicator hides when online with nothing queued
    pub fn is_visible(&self) -> bool {
        !(self.online && self.pending_count == 0)
    }

    /// Human-readable summary, e.g. "Offline - 2 evaluations pending sync"
    pub fn label(&self) -> String {
        let state = if self.online { "Online" } else { "Offline" };
        match self.pending_count {
            0 => state.to_string(),
            1 => format!("{} - 1 evaluation pending sync", state),
            n => format!("{} - {} evaluations pending sync", state, n),
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

pub struct SyncStatusMonitor {
    store: Option<Arc<dyn OfflineStore>>,
    connectivity: ConnectivityObserver,
    tx: watch::Sender<SyncStatus>,
    refresher: Mutex<Option<TaskHandle>>,
}

impl SyncStatusMonitor {
    /// `store` is `None` when offline capture is disabled; the pending count
    /// then always reads zero
    pub fn new(store: Option<Arc<dyn OfflineStore>>, connectivity: ConnectivityObserver) -> Self {
        let initial = SyncStatus {
            pending_count: 0,
            online: connectivity.is_online(),
        };
        let (tx, _rx) = watch::channel(initial);

        Self {
            store,
            connectivity,
            tx,
            refresher: Mutex::new(None),
        }
    }

    /// Compute a fresh status and publish it
    pub async fn refresh(&self) -> SyncStatus {
        let pending_count = match &self.store {
            Some(store) => store.pending_count().await,
            None => 0,
        };
        let status = SyncStatus {
            pending_count,
            online: self.connectivity.is_online(),
        };

        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
        status
    }

    /// Last published status, without touching the store
    pub fn current(&self) -> SyncStatus {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.tx.subscribe()
    }

    /// Refresh now and then every `period`, replacing any running refresher
    pub async fn start(self: &Arc<Self>, period: Duration) {
        let mut slot = self.refresher.lock().await;
        if let Some(mut previous) = slot.take() {
            previous.stop().await;
        }

        let monitor = Arc::downgrade(self);
        *slot = Some(TaskHandle::spawn("Status refresh", move |shutdown_rx| {
            run_refresh_loop(monitor, period, shutdown_rx)
        }));
    }

    pub async fn stop(&self) {
        if let Some(mut handle) = self.refresher.lock().await.take() {
            handle.stop().await;
        }
    }
}

async fn run_refresh_loop(
    monitor: Weak<SyncStatusMonitor>,
    period: Duration,
    mut shutdown_rx: tokio::sync::broadcast::Receiver<()>,
) {
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let Some(monitor) = monitor.upgrade() else { break };
                let status = monitor.refresh().await;
                debug!("Sync status: {}", status);
            }
            _ = shutdown_rx.recv() => break,
        }
    }
}
