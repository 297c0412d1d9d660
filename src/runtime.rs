//! Application-level wiring of the offline subsystem
//!
//! One `OfflineRuntime` per running application: it owns the store, the
//! connectivity observer, the sync engine and the status monitor, and gives
//! them an explicit `initialize` / `shutdown` lifecycle.
//!
//! If the durable store cannot be opened the runtime still comes up in
//! online-only mode: submissions go straight to the API, nothing is queued,
//! and catalog responses are cached in memory only.

use crate::config::EvalSyncConfig;
use crate::error::{EvalSyncError, Result};
use crate::services::api::{HttpRemoteApi, RemoteApi};
use crate::services::catalog::CatalogService;
use crate::storage::{InMemoryOfflineStore, OfflineStore, SqliteOfflineStore};
use crate::sync::{
    ConnectivityObserver, ConnectivityProbe, EvaluationSubmitter, SyncEngine, SyncOutcome,
    SyncStatus, SyncStatusMonitor, TaskHandle,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct OfflineRuntime {
    config: EvalSyncConfig,
    store: Option<Arc<dyn OfflineStore>>,
    connectivity: ConnectivityObserver,
    engine: Option<Arc<SyncEngine>>,
    status: Arc<SyncStatusMonitor>,
    submitter: EvaluationSubmitter,
    catalog: CatalogService,
    probe: Option<ConnectivityProbe>,
    probe_task: Mutex<Option<TaskHandle>>,
}

impl OfflineRuntime {
    /// Open the SQLite store and HTTP client described by `config`
    pub async fn initialize(config: EvalSyncConfig) -> Result<Self> {
        config.validate()?;

        let api: Arc<dyn RemoteApi> = Arc::new(HttpRemoteApi::new(&config)?);
        let sqlite = Arc::new(SqliteOfflineStore::new(&config.db_path));
        let opened = sqlite.initialize().await;
        let store: Option<Arc<dyn OfflineStore>> = match opened {
            Ok(()) => Some(sqlite),
            Err(e @ EvalSyncError::StorageUnavailable(_)) => {
                warn!("Offline capture disabled, running online-only: {}", e);
                None
            }
            Err(e) => return Err(e),
        };

        let probe = ConnectivityProbe::new(config.resolved_health_url(), config.http_timeout())?;
        Ok(Self::assemble(config, api, store, Some(probe)))
    }

    /// Wire a runtime from ready-made parts (no probe)
    pub fn with_parts(
        config: EvalSyncConfig,
        api: Arc<dyn RemoteApi>,
        store: Option<Arc<dyn OfflineStore>>,
    ) -> Self {
        Self::assemble(config, api, store, None)
    }

    fn assemble(
        config: EvalSyncConfig,
        api: Arc<dyn RemoteApi>,
        store: Option<Arc<dyn OfflineStore>>,
        probe: Option<ConnectivityProbe>,
    ) -> Self {
        let connectivity = ConnectivityObserver::default();

        let engine = store
            .clone()
            .map(|store| Arc::new(SyncEngine::new(store, api.clone(), connectivity.clone())));
        let status = Arc::new(SyncStatusMonitor::new(store.clone(), connectivity.clone()));
        let submitter = EvaluationSubmitter::new(api.clone(), store.clone(), connectivity.clone());

        let cache_store: Arc<dyn OfflineStore> = match &store {
            Some(store) => store.clone(),
            None => Arc::new(InMemoryOfflineStore::new()),
        };
        let catalog = CatalogService::new(api, cache_store, config.cache_ttl());

        Self {
            config,
            store,
            connectivity,
            engine,
            status,
            submitter,
            catalog,
            probe,
            probe_task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &EvalSyncConfig {
        &self.config
    }

    pub fn store(&self) -> Option<&Arc<dyn OfflineStore>> {
        self.store.as_ref()
    }

    pub fn connectivity(&self) -> &ConnectivityObserver {
        &self.connectivity
    }

    pub fn engine(&self) -> Option<&Arc<SyncEngine>> {
        self.engine.as_ref()
    }

    pub fn status(&self) -> &Arc<SyncStatusMonitor> {
        &self.status
    }

    pub fn submitter(&self) -> &EvaluationSubmitter {
        &self.submitter
    }

    pub fn catalog(&self) -> &CatalogService {
        &self.catalog
    }

    pub fn offline_capture_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Probe reachability once and publish the result
    ///
    /// Without a probe the current belief is kept.
    pub async fn refresh_connectivity(&self) -> bool {
        match &self.probe {
            Some(probe) => probe.refresh(&self.connectivity).await,
            None => self.connectivity.is_online(),
        }
    }

    /// Run one pass now, if offline capture is enabled
    pub async fn sync_now(&self) -> Option<SyncOutcome> {
        match &self.engine {
            Some(engine) => Some(engine.sync_pending().await),
            None => None,
        }
    }

    pub async fn sync_status(&self) -> SyncStatus {
        self.status.refresh().await
    }

    /// Start auto-sync, status refresh and the reachability probe
    pub async fn start_background(&self) {
        if let Some(engine) = &self.engine {
            engine.start_auto_sync(self.config.sync_interval()).await;
        }
        self.status.start(self.config.status_refresh()).await;

        if let Some(probe) = &self.probe {
            let handle = probe
                .clone()
                .spawn(self.connectivity.clone(), self.config.probe_interval());
            if let Some(mut previous) = self.probe_task.lock().await.replace(handle) {
                previous.stop().await;
            }
        }

        info!("Offline runtime started");
    }

    /// Stop every background loop; an in-flight sync pass finishes on its own
    pub async fn shutdown(&self) {
        if let Some(mut probe) = self.probe_task.lock().await.take() {
            probe.stop().await;
        }
        self.status.stop().await;
        if let Some(engine) = &self.engine {
            engine.stop_auto_sync().await;
        }
        info!("Offline runtime stopped");
    }
}
