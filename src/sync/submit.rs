//! Evaluation submission entry point
//!
//! Routes a completed evaluation straight to the remote API when online,
//! and into the durable queue when offline or when the direct submission
//! fails, so user input is never dropped.

use crate::error::{EvalSyncError, Result};
use crate::scoring;
use crate::services::api::RemoteApi;
use crate::storage::OfflineStore;
use crate::sync::connectivity::ConnectivityObserver;
use crate::types::{EvaluationId, NewEvaluation};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Where an evaluation ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "local_id")]
pub enum SubmissionOutcome {
    /// Accepted by the remote API
    Submitted,
    /// Stored locally, waiting for the sync engine
    Queued(EvaluationId),
}

pub struct EvaluationSubmitter {
    api: Arc<dyn RemoteApi>,
    store: Option<Arc<dyn OfflineStore>>,
    connectivity: ConnectivityObserver,
}

impl EvaluationSubmitter {
    /// `store` is `None` in online-only mode
    pub fn new(
        api: Arc<dyn RemoteApi>,
        store: Option<Arc<dyn OfflineStore>>,
        connectivity: ConnectivityObserver,
    ) -> Self {
        Self {
            api,
            store,
            connectivity,
        }
    }

    pub fn offline_capture_enabled(&self) -> bool {
        self.store.is_some()
    }

    pub async fn submit(&self, evaluation: NewEvaluation) -> Result<SubmissionOutcome> {
        scoring::validate(&evaluation)?;

        if !self.connectivity.is_online() {
            return self.enqueue(evaluation).await;
        }

        let payload = evaluation.to_remote(Utc::now().date_naive());
        match self.api.submit_evaluation(&payload).await {
            Ok(()) => {
                info!("Evaluation for product {} submitted", evaluation.product_id);
                Ok(SubmissionOutcome::Submitted)
            }
            Err(e) if self.store.is_some() => {
                warn!("Direct submission failed, queueing for sync: {}", e);
                self.enqueue(evaluation).await
            }
            Err(e) => Err(e),
        }
    }

    async fn enqueue(&self, evaluation: NewEvaluation) -> Result<SubmissionOutcome> {
        let store = self.store.as_ref().ok_or_else(|| {
            EvalSyncError::StorageUnavailable(
                "offline capture is disabled; evaluation was not saved".to_string(),
            )
        })?;

        let product_id = evaluation.product_id;
        let id = store.enqueue_evaluation(evaluation).await?;
        info!("Evaluation for product {} queued as {}", product_id, id);
        Ok(SubmissionOutcome::Queued(id))
    }
}
