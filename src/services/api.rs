//! Remote evaluation API client
//!
//! The subsystem only needs two things from the server: accept one
//! evaluation as a unit, and answer JSON reads for the catalog.

use crate::config::EvalSyncConfig;
use crate::error::{EvalSyncError, Result};
use crate::types::RemoteEvaluation;
use async_trait::async_trait;
use tracing::debug;

/// Remote API seam
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Submit one evaluation; `Ok` only when the server accepted it
    async fn submit_evaluation(&self, evaluation: &RemoteEvaluation) -> Result<()>;

    /// GET a JSON resource relative to the API base (e.g. `/api/products`)
    async fn get_json(&self, path: &str) -> Result<serde_json::Value>;
}

/// reqwest-backed client for the evaluation API
pub struct HttpRemoteApi {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpRemoteApi {
    /// Create a client from configuration
    pub fn new(config: &EvalSyncConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone().filter(|t| !t.is_empty()),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn submit_evaluation(&self, evaluation: &RemoteEvaluation) -> Result<()> {
        debug!("Submitting evaluation for product {}", evaluation.product_id);

        let response = self
            .authorize(self.client.post(self.url("/api/evaluations")))
            .json(evaluation)
            .send()
            .await
            .map_err(|e| EvalSyncError::RemoteSubmissionFailed(format!("Network error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EvalSyncError::RemoteSubmissionFailed(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        Ok(())
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        debug!("GET {}", path);

        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .map_err(|e| EvalSyncError::RemoteApi(format!("Network error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(EvalSyncError::RemoteApi(format!(
                "GET {} failed with status {}: {}",
                path, status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| EvalSyncError::RemoteApi(format!("Failed to parse response: {}", e)))
    }
}
