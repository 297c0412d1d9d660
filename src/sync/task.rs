//! Handle for a long-running background loop
//!
//! Each loop gets a broadcast shutdown signal and is awaited on `stop`.
//! Dropping the handle signals shutdown without waiting.

use std::future::Future;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub struct TaskHandle {
    name: &'static str,
    shutdown_tx: broadcast::Sender<()>,
    task_handle: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Spawn `body`, handing it the shutdown receiver
    pub fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task_handle = tokio::spawn(body(shutdown_rx));
        tracing::debug!("{} task spawned", name);

        Self {
            name,
            shutdown_tx,
            task_handle: Some(task_handle),
        }
    }

    /// Signal shutdown and wait for the loop to exit
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.task_handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("{} task ended abnormally: {}", self.name, e);
            }
        }

        tracing::debug!("{} task stopped", self.name);
    }

    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
    }
}
