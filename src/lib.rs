//! Evalsync - Offline Evaluation Capture and Sync
//!
//! Staff score catalog products against category-specific criteria. When the
//! network drops, evaluations are kept in a local durable queue and pushed to
//! the evaluation API in the background once connectivity returns.
//!
//! # Architecture
//!
//! - **Types**: pending evaluations, cache entries, wire payloads
//! - **Storage**: `OfflineStore` trait with SQLite and in-memory backends
//! - **Services**: remote API client and cached catalog reads
//! - **Reports**: manager aggregates over evaluations read back from the API
//! - **Sync**: connectivity observer, single-flight sync engine, status
//!   surface and the submission entry point
//! - **Runtime**: explicit initialize/shutdown wiring of the above
//!
//! # Example
//!
//! ```ignore
//! use evalsync_core::{EvalSyncConfig, NewEvaluation, OfflineRuntime};
//!
//! #[tokio::main]
//! async fn main() -> evalsync_core::Result<()> {
//!     let runtime = OfflineRuntime::initialize(EvalSyncConfig::load(None)?).await?;
//!     runtime.start_background().await;
//!
//!     let outcome = runtime
//!         .submitter()
//!         .submit(NewEvaluation::new(7, "Store A").score(3, 4.0))
//!         .await?;
//!     println!("{:?}", outcome);
//!
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod reports;
pub mod runtime;
pub mod scoring;
pub mod services;
pub mod storage;
pub mod sync;
pub mod types;

// Re-export commonly used types
pub use config::EvalSyncConfig;
pub use error::{EvalSyncError, Result};
pub use reports::EvaluationReport;
pub use runtime::OfflineRuntime;
pub use services::{CatalogService, HttpRemoteApi, RemoteApi};
pub use storage::{InMemoryOfflineStore, OfflineStore, SqliteOfflineStore};
pub use sync::{
    ConnectivityObserver, ConnectivityProbe, EvaluationSubmitter, SubmissionOutcome, SyncEngine,
    SyncOutcome, SyncReport, SyncStatus, SyncStatusMonitor,
};
pub use types::{
    CacheEntry, Category, Criterion, EvaluationId, EvaluationRecord, NewEvaluation,
    PendingEvaluation, Product, RemoteEvaluation, ScoreEntry,
};
