//! Offline capture and background sync
//!
//! - `connectivity`: latest-value online/offline belief and reachability probe
//! - `engine`: single-flight pass over the pending queue, plus auto-sync timer
//! - `status`: periodically refreshed pending-count/online projection
//! - `submit`: routes new evaluations to the API or the queue

pub mod connectivity;
pub mod engine;
pub mod status;
pub mod submit;
pub mod task;

pub use connectivity::{ConnectivityObserver, ConnectivityProbe};
pub use engine::{SyncEngine, SyncOutcome, SyncReport, DEFAULT_SYNC_INTERVAL};
pub use status::{SyncStatus, SyncStatusMonitor, DEFAULT_STATUS_REFRESH};
pub use submit::{EvaluationSubmitter, SubmissionOutcome};
pub use task::TaskHandle;
