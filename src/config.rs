//! Configuration for the evalsync offline subsystem
//!
//! Layers, lowest priority first:
//! - built-in defaults
//! - optional TOML file (`~/.config/evalsync/config.toml` unless overridden)
//! - `EVALSYNC_*` environment variables (e.g. `EVALSYNC_API_BASE_URL`)

use crate::error::{EvalSyncError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix
const ENV_PREFIX: &str = "EVALSYNC";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalSyncConfig {
    /// SQLite file backing the offline store
    pub db_path: PathBuf,

    /// Base URL of the evaluation API (no trailing slash needed)
    pub api_base_url: String,

    /// Bearer token minted by the session authority
    pub auth_token: Option<String>,

    /// Reachability probe target; defaults to `{api_base_url}/api/test`
    pub health_url: Option<String>,

    /// Auto-sync tick interval
    pub sync_interval_secs: u64,

    /// Status surface refresh interval
    pub status_refresh_secs: u64,

    /// Reachability probe interval
    pub probe_interval_secs: u64,

    /// TTL for cached catalog responses
    pub cache_ttl_secs: u64,

    /// Per-request HTTP timeout
    pub http_timeout_secs: u64,
}

impl Default for EvalSyncConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            api_base_url: "http://localhost:3000".to_string(),
            auth_token: None,
            health_url: None,
            sync_interval_secs: 30,
            status_refresh_secs: 5,
            probe_interval_secs: 15,
            cache_ttl_secs: 3600,
            http_timeout_secs: 30,
        }
    }
}

/// Default database path using the XDG data dir
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("evalsync")
        .join("offline.db")
}

/// Default config file path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("evalsync")
        .join("config.toml")
}

impl EvalSyncConfig {
    /// Load configuration from defaults, an optional file, and the environment
    ///
    /// A missing file is not an error; a malformed one is.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let path = file
            .map(Path::to_path_buf)
            .unwrap_or_else(default_config_path);
        debug!("Loading configuration (file: {})", path.display());

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would stall the background loops
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("sync_interval_secs", self.sync_interval_secs),
            ("status_refresh_secs", self.status_refresh_secs),
            ("probe_interval_secs", self.probe_interval_secs),
            ("http_timeout_secs", self.http_timeout_secs),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(EvalSyncError::Config(config::ConfigError::Message(format!(
                    "{} must be greater than zero",
                    name
                ))));
            }
        }

        if self.api_base_url.trim().is_empty() {
            return Err(EvalSyncError::Config(config::ConfigError::Message(
                "api_base_url cannot be empty".to_string(),
            )));
        }

        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn status_refresh(&self) -> Duration {
        Duration::from_secs(self.status_refresh_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// URL polled by the reachability probe
    pub fn resolved_health_url(&self) -> String {
        self.health_url
            .clone()
            .unwrap_or_else(|| format!("{}/api/test", self.api_base_url.trim_end_matches('/')))
    }
}
