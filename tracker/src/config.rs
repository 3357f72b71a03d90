//! Tracker configuration
//!
//! Defaults, then an optional TOML file, then `TRACKER_*` environment
//! variables, then CLI flags. Deadline windows are fixed constants and are
//! not configurable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{TrackerError, TrackerResult};

/// Default engine poll interval
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Default tracing directive
pub const DEFAULT_LOG_FILTER: &str = "hygiene_tracker=info";

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// JSON document holding tickets and ledger rows
    pub store_path: PathBuf,

    /// Directory evidence photos are written to
    pub photo_dir: PathBuf,

    /// Seconds between engine passes
    pub poll_interval_secs: u64,

    /// Whether auto-accept and summon alerts are delivered
    pub alerts_enabled: bool,

    /// Tracing directive used when `RUST_LOG` is unset or empty
    pub log_filter: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("hygiene-store.json"),
            photo_dir: PathBuf::from("photos"),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            alerts_enabled: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl TrackerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env()
    }

    /// Apply `TRACKER_*` overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Load a TOML file; keys it omits keep their defaults
    pub fn from_toml_file(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| TrackerError::config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `TRACKER_*` overrides read through `lookup`
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(path) = lookup("TRACKER_STORE_PATH") {
            self.store_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("TRACKER_PHOTO_DIR") {
            self.photo_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("TRACKER_POLL_INTERVAL_SECS") {
            if let Ok(n) = secs.parse() {
                self.poll_interval_secs = n;
            }
        }
        if let Some(val) = lookup("TRACKER_ALERTS_ENABLED") {
            self.alerts_enabled = val.to_lowercase() == "true" || val == "1";
        }
        if let Some(filter) = lookup("TRACKER_LOG_FILTER") {
            self.log_filter = filter;
        }
        self
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if self.poll_interval_secs == 0 {
            return Err(TrackerError::config("poll_interval_secs must be at least 1"));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(TrackerError::config("store_path must not be empty"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Tracing directive to install: `rust_log` if set and non-empty,
    /// otherwise `log_filter`
    pub fn effective_log_filter(&self, rust_log: Option<String>) -> String {
        rust_log
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| self.log_filter.clone())
    }
}
