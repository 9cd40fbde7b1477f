use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{APP_DIR_NAME, DEFAULT_API_BASE_URL, DEFAULT_POLL_INTERVAL_SECS};

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the REST API, without the `/api` suffix
    pub api_base_url: String,
    /// Where local storage (token) lives
    pub data_dir: PathBuf,
    /// Period of the reconciliation timer
    pub poll_interval: Duration,
}

impl CoreConfig {
    pub fn new<P: AsRef<Path>>(api_base_url: impl Into<String>, data_dir: P) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            data_dir: data_dir.as_ref().to_path_buf(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let api_base_url = std::env::var("WAXTAAN_API_BASE_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        let data_dir = std::env::var("WAXTAAN_DATA_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let poll_interval = Duration::from_secs(
            std::env::var("WAXTAAN_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        );

        Self {
            api_base_url,
            data_dir,
            poll_interval,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!("{}_data", APP_DIR_NAME)))
}
