use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use waxtaan_core::CoreConfig;

/// CLI configuration that can be loaded from a JSON file.
/// Anything left unset falls back to the environment.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_secs: Option<u64>,
}

impl CliConfig {
    /// Load config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: CliConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Overlay the values that are set onto `base`
    pub fn apply(&self, mut base: CoreConfig) -> CoreConfig {
        if let Some(url) = &self.api_url {
            base.api_base_url = url.clone();
        }
        if let Some(dir) = &self.data_dir {
            base.data_dir = dir.clone();
        }
        if let Some(secs) = self.poll_interval_secs.filter(|s| *s > 0) {
            base.poll_interval = Duration::from_secs(secs);
        }
        base
    }
}
