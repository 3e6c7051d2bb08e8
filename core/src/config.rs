use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_path_to_error as spte;
use thiserror::Error;

use crate::retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("config field '{path}': {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://sohamsharma21-hydronail-ml-api.hf.space/api".to_string(),
            token: None,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,
    pub channel_id: String,
    pub results: u32,
    pub poll_interval_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.thingspeak.com".to_string(),
            channel_id: "3187167".to_string(),
            results: 20,
            poll_interval_secs: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    pub inference: InferenceConfig,
    pub feed: FeedConfig,
    pub retry: RetryPolicy,
    pub settings_path: String,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            inference: InferenceConfig::default(),
            feed: FeedConfig::default(),
            retry: RetryPolicy::default(),
            settings_path: "plantwatch_settings.json".to_string(),
        }
    }
}

impl PlantConfig {
    /// Parses JSON; errors carry the path of the offending field (e.g. `feed.results`).
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let de = &mut serde_json::Deserializer::from_str(s);
        spte::deserialize(de).map_err(|e| ConfigError::Parse {
            path: e.path().to_string(),
            message: e.inner().to_string(),
        })
    }

    /// Reads `path`; a missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("config {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let cfg = Self::from_json_str(&contents)?;
        info!("config loaded from {}", path.display());
        Ok(cfg)
    }
}
