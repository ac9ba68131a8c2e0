//! Configuration for the batch translation client.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_PREPARING_MESSAGE: &str = "Preparing translation...";

/// Matches the lifetime the server gives a progress emitter (30 minutes).
const DEFAULT_TERMINAL_EVENT_TIMEOUT_SECS: u64 = 30 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Root of the translation server API, e.g. `http://localhost:8080/api`.
    pub base_url: String,
    /// Timeout for plain request/response calls (listing, delete, download).
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Deadline for a terminal push event per file. `None` waits forever.
    pub terminal_event_timeout_secs: Option<u64>,
    /// Shown as file progress between opening the channel and the first event.
    pub preparing_message: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            terminal_event_timeout_secs: Some(DEFAULT_TERMINAL_EVENT_TIMEOUT_SECS),
            preparing_message: DEFAULT_PREPARING_MESSAGE.to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn terminal_event_timeout(&self) -> Option<Duration> {
        self.terminal_event_timeout_secs.map(Duration::from_secs)
    }

    /// Load configuration from a YAML file
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Save configuration to a YAML file
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Picks the loader from the file extension; anything but `.json` is YAML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            let content = fs::read_to_string(path)?;
            Self::from_json(&content)
        } else {
            Self::from_yaml_file(path)
        }
    }
}
