//! Top-level miner configuration: the round engine's settings plus the
//! binary's own logging/metrics knobs, loaded from a single YAML file.

use round_engine::RoundEngineConfig;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors loading the miner's configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("could not read config file {path}: {reason}")]
    Io {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O error.
        reason: String,
    },

    /// The file's contents are not valid YAML for this shape.
    #[error("could not parse config file {path}: {reason}")]
    Parse {
        /// Path that was attempted.
        path: String,
        /// Underlying parse error.
        reason: String,
    },
}

/// Full configuration for the miner binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinerConfig {
    /// Settings consumed directly by the round engine.
    #[serde(flatten)]
    pub round_engine: RoundEngineConfig,

    /// Log level, overridable by `--log-level` on the command line.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Emit JSON-formatted logs instead of plain text.
    #[serde(default)]
    pub json_logs: bool,

    /// Address the Prometheus `/metrics` endpoint listens on. `None`
    /// disables it.
    #[serde(default = "default_metrics_addr")]
    pub metrics_addr: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_metrics_addr() -> Option<String> {
    Some("0.0.0.0:9100".to_string())
}

impl MinerConfig {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
