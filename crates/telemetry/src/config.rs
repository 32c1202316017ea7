//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for the miner's logging and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line.
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error).
    pub log_level: String,

    /// Whether to emit JSON-formatted logs instead of human-readable ones.
    pub json_logs: bool,

    /// Address the Prometheus metrics endpoint listens on, if enabled.
    pub metrics_addr: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "poc-miner".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            metrics_addr: Some("0.0.0.0:9100".to_string()),
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `POC_MINER_LOG_LEVEL` or `RUST_LOG`: log level (default: info)
    /// - `POC_MINER_JSON_LOGS`: emit JSON logs (default: false)
    /// - `POC_MINER_METRICS_ADDR`: Prometheus listen address, empty disables it
    pub fn from_env() -> Self {
        Self {
            service_name: "poc-miner".to_string(),

            log_level: env::var("POC_MINER_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("POC_MINER_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(false),

            metrics_addr: match env::var("POC_MINER_METRICS_ADDR") {
                Ok(v) if v.is_empty() => None,
                Ok(v) => Some(v),
                Err(_) => Some("0.0.0.0:9100".to_string()),
            },
        }
    }
}
