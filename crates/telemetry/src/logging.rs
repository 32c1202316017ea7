//! Structured logging setup for the miner binary.

use crate::{TelemetryConfig, TelemetryError};
use tracing_subscriber::EnvFilter;

/// Handle kept alive for the process lifetime; dropping it has no effect,
/// it only documents that logging was initialized exactly once.
pub struct LoggingGuard(());

/// Initialize the global `tracing` subscriber.
///
/// Plain text by default; JSON when `config.json_logs` is set, for log
/// shippers that expect one record per line.
pub fn init_logging(config: &TelemetryConfig) -> Result<LoggingGuard, TelemetryError> {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let result = if config.json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    result.map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    Ok(LoggingGuard(()))
}
