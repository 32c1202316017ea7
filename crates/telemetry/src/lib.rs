//! # Telemetry
//!
//! Logging and metrics for the mining binary: a `tracing` subscriber over
//! stdout (plain text or JSON) and a Prometheus registry fed by subscribing
//! to the round engine's event bus.
//!
//! ```rust,ignore
//! use telemetry::{init_telemetry, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(config, bus)?;
//! // logging and metrics are now active; render() serves /metrics
//! ```

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::LoggingGuard;
pub use metrics::{render, MetricsHandle};

use std::sync::Arc;
use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The `tracing` subscriber could not be installed.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A metric could not be registered with the Prometheus registry.
    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics. Returns a guard that must be held for
/// the lifetime of the process; dropping it stops the metrics subscriber.
pub fn init_telemetry(
    config: TelemetryConfig,
    bus: Arc<shared_bus::InMemoryEventBus>,
) -> Result<TelemetryGuard, TelemetryError> {
    let logging = logging::init_logging(&config)?;
    let metrics = metrics::register_metrics(bus)?;
    Ok(TelemetryGuard {
        _logging: logging,
        _metrics: metrics,
    })
}

/// Guard returned by [`init_telemetry`]. Keep it alive for the process's
/// lifetime.
pub struct TelemetryGuard {
    _logging: LoggingGuard,
    _metrics: MetricsHandle,
}
