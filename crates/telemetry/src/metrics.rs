//! Prometheus metrics for the mining round engine.
//!
//! A background task subscribes to the shared event bus and folds
//! `MiningEvent`s into these metrics; `render()` returns the text exposition
//! format for a `/metrics` HTTP handler to serve.

use crate::TelemetryError;
use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use shared_bus::{EventFilter, InMemoryEventBus, MiningEvent};
use std::sync::Arc;

lazy_static! {
    static ref REGISTRY: Registry = Registry::new();
    /// Rounds fully processed (all plot directories read and verified).
    pub static ref ROUNDS_COMPLETED: IntCounter =
        IntCounter::new("poc_miner_rounds_completed_total", "Mining rounds completed").unwrap();
    /// Deadlines admitted as an account's best-found value.
    pub static ref DEADLINES_FOUND: IntCounter =
        IntCounter::new("poc_miner_deadlines_found_total", "Deadlines admitted by the arbiter").unwrap();
    /// Deadlines handed to the pool for submission.
    pub static ref DEADLINES_SUBMITTED: IntCounter =
        IntCounter::new("poc_miner_deadlines_submitted_total", "Deadlines submitted to the pool").unwrap();
    /// Deadlines the pool acknowledged.
    pub static ref DEADLINES_CONFIRMED: IntCounter =
        IntCounter::new("poc_miner_deadlines_confirmed_total", "Deadlines confirmed by the pool").unwrap();
    /// Submissions that exhausted their retry budget.
    pub static ref SUBMISSION_FAILURES: IntCounter =
        IntCounter::new("poc_miner_submission_failures_total", "Submissions that exhausted retries").unwrap();
    /// Consecutive pool poll failure bursts.
    pub static ref POLL_FAILURES: IntCounter =
        IntCounter::new("poc_miner_poll_failures_total", "Five-consecutive-failure poll bursts").unwrap();
    /// Current round's read completion fraction, 0-100.
    pub static ref READ_PROGRESS_PERCENT: IntGauge =
        IntGauge::new("poc_miner_read_progress_percent", "Current round read completion percentage").unwrap();
    /// Current round's verify completion fraction, 0-100.
    pub static ref VERIFY_PROGRESS_PERCENT: IntGauge =
        IntGauge::new("poc_miner_verify_progress_percent", "Current round verify completion percentage").unwrap();
    /// Current block height being mined.
    pub static ref CURRENT_HEIGHT: IntGauge =
        IntGauge::new("poc_miner_current_height", "Block height of the round in progress").unwrap();
}

/// Handle returned by [`register_metrics`]; keeping it alive keeps the
/// background bus subscriber task running.
pub struct MetricsHandle {
    _subscriber: tokio::task::JoinHandle<()>,
}

/// Register every metric with the global registry and spawn the task that
/// folds bus events into them.
pub fn register_metrics(bus: Arc<InMemoryEventBus>) -> Result<MetricsHandle, TelemetryError> {
    for metric in [
        Box::new(ROUNDS_COMPLETED.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(DEADLINES_FOUND.clone()),
        Box::new(DEADLINES_SUBMITTED.clone()),
        Box::new(DEADLINES_CONFIRMED.clone()),
        Box::new(SUBMISSION_FAILURES.clone()),
        Box::new(POLL_FAILURES.clone()),
        Box::new(READ_PROGRESS_PERCENT.clone()),
        Box::new(VERIFY_PROGRESS_PERCENT.clone()),
        Box::new(CURRENT_HEIGHT.clone()),
    ] {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    let subscriber = tokio::spawn(async move {
        let mut subscription = bus.subscribe(EventFilter::all());
        while let Some(event) = subscription.recv().await {
            apply(&event);
        }
    });

    Ok(MetricsHandle { _subscriber: subscriber })
}

fn apply(event: &MiningEvent) {
    match event {
        MiningEvent::RoundStarted { height, .. } => {
            CURRENT_HEIGHT.set(*height as i64);
            READ_PROGRESS_PERCENT.set(0);
            VERIFY_PROGRESS_PERCENT.set(0);
        }
        MiningEvent::DeadlineFound { .. } => DEADLINES_FOUND.inc(),
        MiningEvent::DeadlineSubmitted { .. } => DEADLINES_SUBMITTED.inc(),
        MiningEvent::DeadlineConfirmed { .. } => DEADLINES_CONFIRMED.inc(),
        MiningEvent::SubmissionFailed { .. } => SUBMISSION_FAILURES.inc(),
        MiningEvent::ProgressUpdated {
            read_fraction,
            verify_fraction,
            ..
        } => {
            READ_PROGRESS_PERCENT.set((read_fraction * 100.0) as i64);
            VERIFY_PROGRESS_PERCENT.set((verify_fraction * 100.0) as i64);
        }
        MiningEvent::RoundCompleted { .. } => ROUNDS_COMPLETED.inc(),
        MiningEvent::PollFailure { .. } => POLL_FAILURES.inc(),
        MiningEvent::DeadlineRejected { .. } | MiningEvent::BackendFallback { .. } => {}
    }
}

/// Render every registered metric in the Prometheus text exposition format.
pub fn render() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_round_started_resets_progress() {
        READ_PROGRESS_PERCENT.set(50);
        apply(&MiningEvent::RoundStarted {
            height: 42,
            effective_target: 0,
            read_notifications: 1,
        });
        assert_eq!(CURRENT_HEIGHT.get(), 42);
        assert_eq!(READ_PROGRESS_PERCENT.get(), 0);
    }

    #[test]
    fn test_apply_progress_updated_sets_percentages() {
        apply(&MiningEvent::ProgressUpdated {
            height: 1,
            read_fraction: 0.5,
            verify_fraction: 0.25,
            read_mib_per_s: 10.0,
            verify_mib_per_s: 5.0,
        });
        assert_eq!(READ_PROGRESS_PERCENT.get(), 50);
        assert_eq!(VERIFY_PROGRESS_PERCENT.get(), 25);
    }
}
