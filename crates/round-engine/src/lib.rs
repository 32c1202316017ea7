//! # Mining Round Engine
//!
//! Drives one mining round at a time: polls a pool for the current mining
//! info, schedules plot-file reads under a bounded memory budget, verifies
//! scoop data on CPU/GPU backends, tracks the best deadline found per
//! account for the current block, and submits qualifying deadlines to the
//! pool exactly once.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      MiningRoundEngine                        │
//! │  (service.rs - RoundEngineService)                            │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Pool poll loop ──▶ DeadlineArbiter ◀── Reader pool           │
//! │       │                   │                  │                │
//! │       ▼                   ▼                  ▼                │
//! │  TargetDeadlinePolicy   Submitter       Verifier pool          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The domain layer (`domain`) holds the round bookkeeping and admission
//! rules and has no knowledge of HTTP, the filesystem, or threads. The
//! ports layer (`ports`) defines the seams `service.rs` wires real
//! adapters into. `adapters` holds the concrete pool client, plot reader,
//! submitter, and progress sink.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

/// Concrete adapters: HTTP pool client/submitter, filesystem plot reader,
/// event-bus progress sink.
pub mod adapters;
/// Domain models and round-admission business logic.
pub mod domain;
/// Ports: inbound (driving) and outbound (driven) trait seams.
pub mod ports;

mod config;
mod error;
mod metrics;
mod service;

pub use config::{CpuInstructionSet, PlotDirConfig, ProcessorType, RoundEngineConfig, SchedulingHintConfig};
pub use error::{Result, RoundEngineError};
pub use metrics::RoundMetrics;
pub use service::RoundEngineService;

pub use domain::{AdmissionOutcome, BlockData, DeadlineArbiter, ReadBuffer, RejectionReason, TargetDeadlinePolicy};
pub use ports::{BudgetedReadBuffer, EngineStatus, MiningInfo, MiningRoundEngine, PlotReader, PoolClient, ProgressSink, Submitter};

/// Default shared memory budget for in-flight read buffers, 256 MiB.
pub const DEFAULT_MAX_BUFFER_SIZE_BYTES: usize = 256 * 1024 * 1024;

/// Default height at which PoC2 (scoop-major) plot layout activates.
///
/// Chosen to match Signum/Burstcoin mainnet's PoC2 activation height; a
/// fresh deployment on a different chain overrides this in config.
pub const DEFAULT_POC2_START_BLOCK: u64 = 502_000;

/// Default polling interval for mining info, in milliseconds.
pub const DEFAULT_MINING_INFO_INTERVAL_MS: u64 = 3_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_buffer_budget_is_256_mib() {
        assert_eq!(DEFAULT_MAX_BUFFER_SIZE_BYTES, 256 * 1024 * 1024);
    }

    #[test]
    fn test_default_poc2_start_block() {
        assert_eq!(DEFAULT_POC2_START_BLOCK, 502_000);
    }
}
