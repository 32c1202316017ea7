//! Inbound ports (driving side - API): the surface the mining binary
//! drives the round engine through.

use crate::error::Result;
use async_trait::async_trait;

/// Primary port: the mining round engine.
///
/// `run` blocks the calling task until `stop` is called or a critical
/// startup failure occurs; the remaining methods are safe to call
/// concurrently from another task while `run` is in progress, and take
/// effect at the next notification boundary rather than preempting
/// in-flight work.
#[async_trait]
pub trait MiningRoundEngine: Send + Sync {
    /// Run the engine: poll for blocks, schedule rounds, and submit
    /// qualifying deadlines until stopped. Returns once `stop()` has fully
    /// torn down the reader/verifier pools and joined their threads.
    async fn run(&self) -> Result<()>;

    /// Stop the engine: wake both work queues, cancel outstanding tasks,
    /// join worker threads, and tear down the pools.
    async fn stop(&self) -> Result<()>;

    /// Set the restart flag and stop; an outer supervisor is expected to
    /// detect the flag and call `run` again.
    async fn restart(&self) -> Result<()>;

    /// Change the verifier pool size. Takes effect for the next round.
    async fn set_mining_intensity(&self, intensity: usize) -> Result<()>;

    /// Change the reader pool size. Takes effect for the next round.
    async fn set_max_plot_reader(&self, max_readers: usize) -> Result<()>;

    /// Change the shared memory budget in bytes. Takes effect immediately
    /// for new allocations; outstanding buffers are not recalled.
    async fn set_max_buffer_size(&self, max_bytes: usize) -> Result<()>;

    /// Re-scan all configured plot directories for added or removed files.
    async fn rescan_plotfiles(&self) -> Result<()>;

    /// Current engine status, for a supervisor or CLI status command.
    async fn status(&self) -> EngineStatus;
}

/// Point-in-time status snapshot of the engine.
#[derive(Clone, Debug, Default)]
pub struct EngineStatus {
    /// Whether `run` is currently active.
    pub running: bool,
    /// Current block height, if a round has started.
    pub current_height: Option<u64>,
    /// Read-progress fraction for the in-progress round, 0.0 - 1.0.
    pub read_fraction: f64,
    /// Verify-progress fraction for the in-progress round, 0.0 - 1.0.
    pub verify_fraction: f64,
    /// Best deadline found so far this round, across all accounts.
    pub best_deadline_this_round: Option<u64>,
}
