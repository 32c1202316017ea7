//! Outbound ports (driven side - SPI): everything the round engine calls
//! out to, so the adapters (HTTP pool client, filesystem plot reader,
//! event-bus progress sink) can be swapped independently of the domain
//! and service layers.

use crate::domain::ReadBuffer;
use crate::error::Result;
use async_trait::async_trait;
use shared_types::{AccountId, Deadline, PlotDir};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Mining info as reported by the pool, polled by [`PoolClient::poll`].
#[derive(Clone, Debug, PartialEq)]
pub struct MiningInfo {
    /// Current block height.
    pub height: u64,
    /// Current base target.
    pub base_target: u64,
    /// 32-byte generation signature for the current challenge.
    pub generation_signature: [u8; 32],
    /// Pool-advertised target deadline ceiling; 0 means unbounded.
    pub pool_target_deadline: u64,
}

/// Port: poll the pool for the current mining info, with URL failover.
#[async_trait]
pub trait PoolClient: Send + Sync {
    /// Poll the primary URL, falling over to alternates on transient
    /// failure, and return the pool's current mining info. The caller is
    /// responsible for comparing `height` against the last height it
    /// observed to decide whether a new round should start; an unchanged
    /// height is an ordinary, successful poll, not a distinct case.
    async fn poll(&self) -> Result<MiningInfo>;
}

/// Port: submit an admitted deadline to the pool.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Submit `deadline` on behalf of `account_id` at `height`, using the
    /// account's plot-file secret. Retries transient failures with bounded
    /// backoff internally; returns once the pool confirms or the retry
    /// budget is exhausted.
    async fn submit(&self, account_id: AccountId, height: u64, deadline: &Deadline) -> Result<()>;
}

/// A [`ReadBuffer`] paired with the memory-budget permit that accounts for
/// its bytes. The permit is acquired before the chunk is allocated and
/// released only when this value is dropped, so a buffer's bytes count
/// against the budget for as long as it is actually in flight, through
/// queueing and verification.
pub struct BudgetedReadBuffer {
    /// The chunk itself.
    pub buffer: ReadBuffer,
    _permit: OwnedSemaphorePermit,
}

impl BudgetedReadBuffer {
    /// Pair a buffer with the permit accounting for its memory.
    pub fn new(buffer: ReadBuffer, permit: OwnedSemaphorePermit) -> Self {
        Self { buffer, _permit: permit }
    }
}

/// Port: read plot-file bytes for a scheduled scoop.
#[async_trait]
pub trait PlotReader: Send + Sync {
    /// Read the scoop for `scoop_index` from every file in `plot_dir`,
    /// chunked to fit the shared memory budget, emitting one
    /// [`BudgetedReadBuffer`] per chunk via `on_chunk`. `height` tags every
    /// emitted buffer. `current_height` is consulted at each chunk
    /// boundary; if it has advanced past `height`, the remainder of the
    /// current file is abandoned rather than read to completion.
    ///
    /// `memory_budget` gates every chunk allocation: a permit covering the
    /// chunk's byte size is acquired before the chunk is read, so the sum
    /// of in-flight chunk bytes across every concurrent call to this method
    /// never exceeds the budget the semaphore was built with.
    async fn read_scoop(
        &self,
        plot_dir: &PlotDir,
        scoop_index: u32,
        height: u64,
        current_height: &AtomicU64,
        memory_budget: &Arc<Semaphore>,
        on_chunk: Box<dyn FnMut(BudgetedReadBuffer) + Send>,
    ) -> Result<()>;
}

/// Port: observe round/deadline/progress lifecycle events.
///
/// Implemented by an adapter over [`shared_bus::InMemoryEventBus`] in the
/// default wiring; a test double can instead collect events in memory.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Publish an event. Never fails: a progress sink with no subscribers
    /// is a normal, silent no-op.
    async fn publish(&self, event: shared_bus::MiningEvent);
}
