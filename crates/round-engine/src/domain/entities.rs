//! Domain entities for the mining round engine itself: per-round
//! bookkeeping that does not belong on the shared [`shared_types`] data
//! model because it is specific to how a single engine instance schedules
//! and tracks its own round, not to the plot/deadline data model other
//! crates also need.

use serde::{Deserialize, Serialize};
use shared_types::{AccountId, Deadline, DeadlineStatus};
use std::collections::HashMap;

/// Per-account best-known deadlines for the block currently being mined.
///
/// Exactly one `BlockData` exists per height at a time; the round scheduler
/// replaces it wholesale when a new block arrives. Each account slot tracks
/// three deadlines independently, per the admission rule in
/// [`crate::domain::services::DeadlineArbiter::add_deadline`]: the best one
/// found so far, the best one handed to the submitter, and the best one the
/// pool has confirmed.
#[derive(Debug, Clone, Default)]
pub struct BlockData {
    /// Block height this data applies to.
    pub height: u64,
    best_found: HashMap<AccountId, Deadline>,
    best_sent: HashMap<AccountId, u64>,
    best_confirmed: HashMap<AccountId, u64>,
}

impl BlockData {
    /// Create an empty tracking table for `height`.
    pub fn new(height: u64) -> Self {
        Self {
            height,
            ..Self::default()
        }
    }

    /// Best deadline found so far for `account_id`, if any.
    pub fn best_found(&self, account_id: AccountId) -> Option<&Deadline> {
        self.best_found.get(&account_id)
    }

    /// Best deadline already sent to the pool for `account_id`, if any.
    pub fn best_sent(&self, account_id: AccountId) -> Option<u64> {
        self.best_sent.get(&account_id).copied()
    }

    /// Best deadline the pool has confirmed for `account_id`, if any.
    pub fn best_confirmed(&self, account_id: AccountId) -> Option<u64> {
        self.best_confirmed.get(&account_id).copied()
    }

    /// Record a newly found deadline as the account's best, overwriting
    /// whatever was there. Caller is responsible for having already checked
    /// it's actually an improvement.
    pub fn record_found(&mut self, deadline: Deadline) {
        self.best_found.insert(deadline.account_id, deadline);
    }

    /// Record that `account_id`'s deadline has been sent to the pool.
    pub fn record_sent(&mut self, account_id: AccountId, value: u64) {
        self.best_sent.insert(account_id, value);
    }

    /// Record that the pool confirmed `value` for `account_id`.
    pub fn record_confirmed(&mut self, account_id: AccountId, value: u64) {
        self.best_confirmed.insert(account_id, value);
    }

    /// Number of distinct accounts with at least one found deadline.
    pub fn accounts_with_deadlines(&self) -> usize {
        self.best_found.len()
    }

    /// The single best (lowest) deadline found across all accounts this
    /// round, used for the `RoundCompleted` summary event.
    pub fn overall_best(&self) -> Option<u64> {
        self.best_found.values().map(|d| d.value).min()
    }
}

/// Snapshot of a completed or in-progress verification result for one
/// plot-file scoop read, passed from the reader pool to the verifier pool.
#[derive(Debug, Clone)]
pub struct ReadBuffer {
    /// Plot file the bytes came from.
    pub plot_path: std::path::PathBuf,
    /// Account the plot file belongs to.
    pub account_id: AccountId,
    /// Index of the first nonce in this buffer.
    pub start_nonce: u64,
    /// Number of nonces covered by this buffer.
    pub nonce_count: u64,
    /// Raw scoop bytes, `nonce_count * SCOOP_SIZE` long.
    pub scoop_data: Vec<u8>,
    /// Height the read was scheduled for; used to discard stale buffers
    /// if a new block arrived mid-read.
    pub height: u64,
}

impl ReadBuffer {
    /// Size of this buffer in bytes, for memory-budget accounting.
    pub fn size_bytes(&self) -> usize {
        self.scoop_data.len()
    }
}

/// Outcome the deadline arbiter returns from an admission attempt, reused
/// by the progress sink to decide what event to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionOutcome {
    /// Admitted as the account's new best-found deadline.
    Admitted {
        /// New best-found deadline value in seconds.
        deadline: u64,
        /// Lifecycle status assigned (`Found` or `TooHigh`).
        status: DeadlineStatus,
    },
    /// Rejected: not an improvement over what's already on record, or the
    /// candidate's height doesn't match the current round.
    Rejected(RejectionReason),
}

/// Why a candidate deadline was rejected by the arbiter.
///
/// A height mismatch is not a member of this enum: the arbiter treats that
/// as an exceptional condition and reports it as `NonceConfirmation::WrongBlock`
/// instead of an ordinary rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// Not lower than the account's already-recorded best-found deadline.
    NotAnImprovement,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::DeadlineStatus;
    use std::path::PathBuf;

    fn sample_deadline(account_id: AccountId, value: u64) -> Deadline {
        Deadline {
            nonce: 1,
            value,
            account_id,
            height: 100,
            plot_path: PathBuf::from("/plots/1_100_PoC2"),
            worker_label: "cpu-0".to_string(),
            status: DeadlineStatus::Found,
        }
    }

    #[test]
    fn test_block_data_tracks_best_per_account() {
        let mut data = BlockData::new(100);
        data.record_found(sample_deadline(1, 500));
        data.record_found(sample_deadline(2, 100));

        assert_eq!(data.best_found(1).unwrap().value, 500);
        assert_eq!(data.overall_best(), Some(100));
        assert_eq!(data.accounts_with_deadlines(), 2);
    }

    #[test]
    fn test_block_data_lifecycle_tracking() {
        let mut data = BlockData::new(100);
        data.record_found(sample_deadline(1, 500));
        data.record_sent(1, 500);
        data.record_confirmed(1, 500);

        assert_eq!(data.best_sent(1), Some(500));
        assert_eq!(data.best_confirmed(1), Some(500));
        assert_eq!(data.best_sent(2), None);
    }

    #[test]
    fn test_empty_block_data_has_no_best() {
        let data = BlockData::new(1);
        assert_eq!(data.overall_best(), None);
    }
}
