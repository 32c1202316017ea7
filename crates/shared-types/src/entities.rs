//! # Domain Entities
//!
//! Core data model shared between the round engine, the verifier backends,
//! and the mining binary: the challenge issued by a block, the plot files
//! registered against it, and the deadlines computed from scanning them.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Plot-file layout version. Which one is active at a given height is
/// resolved from the configured activation height (`poc2_start_block`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PocVersion {
    /// Original layout: nonce-major, each nonce's 4096 scoops are contiguous.
    PoC1,
    /// Revised layout: scoop-major, each scoop's nonces are contiguous.
    PoC2,
}

impl PocVersion {
    /// Resolve the layout version in effect at `height` given the configured
    /// PoC2 activation height.
    pub fn at_height(height: u64, poc2_start_block: u64) -> Self {
        if height >= poc2_start_block {
            PocVersion::PoC2
        } else {
            PocVersion::PoC1
        }
    }
}

/// Number of scoops per nonce; scoop indices range over `[0, SCOOPS_PER_NONCE)`.
pub const SCOOPS_PER_NONCE: u32 = 4096;

/// Size in bytes of a single scoop slice for one nonce.
pub const SCOOP_SIZE: usize = 64;

/// The per-block challenge every plot file is scanned against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Monotonic block height.
    pub height: u64,
    /// Difficulty-inverse scalar used to scale hash output into a deadline.
    pub base_target: u64,
    /// 32-byte generation signature identifying this challenge.
    pub generation_signature: [u8; 32],
    /// Scoop index in `[0, 4096)`, derived from `generation_signature` and `height`.
    pub scoop: u32,
    /// Target deadline in seconds advertised by the pool for this block (0 = none).
    pub pool_target_deadline: u64,
}

impl Challenge {
    /// Derive the scoop index for `(generation_signature, height)`.
    ///
    /// Scoop selection and scoop-content hashing are independent
    /// constructions; this only needs to be deterministic and
    /// well-distributed over `[0, SCOOPS_PER_NONCE)`.
    pub fn derive_scoop(generation_signature: &[u8; 32], height: u64) -> u32 {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(generation_signature);
        hasher.update(height.to_be_bytes());
        let digest = hasher.finalize();
        let mut last_eight = [0u8; 8];
        last_eight.copy_from_slice(&digest[digest.len() - 8..]);
        (u64::from_be_bytes(last_eight) % SCOOPS_PER_NONCE as u64) as u32
    }

    /// Build a challenge from raw mining-info fields, deriving the scoop.
    pub fn new(
        height: u64,
        base_target: u64,
        generation_signature: [u8; 32],
        pool_target_deadline: u64,
    ) -> Self {
        let scoop = Self::derive_scoop(&generation_signature, height);
        Self {
            height,
            base_target,
            generation_signature,
            scoop,
            pool_target_deadline,
        }
    }
}

/// An account id as used by the currency (the plot-file owner).
pub type AccountId = u64;

/// An immutable registration of a single plot file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotFile {
    /// Path to the plot file.
    pub path: PathBuf,
    /// Account id the plot was generated for.
    pub account_id: AccountId,
    /// Number of nonces stored in the file.
    pub nonce_count: u64,
    /// Size of the file on disk in bytes.
    pub size_bytes: u64,
    /// Layout version this file was generated in.
    pub format_version: PocVersion,
}

impl PlotFile {
    /// Byte offset of the 64-byte scoop slice for `nonce_index` at `scoop`,
    /// given this file's layout version and nonce count.
    pub fn scoop_offset(&self, nonce_index: u64, scoop: u32) -> u64 {
        match self.format_version {
            PocVersion::PoC1 => {
                nonce_index * (SCOOPS_PER_NONCE as u64) * (SCOOP_SIZE as u64)
                    + (scoop as u64) * (SCOOP_SIZE as u64)
            }
            PocVersion::PoC2 => {
                (scoop as u64) * self.nonce_count * (SCOOP_SIZE as u64)
                    + nonce_index * (SCOOP_SIZE as u64)
            }
        }
    }
}

/// Scheduling hint for a directory of plot files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulingHint {
    /// Files are read one at a time, in order.
    Sequential,
    /// Each file is an independent work item, read concurrently.
    Parallel,
}

/// A directory of plot files plus optional related directories, carrying a
/// scheduling hint for the round scheduler.
#[derive(Debug, Clone)]
pub struct PlotDir {
    /// Plot files directly registered in this directory.
    pub files: Vec<PlotFile>,
    /// Additional directories whose files are scanned together with this one
    /// when `hint` is `Sequential`.
    pub related: Vec<PathBuf>,
    /// How the reader pool should schedule this directory's files.
    pub hint: SchedulingHint,
}

impl PlotDir {
    /// Total physical size in bytes of every file registered under this directory.
    pub fn total_size_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }
}

/// Lifecycle stage of a `Deadline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeadlineStatus {
    /// Computed and installed as the account's best-found value for this block.
    Found,
    /// Found, but above the effective target; suppressed from submission.
    TooHigh,
    /// Transmitted to the pool.
    Sent,
    /// Acknowledged by the pool.
    Confirmed,
}

/// A computed deadline candidate, as produced by a verifier backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadline {
    /// The nonce this deadline was computed for.
    pub nonce: u64,
    /// Deadline value in seconds; lower is better.
    pub value: u64,
    /// Account id that owns the plot file this nonce came from.
    pub account_id: AccountId,
    /// Block height this deadline was computed against.
    pub height: u64,
    /// Path of the plot file the nonce was read from.
    pub plot_path: PathBuf,
    /// Label identifying which worker/backend produced this value.
    pub worker_label: String,
    /// Current lifecycle stage.
    pub status: DeadlineStatus,
}

/// Rejection reasons surfaced by the deadline arbiter. Never an error: these
/// describe ordinary admission outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NonceConfirmation {
    /// The candidate's height did not match the current block height.
    WrongBlock {
        /// Height the candidate carried.
        candidate_height: u64,
        /// The current height at arbitration time.
        current_height: u64,
    },
    /// The candidate was admitted as best-found but exceeds the effective target.
    TooHigh {
        /// The computed deadline value.
        deadline: u64,
        /// The effective target it was measured against.
        target: u64,
    },
    /// The submission failed for a reason other than the above.
    Error(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poc_version_activation() {
        assert_eq!(PocVersion::at_height(99, 100), PocVersion::PoC1);
        assert_eq!(PocVersion::at_height(100, 100), PocVersion::PoC2);
    }

    #[test]
    fn scoop_derivation_is_deterministic() {
        let gensig = [7u8; 32];
        let a = Challenge::derive_scoop(&gensig, 12345);
        let b = Challenge::derive_scoop(&gensig, 12345);
        assert_eq!(a, b);
        assert!(a < SCOOPS_PER_NONCE);
    }

    #[test]
    fn scoop_derivation_varies_with_height() {
        let gensig = [7u8; 32];
        let a = Challenge::derive_scoop(&gensig, 1);
        let b = Challenge::derive_scoop(&gensig, 2);
        assert_ne!(a, b, "extremely unlikely collision for adjacent heights");
    }

    #[test]
    fn poc1_offset_is_nonce_major() {
        let plot = PlotFile {
            path: PathBuf::from("/plots/test"),
            account_id: 1,
            nonce_count: 10,
            size_bytes: 10 * SCOOPS_PER_NONCE as u64 * SCOOP_SIZE as u64,
            format_version: PocVersion::PoC1,
        };
        let a = plot.scoop_offset(0, 5);
        let b = plot.scoop_offset(1, 5);
        assert_eq!(b - a, SCOOPS_PER_NONCE as u64 * SCOOP_SIZE as u64);
    }

    #[test]
    fn poc2_offset_is_scoop_major() {
        let plot = PlotFile {
            path: PathBuf::from("/plots/test"),
            account_id: 1,
            nonce_count: 10,
            size_bytes: 10 * SCOOPS_PER_NONCE as u64 * SCOOP_SIZE as u64,
            format_version: PocVersion::PoC2,
        };
        let a = plot.scoop_offset(0, 5);
        let b = plot.scoop_offset(1, 5);
        assert_eq!(b - a, SCOOP_SIZE as u64);
    }

    #[test]
    fn plot_dir_total_size() {
        let dir = PlotDir {
            files: vec![
                PlotFile {
                    path: PathBuf::from("a"),
                    account_id: 1,
                    nonce_count: 1,
                    size_bytes: 100,
                    format_version: PocVersion::PoC2,
                },
                PlotFile {
                    path: PathBuf::from("b"),
                    account_id: 1,
                    nonce_count: 1,
                    size_bytes: 200,
                    format_version: PocVersion::PoC2,
                },
            ],
            related: vec![],
            hint: SchedulingHint::Parallel,
        };
        assert_eq!(dir.total_size_bytes(), 300);
    }
}
