//! Domain services for the mining round engine: the deadline arbiter, the
//! target-deadline policy, and the round scheduler's pure decision logic.
//!
//! Everything here is synchronous and side-effect free except for logging;
//! the async plumbing (locking, enqueueing, HTTP calls) lives in
//! [`crate::service`] and the adapters.

use super::entities::{AdmissionOutcome, BlockData, RejectionReason};
use shared_types::{AccountId, Deadline, DeadlineStatus, NonceConfirmation};
use std::sync::Mutex;

/// Difficulty constant from the currency's genesis parameters: the base
/// target at which average time-to-forge across the whole network is ten
/// minutes. Used to derive the dynamic local target deadline.
const NETWORK_DIFFICULTY_CONSTANT: u64 = 18_325_193_796;

/// Computes the effective target deadline for a round from the three
/// possible ceilings described in the admission rules: a user-configured
/// ceiling, a pool-advertised ceiling, and (when submit probability is
/// configured) a dynamic ceiling derived from difficulty and plot size.
#[derive(Debug, Clone, Copy)]
pub struct TargetDeadlinePolicy {
    configured_ceiling: u64,
    target_deadline_factor: f64,
    submit_probability: f64,
}

impl TargetDeadlinePolicy {
    /// Build a policy from the round engine's static configuration.
    pub fn new(configured_ceiling: u64, target_deadline_factor: f64, submit_probability: f64) -> Self {
        Self {
            configured_ceiling,
            target_deadline_factor,
            submit_probability,
        }
    }

    /// Compute the effective target deadline for a round, given the pool's
    /// advertised ceiling, the block's base target, and the total plot
    /// size under management in bytes. Returns 0 ("accept any deadline")
    /// when no ceiling applies.
    pub fn effective_target(&self, base_target: u64, pool_target_deadline: u64, total_plot_bytes: u64) -> u64 {
        let mut candidates = Vec::with_capacity(3);

        if self.configured_ceiling > 0 {
            candidates.push(self.configured_ceiling);
        }
        if pool_target_deadline > 0 {
            candidates.push(pool_target_deadline);
        }
        if self.submit_probability > 0.0 {
            if let Some(dynamic) = self.dynamic_ceiling(base_target, total_plot_bytes) {
                candidates.push(dynamic);
            }
        }

        candidates.into_iter().min().unwrap_or(0)
    }

    fn dynamic_ceiling(&self, base_target: u64, total_plot_bytes: u64) -> Option<u64> {
        if base_target == 0 || total_plot_bytes == 0 {
            return None;
        }
        const BYTES_PER_TIB: f64 = 1024.0 * 1024.0 * 1024.0 * 1024.0;
        let difficulty = NETWORK_DIFFICULTY_CONSTANT as f64 / base_target as f64;
        let size_tib = total_plot_bytes as f64 / BYTES_PER_TIB;
        if size_tib <= 0.0 {
            return None;
        }
        let target = self.target_deadline_factor * difficulty / size_tib;
        Some(target.round() as u64)
    }
}

/// Admits or rejects candidate deadlines for the current round, one block
/// at a time. Single-writer per (account, block) by construction: all
/// mutation goes through [`DeadlineArbiter::add_deadline`], which holds an
/// internal lock for the duration of the compare-and-install step.
pub struct DeadlineArbiter {
    current: Mutex<Option<CurrentRound>>,
}

struct CurrentRound {
    height: u64,
    effective_target: u64,
    block_data: BlockData,
}

impl DeadlineArbiter {
    /// Create an arbiter with no current round.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Start a new round: installs a fresh, empty `BlockData` and becomes
    /// the sole writer for `height` going forward. Called exactly once per
    /// block by the round scheduler.
    pub fn start_round(&self, height: u64, effective_target: u64) {
        let mut guard = self.current.lock().expect("deadline arbiter mutex poisoned");
        *guard = Some(CurrentRound {
            height,
            effective_target,
            block_data: BlockData::new(height),
        });
    }

    /// Current round height, if a round is active.
    pub fn current_height(&self) -> Option<u64> {
        self.current
            .lock()
            .expect("deadline arbiter mutex poisoned")
            .as_ref()
            .map(|r| r.height)
    }

    /// Best deadline found so far across all accounts in the current
    /// round, for the round-completion summary.
    pub fn overall_best(&self) -> Option<u64> {
        self.current
            .lock()
            .expect("deadline arbiter mutex poisoned")
            .as_ref()
            .and_then(|r| r.block_data.overall_best())
    }

    /// Apply the six-step admission rule to a candidate deadline.
    ///
    /// Rule, in order:
    /// 1. Wrong block height: reject.
    /// 2. No current round: reject.
    /// 3. Not strictly better than the account's best-found: silently drop.
    /// 4. Otherwise install as the account's new best-found.
    /// 5. If over the effective target, mark found-but-suppressed and
    ///    report `TooHigh`, without returning a submission handle.
    /// 6. Otherwise return a submission handle.
    pub fn add_deadline(&self, candidate: Deadline) -> Result<AdmissionOutcome, NonceConfirmation> {
        let mut guard = self.current.lock().expect("deadline arbiter mutex poisoned");

        let round = match guard.as_mut() {
            Some(round) => round,
            None => {
                return Err(NonceConfirmation::Error("No block data".to_string()));
            }
        };

        if candidate.height != round.height {
            return Err(NonceConfirmation::WrongBlock {
                candidate_height: candidate.height,
                current_height: round.height,
            });
        }

        if let Some(existing) = round.block_data.best_found(candidate.account_id) {
            if candidate.value >= existing.value {
                return Ok(AdmissionOutcome::Rejected(RejectionReason::NotAnImprovement));
            }
        }

        let account_id = candidate.account_id;
        let value = candidate.value;
        round.block_data.record_found(Deadline {
            status: DeadlineStatus::Found,
            ..candidate
        });

        let too_high = round.effective_target > 0 && value > round.effective_target;
        if too_high {
            return Ok(AdmissionOutcome::Admitted {
                deadline: value,
                status: DeadlineStatus::TooHigh,
            });
        }

        let _ = account_id;
        Ok(AdmissionOutcome::Admitted {
            deadline: value,
            status: DeadlineStatus::Found,
        })
    }

    /// Record that `account_id`'s deadline was handed to the submitter.
    pub fn record_sent(&self, account_id: AccountId, value: u64) {
        if let Some(round) = self.current.lock().expect("deadline arbiter mutex poisoned").as_mut() {
            round.block_data.record_sent(account_id, value);
        }
    }

    /// Record that the pool confirmed `account_id`'s deadline.
    pub fn record_confirmed(&self, account_id: AccountId, value: u64) {
        if let Some(round) = self.current.lock().expect("deadline arbiter mutex poisoned").as_mut() {
            round.block_data.record_confirmed(account_id, value);
        }
    }
}

impl Default for DeadlineArbiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn deadline(account_id: AccountId, height: u64, value: u64) -> Deadline {
        Deadline {
            nonce: 1,
            value,
            account_id,
            height,
            plot_path: PathBuf::from("/plots/1_0_PoC2"),
            worker_label: "cpu-0".to_string(),
            status: DeadlineStatus::Found,
        }
    }

    #[test]
    fn test_s1_wrong_block_height_rejected() {
        let arbiter = DeadlineArbiter::new();
        arbiter.start_round(100, 0);

        let result = arbiter.add_deadline(deadline(1, 99, 5000));
        assert_eq!(
            result.unwrap_err(),
            NonceConfirmation::WrongBlock {
                candidate_height: 99,
                current_height: 100
            }
        );
    }

    #[test]
    fn test_s2_first_deadline_admitted() {
        let arbiter = DeadlineArbiter::new();
        arbiter.start_round(100, 0);

        let outcome = arbiter.add_deadline(deadline(1, 100, 300)).unwrap();
        assert_eq!(
            outcome,
            AdmissionOutcome::Admitted {
                deadline: 300,
                status: DeadlineStatus::Found
            }
        );
        assert_eq!(arbiter.overall_best(), Some(300));
    }

    #[test]
    fn test_s3_improvement_admitted_worse_dropped() {
        let arbiter = DeadlineArbiter::new();
        arbiter.start_round(100, 0);

        arbiter.add_deadline(deadline(1, 100, 300)).unwrap();
        let better = arbiter.add_deadline(deadline(1, 100, 250)).unwrap();
        assert_eq!(
            better,
            AdmissionOutcome::Admitted {
                deadline: 250,
                status: DeadlineStatus::Found
            }
        );

        let worse = arbiter.add_deadline(deadline(1, 100, 400)).unwrap();
        assert_eq!(worse, AdmissionOutcome::Rejected(RejectionReason::NotAnImprovement));
        assert_eq!(arbiter.overall_best(), Some(250));
    }

    #[test]
    fn test_s4_over_target_marked_too_high() {
        let arbiter = DeadlineArbiter::new();
        arbiter.start_round(100, 200);

        let outcome = arbiter.add_deadline(deadline(1, 100, 250)).unwrap();
        assert_eq!(
            outcome,
            AdmissionOutcome::Admitted {
                deadline: 250,
                status: DeadlineStatus::TooHigh
            }
        );
    }

    #[test]
    fn test_no_current_round_errors() {
        let arbiter = DeadlineArbiter::new();
        let result = arbiter.add_deadline(deadline(1, 100, 250));
        assert_eq!(result.unwrap_err(), NonceConfirmation::Error("No block data".to_string()));
    }

    #[test]
    fn test_target_deadline_policy_unbounded_by_default() {
        let policy = TargetDeadlinePolicy::new(0, 1.0, 0.0);
        assert_eq!(policy.effective_target(1_000_000, 0, 0), 0);
    }

    #[test]
    fn test_target_deadline_policy_takes_minimum() {
        let policy = TargetDeadlinePolicy::new(500, 1.0, 0.0);
        assert_eq!(policy.effective_target(1_000_000, 300, 0), 300);
        assert_eq!(policy.effective_target(1_000_000, 0, 0), 500);
    }

    #[test]
    fn test_target_deadline_policy_dynamic_ceiling_when_probing() {
        let policy = TargetDeadlinePolicy::new(0, 1.0, 0.5);
        let target = policy.effective_target(1_000, 0, 1024 * 1024 * 1024 * 1024);
        assert!(target > 0);
    }
}
