//! # Round-lifecycle events
//!
//! Everything the progress sink and any other interested subscriber needs
//! to observe about a mining round, published onto the in-memory bus.

use serde::{Deserialize, Serialize};
use shared_types::entities::{AccountId, DeadlineStatus, NonceConfirmation};

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MiningEvent {
    /// A new round started for `height`; `plot_dirs_enqueued` read notifications
    /// were queued.
    RoundStarted {
        /// The new current block height.
        height: u64,
        /// Effective target deadline for this round (0 = unbounded).
        effective_target: u64,
        /// Number of plot-read notifications enqueued.
        read_notifications: u32,
    },

    /// The deadline arbiter admitted a new best-found deadline for an account.
    DeadlineFound {
        /// Account the deadline belongs to.
        account_id: AccountId,
        /// Block height the deadline was computed against.
        height: u64,
        /// Deadline value in seconds.
        deadline: u64,
        /// Lifecycle status assigned by the arbiter (`Found` or `TooHigh`).
        status: DeadlineStatus,
    },

    /// The arbiter rejected a candidate deadline.
    DeadlineRejected {
        /// Account the candidate belonged to.
        account_id: AccountId,
        /// Reason for rejection.
        reason: NonceConfirmation,
    },

    /// A deadline was handed to the pool for submission.
    DeadlineSubmitted {
        /// Account the deadline belongs to.
        account_id: AccountId,
        /// Block height.
        height: u64,
        /// Deadline value in seconds.
        deadline: u64,
    },

    /// The pool confirmed a submitted deadline.
    DeadlineConfirmed {
        /// Account the deadline belongs to.
        account_id: AccountId,
        /// Block height.
        height: u64,
        /// Deadline value in seconds.
        deadline: u64,
    },

    /// Submission failed permanently after exhausting retries.
    SubmissionFailed {
        /// Account the deadline belongs to.
        account_id: AccountId,
        /// Block height.
        height: u64,
        /// Failure description.
        reason: String,
    },

    /// Read or verify progress changed.
    ProgressUpdated {
        /// Block height this progress applies to.
        height: u64,
        /// Read completion fraction, 0.0 - 1.0.
        read_fraction: f64,
        /// Verify completion fraction, 0.0 - 1.0.
        verify_fraction: f64,
        /// Read throughput in MiB/s.
        read_mib_per_s: f64,
        /// Verify throughput in MiB/s.
        verify_mib_per_s: f64,
    },

    /// Both read and verify progress reached 100% for a round.
    RoundCompleted {
        /// Height of the completed round.
        height: u64,
        /// Round duration in milliseconds.
        duration_ms: u64,
        /// Best-found deadline for the round, if any nonce was found.
        best_deadline: Option<u64>,
    },

    /// The pool poller could not reach any configured URL for five
    /// consecutive attempts.
    PollFailure {
        /// Number of consecutive failures observed.
        consecutive_failures: u32,
    },

    /// A verifier backend could not be initialized and the engine fell back
    /// to the scalar backend.
    BackendFallback {
        /// The backend that failed to initialize.
        requested: String,
        /// The backend actually in use.
        fallback: String,
    },
}

impl MiningEvent {
    /// Topic used for subscription filtering.
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::RoundStarted { .. } | Self::RoundCompleted { .. } => EventTopic::Round,
            Self::DeadlineFound { .. }
            | Self::DeadlineRejected { .. }
            | Self::DeadlineSubmitted { .. }
            | Self::DeadlineConfirmed { .. }
            | Self::SubmissionFailed { .. } => EventTopic::Deadline,
            Self::ProgressUpdated { .. } => EventTopic::Progress,
            Self::PollFailure { .. } => EventTopic::Pool,
            Self::BackendFallback { .. } => EventTopic::Backend,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Round start/completion.
    Round,
    /// Deadline found/rejected/submitted/confirmed.
    Deadline,
    /// Progress updates.
    Progress,
    /// Pool-poller events.
    Pool,
    /// Verifier-backend selection events.
    Backend,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self { topics }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &MiningEvent) -> bool {
        self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_round_started() -> MiningEvent {
        MiningEvent::RoundStarted {
            height: 100,
            effective_target: 0,
            read_notifications: 4,
        }
    }

    #[test]
    fn test_event_topic_mapping() {
        assert_eq!(sample_round_started().topic(), EventTopic::Round);
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&sample_round_started()));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Round]);
        assert!(filter.matches(&sample_round_started()));

        let progress_event = MiningEvent::ProgressUpdated {
            height: 100,
            read_fraction: 0.5,
            verify_fraction: 0.25,
            read_mib_per_s: 10.0,
            verify_mib_per_s: 8.0,
        };
        assert!(!filter.matches(&progress_event));
    }

    #[test]
    fn test_deadline_event_topic() {
        let event = MiningEvent::DeadlineConfirmed {
            account_id: 1,
            height: 100,
            deadline: 42,
        };
        assert_eq!(event.topic(), EventTopic::Deadline);
    }
}
