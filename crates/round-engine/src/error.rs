//! Error types for the mining round engine

use thiserror::Error;

/// Result type alias for round engine operations
pub type Result<T> = std::result::Result<T, RoundEngineError>;

/// Errors that can occur while running a mining round
#[derive(Debug, Error)]
pub enum RoundEngineError {
    /// None of the configured pool URLs responded.
    #[error("pool unreachable: tried {attempted} url(s), last error: {last_error}")]
    PoolUnreachable {
        /// Number of URLs tried in this poll cycle.
        attempted: usize,
        /// The last transport error observed.
        last_error: String,
    },

    /// The pool returned a response that could not be parsed.
    #[error("malformed pool response: {0}")]
    MalformedPoolResponse(String),

    /// A plot directory could not be read.
    #[error("plot directory unreadable: {path} ({reason})")]
    PlotDirectoryUnreadable {
        /// Directory path.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },

    /// A plot file's size is not an integer multiple of the per-nonce size.
    #[error("malformed plot file {path}: size {size} is not a multiple of nonce size {nonce_size}")]
    MalformedPlotFile {
        /// Plot file path.
        path: String,
        /// File size in bytes.
        size: u64,
        /// Expected per-nonce size in bytes.
        nonce_size: u64,
    },

    /// A configured plot directory contains no usable plot files.
    #[error("no plot files found under {0}")]
    NoPlotFiles(String),

    /// A read from a plot file failed partway through.
    #[error("short read on {path}: expected {expected} bytes, got {actual}")]
    ShortRead {
        /// Plot file path.
        path: String,
        /// Bytes requested.
        expected: usize,
        /// Bytes actually read.
        actual: usize,
    },

    /// The requested memory budget is smaller than one scoop buffer.
    #[error("buffer budget {budget} bytes is too small for a single read (minimum {minimum})")]
    BufferBudgetTooSmall {
        /// Configured budget in bytes.
        budget: usize,
        /// Minimum viable budget.
        minimum: usize,
    },

    /// No verifier backend could be initialized, not even the scalar fallback.
    #[error("no verifier backend available: {0}")]
    NoVerifierBackend(String),

    /// Submission to the pool failed after exhausting the retry budget.
    #[error("submission failed for account {account_id} at height {height} after {attempts} attempts: {reason}")]
    SubmissionExhausted {
        /// Account the deadline belonged to.
        account_id: u64,
        /// Block height.
        height: u64,
        /// Attempts made.
        attempts: u32,
        /// Last failure reason.
        reason: String,
    },

    /// A deadline was computed against a height that is no longer current.
    #[error("stale deadline: candidate height {candidate_height}, current height {current_height}")]
    StaleDeadline {
        /// Height the deadline was computed against.
        candidate_height: u64,
        /// Current round height.
        current_height: u64,
    },

    /// Invalid configuration supplied at startup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal invariant violation; always a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RoundEngineError {
    /// Check if the error is recoverable: the round can continue, or the
    /// operation can be retried on its own schedule.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PoolUnreachable { .. }
                | Self::MalformedPoolResponse(_)
                | Self::ShortRead { .. }
                | Self::StaleDeadline { .. }
        )
    }

    /// Check if the error is critical: the engine cannot make progress and
    /// should stop.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            Self::NoVerifierBackend(_) | Self::InvalidConfig(_) | Self::Internal(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_recoverability() {
        assert!(RoundEngineError::PoolUnreachable {
            attempted: 2,
            last_error: "timeout".into()
        }
        .is_recoverable());
        assert!(!RoundEngineError::InvalidConfig("bad".into()).is_recoverable());
    }

    #[test]
    fn test_error_criticality() {
        assert!(RoundEngineError::NoVerifierBackend("scalar init failed".into()).is_critical());
        assert!(!RoundEngineError::StaleDeadline {
            candidate_height: 1,
            current_height: 2
        }
        .is_critical());
    }
}
