//! # Error Types
//!
//! Defines error types used across the mining workspace that don't belong
//! to a single crate (config/plot validation shared by the engine and the
//! binary).

use thiserror::Error;

/// Errors validating the on-disk plot registration before a round starts.
#[derive(Debug, Clone, Error)]
pub enum PlotError {
    /// The plot directory does not exist or is not readable.
    #[error("cannot read plot directory {path}: {reason}")]
    DirectoryUnreadable {
        /// Directory path.
        path: String,
        /// Underlying OS error description.
        reason: String,
    },

    /// A file's size is not a whole multiple of the expected per-nonce size.
    #[error("plot file {path} has size {size} which is not a multiple of {nonce_size}")]
    MalformedSize {
        /// File path.
        path: String,
        /// Observed size.
        size: u64,
        /// Expected per-nonce size (4096 scoops * 64 bytes).
        nonce_size: u64,
    },

    /// No plot files were found under any registered directory.
    #[error("no plot files registered")]
    NoPlotFiles,
}
