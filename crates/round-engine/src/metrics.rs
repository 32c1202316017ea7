//! Throughput and round metrics for the mining engine.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for a running round engine instance.
#[derive(Debug, Default)]
pub struct RoundMetrics {
    /// Total rounds completed (a round ends when read+verify both reach 100%).
    pub rounds_completed: AtomicU64,

    /// Total bytes read from plot files.
    pub bytes_read: AtomicU64,

    /// Total nonces verified across all backends.
    pub nonces_verified: AtomicU64,

    /// Total deadlines admitted as a new best-found value.
    pub deadlines_found: AtomicU64,

    /// Total deadlines submitted to the pool.
    pub deadlines_submitted: AtomicU64,

    /// Total deadlines confirmed by the pool.
    pub deadlines_confirmed: AtomicU64,

    /// Total submission attempts that exhausted their retry budget.
    pub submissions_failed: AtomicU64,

    /// Total time spent reading plot files, in milliseconds.
    pub read_time_ms: AtomicU64,

    /// Total time spent verifying scoop data, in milliseconds.
    pub verify_time_ms: AtomicU64,
}

impl RoundMetrics {
    /// Create a new, zeroed metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a chunk read from a plot file.
    pub fn record_read(&self, bytes: u64, duration_ms: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
        self.read_time_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }

    /// Record a chunk verified by a backend.
    pub fn record_verify(&self, nonce_count: u64, duration_ms: u64) {
        self.nonces_verified.fetch_add(nonce_count, Ordering::Relaxed);
        self.verify_time_ms.fetch_add(duration_ms, Ordering::Relaxed);
    }

    /// Record a newly admitted best-found deadline.
    pub fn record_deadline_found(&self) {
        self.deadlines_found.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a deadline handed to the submitter.
    pub fn record_deadline_submitted(&self) {
        self.deadlines_submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a deadline confirmed by the pool.
    pub fn record_deadline_confirmed(&self) {
        self.deadlines_confirmed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a submission that exhausted its retry budget.
    pub fn record_submission_failed(&self) {
        self.submissions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a round completing.
    pub fn record_round_completed(&self) {
        self.rounds_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// Read throughput in MiB/s since the metrics collector was created.
    pub fn read_mib_per_s(&self) -> f64 {
        let ms = self.read_time_ms.load(Ordering::Relaxed);
        if ms == 0 {
            return 0.0;
        }
        let bytes = self.bytes_read.load(Ordering::Relaxed) as f64;
        (bytes / (1024.0 * 1024.0)) / (ms as f64 / 1000.0)
    }

    /// Verify throughput in MiB/s (nonces * 64 bytes/nonce) since creation.
    pub fn verify_mib_per_s(&self) -> f64 {
        let ms = self.verify_time_ms.load(Ordering::Relaxed);
        if ms == 0 {
            return 0.0;
        }
        let bytes = self.nonces_verified.load(Ordering::Relaxed) as f64 * 64.0;
        (bytes / (1024.0 * 1024.0)) / (ms as f64 / 1000.0)
    }
}
