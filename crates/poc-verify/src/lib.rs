//! # PoC Verify: Deadline Verification Backends
//!
//! Computes scoop deadlines for a chunk of nonces, selecting the minimum
//! deadline in the chunk. Three backends implement the same contract and
//! must be bit-identical in their minimum selection:
//!
//! 1. **Scalar** - sequential fallback, always available.
//! 2. **CPU** - data-parallel across cores via Rayon, still a full
//!    minimum-finding reduction over every nonce (no early exit).
//! 3. **OpenCL** - GPU backend; uploads a chunk, runs a kernel that
//!    reduces to the minimum deadline and nonce, downloads the result.
//!
//! ## Philosophy: No Vendor Lock-in, No Build Failures
//!
//! - **No CUDA**: locks you into NVIDIA.
//! - **OpenCL**: compiles anywhere, detects GPU at runtime.
//! - **CPU/Rayon**: always works, zero extra runtime dependencies.
//!
//! Selection at startup follows the configured processor type and
//! instruction set; an unavailable backend falls back to scalar with a
//! visible warning (never silently to a different algorithm).
//!
//! ## Usage
//!
//! ```rust,ignore
//! use poc_verify::auto_detect;
//!
//! let engine = auto_detect(poc_verify::Backend::Cpu)?;
//! let result = engine.verify_chunk(&request)?;
//! println!("backend={} best_deadline={}", engine.backend(), result.best_deadline);
//! ```

pub mod backends;

use std::sync::Arc;
use thiserror::Error;

/// Verifier backend kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Single-threaded scalar fallback.
    Scalar,
    /// Data-parallel across CPU cores via Rayon.
    Cpu,
    /// OpenCL GPU backend.
    OpenCl,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Scalar => write!(f, "scalar"),
            Backend::Cpu => write!(f, "CPU (Rayon)"),
            Backend::OpenCl => write!(f, "OpenCL GPU"),
        }
    }
}

/// Verifier errors.
#[derive(Error, Debug)]
pub enum VerifierError {
    /// The requested backend could not be initialized.
    #[error("backend initialization failed: {0}")]
    InitializationFailed(String),

    /// A verify call received malformed input (wrong buffer length, etc).
    #[error("invalid verify input: {0}")]
    InvalidInput(String),

    /// A GPU-side operation failed after initialization.
    #[error("verify task failed: {0}")]
    TaskFailed(String),

    /// The backend's device and queue initialized fine, but it cannot
    /// produce results bit-identical to the other backends yet.
    #[error("backend not ready for verification: {0}")]
    NotReady(String),
}

/// Device information, surfaced for logging and the progress sink.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// Human-readable device name.
    pub name: String,
    /// Backend kind.
    pub backend: Backend,
    /// Compute units (CPU cores or GPU compute units).
    pub compute_units: u32,
}

/// A chunk of scoop bytes to verify, as handed off by the plot reader pool.
pub struct VerifyRequest<'a> {
    /// 32-byte generation signature for the current challenge.
    pub generation_signature: &'a [u8; 32],
    /// Concatenated 64-byte scoop slices, one per nonce in the chunk.
    pub scoop_data: &'a [u8],
    /// Index of the first nonce in `scoop_data`.
    pub start_nonce: u64,
    /// Number of nonces in `scoop_data`; must satisfy
    /// `scoop_data.len() == count * 64`.
    pub count: u64,
    /// Block base target, used to reduce hash digests to deadlines.
    pub base_target: u64,
}

/// Minimum deadline found in a chunk and the nonce that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyResult {
    /// Nonce producing the minimum deadline.
    pub best_nonce: u64,
    /// The minimum deadline value in the chunk.
    pub best_deadline: u64,
}

/// Verifier engine trait, implemented by all backends.
///
/// Deliberately synchronous: verification is CPU/GPU-bound, not I/O-bound,
/// and runs on a dedicated verifier worker thread rather than an async
/// task.
pub trait VerifierEngine: Send + Sync {
    /// Backend kind.
    fn backend(&self) -> Backend;

    /// Device info for logging.
    fn device_info(&self) -> &DeviceInfo;

    /// Find the minimum deadline (and its nonce) across every nonce in
    /// `request`. Must scan the full range; backends must not early-exit
    /// on the first qualifying deadline; the minimum-selection contract
    /// is relied on by callers to be identical across backends.
    fn verify_chunk(&self, request: &VerifyRequest<'_>) -> Result<VerifyResult, VerifierError>;
}

/// Auto-detect and create the best available backend for `preferred`,
/// falling back to scalar with a visible warning if unavailable.
pub fn auto_detect(preferred: Backend) -> Arc<dyn VerifierEngine> {
    match preferred {
        Backend::OpenCl => {
            #[cfg(feature = "opencl")]
            {
                match backends::opencl::OpenClEngine::new() {
                    Ok(engine) => return Arc::new(engine),
                    Err(e) => {
                        tracing::warn!("OpenCL backend unavailable ({e}), falling back to CPU");
                    }
                }
            }
            #[cfg(not(feature = "opencl"))]
            {
                tracing::warn!("OpenCL support not compiled in, falling back to CPU");
            }
            Arc::new(backends::cpu::CpuEngine::new())
        }
        Backend::Cpu => Arc::new(backends::cpu::CpuEngine::new()),
        Backend::Scalar => Arc::new(backends::scalar::ScalarEngine::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_display() {
        assert_eq!(Backend::Scalar.to_string(), "scalar");
        assert_eq!(Backend::Cpu.to_string(), "CPU (Rayon)");
    }

    #[test]
    fn test_auto_detect_falls_back_to_cpu_when_opencl_unavailable() {
        let engine = auto_detect(Backend::Scalar);
        assert_eq!(engine.backend(), Backend::Scalar);
    }
}
