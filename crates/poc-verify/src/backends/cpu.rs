//! CPU verifier backend using Rayon.
//!
//! Parallelizes the minimum-deadline reduction across cores. This is the
//! backend selected for the configured `cpuInstructionSet` values (SSE2,
//! AVX2, NEON): the reduction itself is backend-uniform, so instruction
//! width only affects how many nonces each core's inner loop processes
//! per hash call, which is an implementation detail of `shared_crypto`
//! rather than this crate. Data parallelism across cores is what actually
//! moves throughput here.

use super::scalar::validate_request;
use crate::{Backend, DeviceInfo, VerifierEngine, VerifierError, VerifyRequest, VerifyResult};
use rayon::prelude::*;
use shared_crypto::scoop_deadline;

/// CPU-based verifier engine using Rayon for cross-core parallelism.
pub struct CpuEngine {
    device_info: DeviceInfo,
}

impl CpuEngine {
    /// Create a new CPU engine, sized to the available core count.
    pub fn new() -> Self {
        let num_cpus = num_cpus::get() as u32;
        Self {
            device_info: DeviceInfo {
                name: format!("CPU ({num_cpus} cores)"),
                backend: Backend::Cpu,
                compute_units: num_cpus,
            },
        }
    }
}

impl Default for CpuEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VerifierEngine for CpuEngine {
    fn backend(&self) -> Backend {
        Backend::Cpu
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    fn verify_chunk(&self, request: &VerifyRequest<'_>) -> Result<VerifyResult, VerifierError> {
        validate_request(request)?;

        let gensig = request.generation_signature;
        let base_target = request.base_target;
        let start_nonce = request.start_nonce;

        let best = (0..request.count as usize)
            .into_par_iter()
            .map(|i| {
                let scoop: &[u8; 64] = request.scoop_data[i * 64..(i + 1) * 64]
                    .try_into()
                    .expect("chunk length validated above");
                let deadline = scoop_deadline(gensig, scoop, base_target);
                (deadline, start_nonce + i as u64)
            })
            .reduce(
                || (u64::MAX, start_nonce),
                |a, b| if b.0 < a.0 { b } else { a },
            );

        Ok(VerifyResult {
            best_deadline: best.0,
            best_nonce: best.1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::scalar::ScalarEngine;

    #[test]
    fn test_matches_scalar_backend() {
        let scoops = vec![[5u8; 64], [9u8; 64], [1u8; 64], [200u8; 64]];
        let gensig = [3u8; 32];
        let data: Vec<u8> = scoops.concat();

        let request = VerifyRequest {
            generation_signature: &gensig,
            scoop_data: &data,
            start_nonce: 42,
            count: scoops.len() as u64,
            base_target: 500,
        };

        let cpu = CpuEngine::new().verify_chunk(&request).unwrap();
        let scalar = ScalarEngine::new().verify_chunk(&request).unwrap();

        assert_eq!(cpu, scalar, "backends must select a bit-identical minimum");
    }
}
