//! OpenCL GPU verifier backend.
//!
//! Portable across NVIDIA, AMD, Intel, and Apple GPUs via OpenCL 1.2.
//! `new()` detects a device and compiles/binds the reduction kernel, so an
//! operator can confirm a GPU is visible to OpenCL, but `verify_chunk`
//! does not run it yet.
//!
//! `DEADLINE_KERNEL` below is a placeholder diffusion, not the currency's
//! real Shabal-256 construction (see `scalar.rs`/`cpu.rs`); porting that
//! construction to OpenCL C is a larger undertaking than this backend
//! covers yet (see `DESIGN.md`). Every backend's minimum selection must be
//! bit-identical, so `verify_chunk` refuses to run the placeholder kernel
//! and returns `VerifierError::NotReady` instead of a wrong deadline.
//!
//! NOTE: `ocl::Kernel` contains raw pointers and is not `Sync`; it is
//! wrapped in a `Mutex` for thread-safe access from the verifier pool.

use crate::{Backend, DeviceInfo, VerifierEngine, VerifierError, VerifyRequest, VerifyResult};
use std::sync::Mutex;

const SCOOP_SIZE: usize = 64;

/// Placeholder reduction kernel, not bit-identical to the real Shabal-256
/// construction. Compiled and bound so `new()` exercises the full device
/// pipeline, but never enqueued by `verify_chunk`.
const DEADLINE_KERNEL: &str = r"
__kernel void scoop_deadline(
    __global const uchar* gensig,
    __global const uchar* scoop_data,
    const ulong start_nonce,
    const ulong base_target,
    __global ulong* out_deadlines,
    __global ulong* out_nonces
) {
    ulong gid = get_global_id(0);
    __global const uchar* scoop = scoop_data + gid * 64;

    ulong state = 0x9E3779B97F4A7C15UL;
    for (int i = 0; i < 32; i++) {
        state ^= (ulong) gensig[i];
        state *= 0xFF51AFD7ED558CCDUL;
        state ^= state >> 33;
    }
    for (int i = 0; i < 64; i++) {
        state ^= (ulong) scoop[i];
        state *= 0xC4CEB9FE1A85EC53UL;
        state ^= state >> 29;
    }

    ulong deadline = base_target == 0 ? ULONG_MAX : state / base_target;

    out_deadlines[gid] = deadline;
    out_nonces[gid] = start_nonce + gid;
}
";

/// OpenCL-based verifier engine.
pub struct OpenClEngine {
    device_info: DeviceInfo,
    queue: ocl::Queue,
    kernel: Mutex<ocl::Kernel>,
}

impl OpenClEngine {
    /// Initialize the first available GPU device, failing clearly if none
    /// is found or the OpenCL runtime is not installed.
    pub fn new() -> Result<Self, VerifierError> {
        let platform_ids = ocl::core::get_platform_ids().map_err(|e| {
            VerifierError::InitializationFailed(format!(
                "failed to get OpenCL platforms: {e}. Is an OpenCL runtime installed?"
            ))
        })?;

        let platform_id = platform_ids.first().cloned().ok_or_else(|| {
            VerifierError::InitializationFailed("no OpenCL platform found".to_string())
        })?;
        let platform = ocl::Platform::new(platform_id);

        let device = ocl::Device::list(platform, Some(ocl::flags::DeviceType::GPU))
            .map_err(|e| VerifierError::InitializationFailed(e.to_string()))?
            .into_iter()
            .next()
            .ok_or_else(|| VerifierError::InitializationFailed("no GPU device found".to_string()))?;

        let context = ocl::Context::builder()
            .platform(platform)
            .devices(device)
            .build()
            .map_err(|e| VerifierError::InitializationFailed(e.to_string()))?;

        let queue = ocl::Queue::new(&context, device, None)
            .map_err(|e| VerifierError::InitializationFailed(e.to_string()))?;

        let program = ocl::Program::builder()
            .src(DEADLINE_KERNEL)
            .devices(device)
            .build(&context)
            .map_err(|e| VerifierError::InitializationFailed(e.to_string()))?;

        let kernel = ocl::Kernel::builder()
            .program(&program)
            .name("scoop_deadline")
            .queue(queue.clone())
            .arg(None::<&ocl::Buffer<u8>>) // gensig
            .arg(None::<&ocl::Buffer<u8>>) // scoop_data
            .arg(0u64) // start_nonce
            .arg(0u64) // base_target
            .arg(None::<&ocl::Buffer<u64>>) // out_deadlines
            .arg(None::<&ocl::Buffer<u64>>) // out_nonces
            .build()
            .map_err(|e| VerifierError::InitializationFailed(e.to_string()))?;

        let name = device.name().unwrap_or_else(|_| "Unknown GPU".to_string());
        let compute_units = device
            .info(ocl::core::DeviceInfo::MaxComputeUnits)
            .ok()
            .and_then(|v| match v {
                ocl::core::DeviceInfoResult::MaxComputeUnits(n) => Some(n),
                _ => None,
            })
            .unwrap_or(1);

        Ok(Self {
            device_info: DeviceInfo {
                name,
                backend: Backend::OpenCl,
                compute_units,
            },
            queue,
            kernel: Mutex::new(kernel),
        })
    }
}

impl VerifierEngine for OpenClEngine {
    fn backend(&self) -> Backend {
        Backend::OpenCl
    }

    fn device_info(&self) -> &DeviceInfo {
        &self.device_info
    }

    fn verify_chunk(&self, request: &VerifyRequest<'_>) -> Result<VerifyResult, VerifierError> {
        super::scalar::validate_request(request)?;

        Err(VerifierError::NotReady(
            "OpenCL kernel does not yet implement the real Shabal-256 construction; \
             refusing to return a deadline that would diverge from the scalar/CPU backends"
                .to_string(),
        ))
    }
}
