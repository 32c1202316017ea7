//! Verifier backends.
//!
//! `scalar` and `cpu` always compile in; `opencl` is feature-gated since it
//! links against the system OpenCL loader and gracefully falls back to
//! `cpu` at runtime when no GPU is found.

pub mod cpu;
pub mod scalar;

#[cfg(feature = "opencl")]
pub mod opencl;
