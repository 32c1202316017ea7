//! Domain layer: pure business logic for scheduling a mining round,
//! policing target deadlines, and arbitrating candidate deadlines. All
//! code here is synchronous and I/O-free.
//!
//! ## Entities
//!
//! - [`BlockData`]: per-account best-found/best-sent/best-confirmed
//!   deadlines for the round currently in progress.
//! - [`ReadBuffer`]: one chunk of scoop bytes in flight between the reader
//!   pool and the verifier pool.
//!
//! ## Services
//!
//! - [`DeadlineArbiter`]: the single-writer `addDeadline` admission rule.
//! - [`TargetDeadlinePolicy`]: computes the effective target deadline from
//!   the configured, pool-advertised, and dynamic ceilings.

mod entities;
mod services;

pub use entities::{AdmissionOutcome, BlockData, ReadBuffer, RejectionReason};
pub use services::{DeadlineArbiter, TargetDeadlinePolicy};
