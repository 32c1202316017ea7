//! # Shared Crypto
//!
//! The scoop-hash primitive used by the verifier backends, kept in its own
//! crate so `poc-verify` and `round-engine` can share one implementation
//! and test it in isolation from the threading/scheduling code that calls it.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod hashing;

pub use hashing::{deadline_from_digest, hash_scoop, scoop_deadline, HASH_OUTPUT_LEN};
