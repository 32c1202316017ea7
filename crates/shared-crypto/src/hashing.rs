//! # Deadline hashing
//!
//! The currency's scoop-hash construction, treated as an opaque primitive:
//! `H(gensig, scoop_bytes) -> 8 bytes`, reduced to a deadline by dividing
//! the big-endian interpretation of those 8 bytes by the block's base
//! target. Built on Shabal-256, the hash this family of currencies actually
//! uses for scoop verification.

use shabal::{Digest, Shabal256};

/// Number of bytes produced by the scoop hash before reduction to a `u64`.
pub const HASH_OUTPUT_LEN: usize = 32;

/// Hash a nonce's scoop bytes against the block's generation signature.
///
/// `scoop_bytes` is the 64-byte scoop slice read from the plot file.
/// Returns the full Shabal-256 digest; callers reduce it to a deadline
/// with [`deadline_from_digest`].
pub fn hash_scoop(generation_signature: &[u8; 32], scoop_bytes: &[u8; 64]) -> [u8; HASH_OUTPUT_LEN] {
    let mut hasher = Shabal256::new();
    hasher.update(generation_signature);
    hasher.update(scoop_bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; HASH_OUTPUT_LEN];
    out.copy_from_slice(&digest);
    out
}

/// Reduce a scoop digest to a deadline value: take the first 8 bytes,
/// big-endian, divided by `base_target`.
///
/// `base_target` of zero is a configuration error upstream; this function
/// treats it as "infinite deadline" rather than panicking.
pub fn deadline_from_digest(digest: &[u8; HASH_OUTPUT_LEN], base_target: u64) -> u64 {
    let mut first_eight = [0u8; 8];
    first_eight.copy_from_slice(&digest[..8]);
    let hashed = u64::from_be_bytes(first_eight);
    if base_target == 0 {
        u64::MAX
    } else {
        hashed / base_target
    }
}

/// Compute the deadline for a single nonce directly from its scoop bytes.
pub fn scoop_deadline(
    generation_signature: &[u8; 32],
    scoop_bytes: &[u8; 64],
    base_target: u64,
) -> u64 {
    let digest = hash_scoop(generation_signature, scoop_bytes);
    deadline_from_digest(&digest, base_target)
}
