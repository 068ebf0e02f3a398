//! Hash-derived entropy for simulations.

use crate::crypto::sha512_half;

/// Derives the per-(round, node) entropy word:
/// the first 32 bits, big-endian, of `sha512_half(seed ‖ round ‖ node)`.
///
/// This is the only randomness source in the harness, so every simulated
/// quantity is a function of the caller's seed and coordinates.
pub fn entropy_word(seed: &str, round: u32, node: u32) -> u32 {
    let mut buf = Vec::with_capacity(seed.len() + 8);
    buf.extend_from_slice(seed.as_bytes());
    buf.extend_from_slice(&round.to_be_bytes());
    buf.extend_from_slice(&node.to_be_bytes());
    let digest = sha512_half(&buf);
    u32::from_be_bytes([digest.0[0], digest.0[1], digest.0[2], digest.0[3]])
}

/// Derives a full 256-bit value from the same stream, for synthetic
/// transaction hashes and validator identities.
pub fn entropy_hash(seed: &str, tag: &str, index: u32) -> crate::types::Hash256 {
    let mut buf = Vec::with_capacity(seed.len() + tag.len() + 4);
    buf.extend_from_slice(seed.as_bytes());
    buf.extend_from_slice(tag.as_bytes());
    buf.extend_from_slice(&index.to_be_bytes());
    sha512_half(&buf)
}
