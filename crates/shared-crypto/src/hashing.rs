//! # SHA-256 Hashing
//!
//! One-shot helpers plus the 64-bit seed derivation used by deterministic
//! world generation. Seeds must come out bit-identical on every node and
//! platform, so everything here is pure byte manipulation.

use sha2::{Digest, Sha256};

/// SHA-256 hash output (256-bit).
pub type Hash = [u8; 32];

/// Hash data with SHA-256 (one-shot).
pub fn sha256(data: &[u8]) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// One-shot hash, lowercase hex encoded.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Hash multiple inputs as one stream.
pub fn sha256_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = Sha256::new();
    for input in inputs {
        hasher.update(input);
    }
    hasher.finalize().into()
}

/// Derive a stable 64-bit seed from string parts.
///
/// Parts are joined with `|` and hashed; the first 8 bytes, big-endian,
/// become the seed. Any two nodes deriving from the same parts get the
/// same seed.
pub fn seed64(parts: &[&str]) -> u64 {
    let joined = parts.join("|");
    let digest = sha256(joined.as_bytes());
    let mut first = [0u8; 8];
    first.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(first)
}
