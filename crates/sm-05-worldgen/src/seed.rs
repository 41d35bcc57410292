//! Shared seed inputs and the deterministic generator.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use shared_crypto::hashing::seed64;

/// Per-purpose discriminator strings. One per derived artifact, so a change
/// to one generation pass can never shift another's sequence.
pub mod discriminator {
    pub const MAP: &str = "starmesh-map";
    pub const SECTOR: &str = "starmesh-sector";
    pub const WARPS: &str = "starmesh-warps";
    /// Which sectors get a port.
    pub const PORTS: &str = "starmesh-ports";
    /// One port's class and stock.
    pub const PORT: &str = "starmesh-port";
    pub const STATION: &str = "starmesh-station";
    pub const MARKET: &str = "starmesh-market";
}

/// The only inputs to world generation. Not stored or transmitted —
/// recomputed identically by every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSeed {
    pub shard: String,
    pub epoch: u32,
    pub sector_count: u32,
}

impl WorldSeed {
    pub fn new(shard: impl Into<String>, epoch: u32, sector_count: u32) -> Self {
        Self {
            shard: shard.into(),
            epoch,
            sector_count,
        }
    }

    /// The base seed all per-purpose seeds derive from.
    pub fn base_seed(&self) -> u64 {
        seed64(&[
            discriminator::MAP,
            &self.shard,
            &self.epoch.to_string(),
            &self.sector_count.to_string(),
        ])
    }
}

/// Deterministic pseudo-random sequence for one generation purpose.
///
/// Thin wrapper over `ChaCha8Rng` exposing only integer draws, so no
/// generation pass can accidentally depend on floating point.
#[derive(Debug)]
pub struct DetRng {
    inner: ChaCha8Rng,
}

impl DetRng {
    pub fn from_seed64(seed: u64) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Seed for a purpose and parts, e.g. `(SECTOR, [base, sector_id])`.
    pub fn for_purpose(purpose: &str, parts: &[u64]) -> Self {
        let strings: Vec<String> = parts.iter().map(u64::to_string).collect();
        let mut joined: Vec<&str> = Vec::with_capacity(parts.len() + 1);
        joined.push(purpose);
        joined.extend(strings.iter().map(String::as_str));
        Self::from_seed64(seed64(&joined))
    }

    /// Uniform draw in `lo..=hi`.
    pub fn range_u32(&mut self, lo: u32, hi: u32) -> u32 {
        self.inner.gen_range(lo..=hi)
    }

    pub fn range_i64(&mut self, lo: i64, hi: i64) -> i64 {
        self.inner.gen_range(lo..=hi)
    }

    /// Integer Bernoulli: true with probability `num / den`.
    pub fn chance(&mut self, num: u32, den: u32) -> bool {
        self.inner.gen_range(0..den) < num
    }

    /// Uniform index into a slice of known length.
    pub fn index(&mut self, len: usize) -> usize {
        self.inner.gen_range(0..len)
    }
}
