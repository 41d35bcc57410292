//! Market price drift.
//!
//! Prices advance deterministically per fixed time slot as a function of
//! the shared seed inputs, the slot index, and the resource — so
//! independently running nodes converge on the same price curve without
//! exchanging a single price update. Locally observed trades still perturb
//! local inventory; gossip reconciles that.

use shared_crypto::hashing::sha256;
use shared_types::ResourceKind;

use crate::seed::discriminator;

/// One drift slot per minute.
pub const SLOT_MS: u64 = 60_000;

/// Baseline price per resource.
pub fn base_price(resource: ResourceKind) -> i64 {
    match resource {
        ResourceKind::Ore => 5,
        ResourceKind::Gas => 6,
        ResourceKind::Crystal => 8,
    }
}

/// The slot index covering `now_ms`.
pub fn slot_for(now_ms: u64) -> u64 {
    now_ms / SLOT_MS
}

/// Deterministic per-slot price shift in `-2..=2`.
pub fn drift_shift(shard: &str, epoch: u32, slot: u64, resource: ResourceKind) -> i64 {
    let material = format!(
        "{}|{shard}|{epoch}|{slot}|{}",
        discriminator::MARKET,
        resource
    );
    let digest = sha256(material.as_bytes());
    i64::from(digest[0] % 5) - 2
}

/// The converged price of `resource` at `slot`, never below 1.
pub fn price_at_slot(shard: &str, epoch: u32, slot: u64, resource: ResourceKind) -> i64 {
    (base_price(resource) + drift_shift(shard, epoch, slot, resource)).max(1)
}
