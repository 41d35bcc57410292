//! # Packet Gate
//!
//! Token-bucket rate limiting applied per source address before a datagram
//! is even decoded. Spoofed floods cost one map lookup and no MAC check.
//!
//! # Algorithm
//!
//! Classic token bucket: each address owns a bucket refilled at a fixed
//! rate up to a burst capacity; every accepted packet consumes one token.
//! Buckets idle past the prune horizon are dropped on the next sweep.

use std::collections::HashMap;
use std::net::SocketAddr;

/// Idle buckets older than this are forgotten during `prune`.
const PRUNE_AFTER_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: f64,
    last_refill_ms: u64,
}

/// Per-source-address inbound packet budget.
///
/// Owned by the control loop; no locking needed.
#[derive(Debug)]
pub struct PacketGate {
    /// Maximum burst size and steady-state packets per second.
    capacity: f64,
    refill_per_ms: f64,
    buckets: HashMap<SocketAddr, Bucket>,
}

impl PacketGate {
    pub fn new(packets_per_sec: u32) -> Self {
        let capacity = f64::from(packets_per_sec.max(1));
        Self {
            capacity,
            refill_per_ms: capacity / 1000.0,
            buckets: HashMap::new(),
        }
    }

    /// Try to admit one packet from `addr`. Returns `false` when the
    /// address is over budget.
    pub fn try_acquire(&mut self, addr: SocketAddr, now_ms: u64) -> bool {
        let bucket = self.buckets.entry(addr).or_insert(Bucket {
            tokens: self.capacity,
            last_refill_ms: now_ms,
        });

        let elapsed = now_ms.saturating_sub(bucket.last_refill_ms) as f64;
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_ms).min(self.capacity);
        bucket.last_refill_ms = now_ms;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets for addresses silent past the prune horizon.
    pub fn prune(&mut self, now_ms: u64) {
        self.buckets
            .retain(|_, b| now_ms.saturating_sub(b.last_refill_ms) < PRUNE_AFTER_MS);
    }

    pub fn tracked_addresses(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn test_burst_up_to_capacity_then_rejects() {
        let mut gate = PacketGate::new(10);
        let a = addr(4000);
        for _ in 0..10 {
            assert!(gate.try_acquire(a, 0));
        }
        assert!(!gate.try_acquire(a, 0));
    }

    #[test]
    fn test_refills_over_time() {
        let mut gate = PacketGate::new(10);
        let a = addr(4001);
        for _ in 0..10 {
            gate.try_acquire(a, 0);
        }
        assert!(!gate.try_acquire(a, 0));
        // 500ms refills 5 tokens at 10/s.
        assert!(gate.try_acquire(a, 500));
    }

    #[test]
    fn test_addresses_are_independent() {
        let mut gate = PacketGate::new(1);
        assert!(gate.try_acquire(addr(4002), 0));
        assert!(!gate.try_acquire(addr(4002), 0));
        assert!(gate.try_acquire(addr(4003), 0));
    }

    #[test]
    fn test_prune_drops_idle_buckets() {
        let mut gate = PacketGate::new(5);
        gate.try_acquire(addr(4004), 0);
        assert_eq!(gate.tracked_addresses(), 1);
        gate.prune(PRUNE_AFTER_MS + 1);
        assert_eq!(gate.tracked_addresses(), 0);
    }
}
