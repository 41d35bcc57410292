//! Netsplit detection.
//!
//! A mesh with zero healthy peers after a quiet period is assumed to be on
//! the wrong side of a partition. The tracker only observes; rejoining is
//! the announce round's job.

use tracing::info;

/// Detects loss of the whole mesh and counts rejoins.
#[derive(Debug)]
pub struct NetsplitTracker {
    last_peer_seen_ms: u64,
    split_active: bool,
    merge_count: u32,
}

impl NetsplitTracker {
    /// Quiet time with no peers before a split is declared.
    pub const DEFAULT_TIMEOUT_MS: u64 = 20_000;

    pub fn new(now_ms: u64) -> Self {
        Self {
            last_peer_seen_ms: now_ms,
            split_active: false,
            merge_count: 0,
        }
    }

    /// Any authenticated peer traffic lands here. Returns `true` when the
    /// traffic ended an active split.
    pub fn on_peer_seen(&mut self, now_ms: u64) -> bool {
        self.last_peer_seen_ms = now_ms;
        if self.split_active {
            self.split_active = false;
            self.merge_count += 1;
            info!(merges = self.merge_count, "netsplit healed");
            return true;
        }
        false
    }

    /// Tick evaluation. Returns `true` when a split was just declared.
    pub fn tick(&mut self, healthy_peers: usize, now_ms: u64, timeout_ms: u64) -> bool {
        if !self.split_active
            && healthy_peers == 0
            && now_ms.saturating_sub(self.last_peer_seen_ms) > timeout_ms
        {
            self.split_active = true;
            info!("netsplit suspected: no healthy peers");
            return true;
        }
        false
    }

    pub fn split_active(&self) -> bool {
        self.split_active
    }

    pub fn merge_count(&self) -> u32 {
        self.merge_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_declared_after_quiet_timeout() {
        let mut t = NetsplitTracker::new(0);
        assert!(!t.tick(0, 10_000, NetsplitTracker::DEFAULT_TIMEOUT_MS));
        assert!(t.tick(0, 20_001, NetsplitTracker::DEFAULT_TIMEOUT_MS));
        assert!(t.split_active());
    }

    #[test]
    fn test_peers_present_prevents_split() {
        let mut t = NetsplitTracker::new(0);
        assert!(!t.tick(3, 60_000, NetsplitTracker::DEFAULT_TIMEOUT_MS));
        assert!(!t.split_active());
    }

    #[test]
    fn test_merge_counted_on_recovery() {
        let mut t = NetsplitTracker::new(0);
        t.tick(0, 30_000, NetsplitTracker::DEFAULT_TIMEOUT_MS);
        assert!(t.split_active());
        assert!(t.on_peer_seen(31_000));
        assert!(!t.split_active());
        assert_eq!(t.merge_count(), 1);
    }

    #[test]
    fn test_traffic_without_split_is_not_a_merge() {
        let mut t = NetsplitTracker::new(0);
        assert!(!t.on_peer_seen(1_000));
        assert_eq!(t.merge_count(), 0);
    }
}
