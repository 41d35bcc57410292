//! Gossip tuning knobs.

use rand::seq::SliceRandom;

/// How many healthy peers receive each fanout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutPolicy {
    /// Flood every eligible peer. Fine for small meshes.
    All,
    /// A random subset of fixed size.
    Fixed(usize),
    /// A random subset of about sqrt(n) + 1, at least `min`. Scales
    /// bandwidth sublinearly while keeping redundancy.
    Sqrt { min: usize },
}

impl FanoutPolicy {
    /// Pick the fanout subset. Selection randomness is not semantic; any
    /// subset is correct.
    pub fn select<T>(&self, mut targets: Vec<T>) -> Vec<T> {
        let limit = match *self {
            FanoutPolicy::All => return targets,
            FanoutPolicy::Fixed(n) => n,
            FanoutPolicy::Sqrt { min } => {
                let n = targets.len();
                min.max((n as f64).sqrt() as usize + 1)
            }
        };
        if targets.len() <= limit {
            return targets;
        }
        let mut rng = rand::thread_rng();
        targets.shuffle(&mut rng);
        targets.truncate(limit);
        targets
    }
}

/// Gossip engine configuration, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct GossipConfig {
    /// Relay ceiling from the policy document.
    pub max_event_hops: u8,
    /// How long a seen event id stays in the dedup cache.
    pub seen_retention_ms: u64,
    /// Hard cap on cached ids; oldest evicted first.
    pub seen_cap: usize,
    pub fanout: FanoutPolicy,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            max_event_hops: 2,
            seen_retention_ms: 300_000,
            seen_cap: 20_000,
            fanout: FanoutPolicy::Sqrt { min: 3 },
        }
    }
}
