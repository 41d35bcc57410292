//! Reliability tuning knobs.

/// Retransmit and acknowledgment timing, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct ReliabilityConfig {
    /// First retransmit after this long without an ACK.
    pub initial_rto_ms: u64,
    /// Backoff doubles per attempt up to this ceiling.
    pub rto_cap_ms: u64,
    /// Retransmissions allowed before a message is abandoned.
    pub max_attempts: u32,
    /// An owed ACK with no piggyback ride for this long gets its own
    /// `ack_only` envelope.
    pub silent_ack_after_ms: u64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            initial_rto_ms: 500,
            rto_cap_ms: 4_000,
            max_attempts: 6,
            silent_ack_after_ms: 250,
        }
    }
}

impl ReliabilityConfig {
    /// Backoff delay before retransmission number `attempts + 1`.
    pub fn rto_for_attempt(&self, attempts: u32) -> u64 {
        let shifted = self
            .initial_rto_ms
            .saturating_mul(1u64 << attempts.min(16));
        shifted.min(self.rto_cap_ms)
    }
}
