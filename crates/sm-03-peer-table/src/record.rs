//! One peer's record.

use std::net::SocketAddr;

use shared_types::PeerId;
use sm_02_reliability::ReliableLink;

use crate::table::PeerTableConfig;

/// EWMA weight for new RTT samples.
const RTT_SAMPLE_WEIGHT: f64 = 0.2;

/// Computed liveness of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Traffic within the stale window; eligible for fanout.
    Healthy,
    /// Quiet past the stale window; retained but excluded from fanout.
    Stale,
    /// Reliable delivery gave up on this peer; excluded until traffic
    /// resumes.
    Unreachable,
}

/// Everything the node knows about one peer. Owned exclusively by the
/// [`crate::PeerTable`]; mutated only while processing this peer's traffic
/// or during the tick.
#[derive(Debug)]
pub struct PeerRecord {
    pub peer_id: PeerId,
    pub addr: SocketAddr,
    pub nick: String,
    pub first_seen_ms: u64,
    pub last_seen_ms: u64,
    /// Smoothed round-trip estimate from PING/PONG, if any.
    pub rtt_ms: Option<f64>,
    pub(crate) unreachable: bool,
    /// This peer's reliability session.
    pub link: ReliableLink,
}

impl PeerRecord {
    pub(crate) fn new(peer_id: PeerId, addr: SocketAddr, now_ms: u64) -> Self {
        let nick = peer_id.short().to_owned();
        Self {
            peer_id,
            addr,
            nick,
            first_seen_ms: now_ms,
            last_seen_ms: now_ms,
            rtt_ms: None,
            unreachable: false,
            link: ReliableLink::new(),
        }
    }

    pub fn liveness(&self, now_ms: u64, cfg: &PeerTableConfig) -> Liveness {
        if self.unreachable {
            return Liveness::Unreachable;
        }
        if now_ms.saturating_sub(self.last_seen_ms) > cfg.stale_after_ms {
            Liveness::Stale
        } else {
            Liveness::Healthy
        }
    }

    pub fn is_healthy(&self, now_ms: u64, cfg: &PeerTableConfig) -> bool {
        self.liveness(now_ms, cfg) == Liveness::Healthy
    }

    /// Fold a fresh RTT sample into the smoothed estimate.
    pub fn record_rtt(&mut self, sample_ms: f64) {
        self.rtt_ms = Some(match self.rtt_ms {
            Some(est) => est * (1.0 - RTT_SAMPLE_WEIGHT) + sample_ms * RTT_SAMPLE_WEIGHT,
            None => sample_ms,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PeerRecord {
        PeerRecord::new(
            PeerId::new("feedface00000000"),
            "10.0.0.9:39000".parse().unwrap(),
            1_000,
        )
    }

    #[test]
    fn test_nick_defaults_to_short_id() {
        assert_eq!(record().nick, "feedface");
    }

    #[test]
    fn test_liveness_transitions_with_silence() {
        let cfg = PeerTableConfig::default();
        let rec = record();
        assert_eq!(rec.liveness(1_000, &cfg), Liveness::Healthy);
        assert_eq!(
            rec.liveness(1_000 + cfg.stale_after_ms + 1, &cfg),
            Liveness::Stale
        );
    }

    #[test]
    fn test_rtt_smoothing() {
        let mut rec = record();
        rec.record_rtt(100.0);
        assert_eq!(rec.rtt_ms, Some(100.0));
        rec.record_rtt(200.0);
        let est = rec.rtt_ms.unwrap();
        assert!(est > 100.0 && est < 200.0);
    }
}
