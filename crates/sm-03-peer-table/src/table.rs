//! The peer table proper.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use tracing::{debug, info};

use shared_types::{PeerAdvert, PeerId};

use crate::candidates::{Candidate, CandidateSource};
use crate::record::PeerRecord;

/// Liveness and capacity knobs, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct PeerTableConfig {
    /// Quiet peers become stale (no fanout) after this long.
    pub stale_after_ms: u64,
    /// Stale peers are evicted after this long without any traffic.
    pub evict_after_ms: u64,
    /// Candidate list cap; oldest entries win ties.
    pub max_candidates: usize,
}

impl Default for PeerTableConfig {
    fn default() -> Self {
        Self {
            stale_after_ms: 30_000,
            evict_after_ms: 240_000,
            max_candidates: 64,
        }
    }
}

/// Outcome of observing traffic from a peer.
pub struct ObservedPeer<'a> {
    pub record: &'a mut PeerRecord,
    /// First time this peer id was admitted.
    pub newly_admitted: bool,
    /// Peer was stale or unreachable and traffic resumed.
    pub came_back: bool,
}

/// All peers this node knows, plus not-yet-identified candidate addresses.
#[derive(Debug)]
pub struct PeerTable {
    local_id: PeerId,
    cfg: PeerTableConfig,
    peers: HashMap<PeerId, PeerRecord>,
    candidates: Vec<Candidate>,
}

impl PeerTable {
    pub fn new(local_id: PeerId, cfg: PeerTableConfig) -> Self {
        Self {
            local_id,
            cfg,
            peers: HashMap::new(),
            candidates: Vec::new(),
        }
    }

    pub fn config(&self) -> &PeerTableConfig {
        &self.cfg
    }

    /// Uniform candidate entry point for every discovery source. Ordered
    /// dedup by address, capped; preserves the order candidates arrived in.
    pub fn upsert_candidate(&mut self, addr: SocketAddr, source: CandidateSource) -> bool {
        if self.candidates.iter().any(|c| c.addr == addr) {
            return false;
        }
        if self.candidates.len() >= self.cfg.max_candidates {
            return false;
        }
        debug!(%addr, source = source.as_str(), "candidate observed");
        self.candidates.push(Candidate { addr, source });
        true
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Record authenticated traffic from `peer_id` at `addr`. Admits the
    /// peer if unknown, tracks address churn, and revives stale or
    /// unreachable peers. Returns `None` for our own id — the table never
    /// admits self.
    pub fn observe(
        &mut self,
        peer_id: &PeerId,
        addr: SocketAddr,
        now_ms: u64,
    ) -> Option<ObservedPeer<'_>> {
        if *peer_id == self.local_id {
            return None;
        }

        let newly_admitted = !self.peers.contains_key(peer_id);
        let record = self
            .peers
            .entry(peer_id.clone())
            .or_insert_with(|| PeerRecord::new(peer_id.clone(), addr, now_ms));

        let came_back = !newly_admitted
            && (record.unreachable
                || now_ms.saturating_sub(record.last_seen_ms) > self.cfg.stale_after_ms);

        record.addr = addr;
        record.last_seen_ms = now_ms;
        record.unreachable = false;

        if newly_admitted {
            info!(peer = %peer_id, %addr, "peer admitted");
        }

        Some(ObservedPeer {
            record,
            newly_admitted,
            came_back,
        })
    }

    pub fn get(&self, peer_id: &PeerId) -> Option<&PeerRecord> {
        self.peers.get(peer_id)
    }

    pub fn get_mut(&mut self, peer_id: &PeerId) -> Option<&mut PeerRecord> {
        self.peers.get_mut(peer_id)
    }

    /// Demote a peer whose reliable queue was abandoned. Kept in the table;
    /// any future traffic revives it.
    pub fn mark_unreachable(&mut self, peer_id: &PeerId) -> bool {
        match self.peers.get_mut(peer_id) {
            Some(record) => {
                record.unreachable = true;
                debug!(peer = %peer_id, "peer demoted to unreachable");
                true
            }
            None => false,
        }
    }

    /// Drop peers silent past the eviction grace period.
    pub fn evict_expired(&mut self, now_ms: u64) -> Vec<PeerId> {
        let evict_after = self.cfg.evict_after_ms;
        let evicted: Vec<PeerId> = self
            .peers
            .values()
            .filter(|r| now_ms.saturating_sub(r.last_seen_ms) > evict_after)
            .map(|r| r.peer_id.clone())
            .collect();
        for peer_id in &evicted {
            self.peers.remove(peer_id);
            info!(peer = %peer_id, "peer evicted after liveness timeout");
        }
        evicted
    }

    /// Healthy peers eligible for gossip fanout, minus `exclude`.
    pub fn fanout_targets(
        &self,
        now_ms: u64,
        exclude: &HashSet<PeerId>,
    ) -> Vec<(PeerId, SocketAddr)> {
        self.peers
            .values()
            .filter(|r| r.is_healthy(now_ms, &self.cfg) && !exclude.contains(&r.peer_id))
            .map(|r| (r.peer_id.clone(), r.addr))
            .collect()
    }

    /// Contact cards of healthy peers, shared in `PEER_LIST` replies.
    pub fn adverts(&self, now_ms: u64) -> Vec<PeerAdvert> {
        self.peers
            .values()
            .filter(|r| r.is_healthy(now_ms, &self.cfg))
            .map(|r| PeerAdvert {
                id: r.peer_id.clone(),
                host: r.addr.ip().to_string(),
                port: r.addr.port(),
                nick: r.nick.clone(),
            })
            .collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &PeerRecord> {
        self.peers.values()
    }

    pub fn records_mut(&mut self) -> impl Iterator<Item = &mut PeerRecord> {
        self.peers.values_mut()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn healthy_count(&self, now_ms: u64) -> usize {
        self.peers
            .values()
            .filter(|r| r.is_healthy(now_ms, &self.cfg))
            .count()
    }

    /// Total reliable messages still awaiting acknowledgment, across peers.
    pub fn pending_total(&self) -> usize {
        self.peers.values().map(|r| r.link.pending_len()).sum()
    }
}
