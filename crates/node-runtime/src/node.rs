//! The mesh node orchestrator.
//!
//! [`MeshNode`] owns every piece of mesh state — peer table, gossip engine,
//! reconciler, netsplit tracker, packet gate, world store — and is entirely
//! transport-free: datagrams go in through [`MeshNode::handle_datagram`],
//! time advances through [`MeshNode::tick`], and anything to transmit comes
//! back out of [`MeshNode::drain_outbound`]. The UDP endpoint in `main`
//! just shuttles bytes; tests drive nodes with a synthetic clock and an
//! in-memory network.
//!
//! Sequencing convention: unicast traffic to a known peer rides that
//! peer's reliability link (sequences from 1). Broadcast and first-contact
//! probes are unsequenced (`seq == 0`), never reliable, and skip the
//! per-peer window entirely so they cannot pollute it.

use std::collections::HashSet;
use std::net::SocketAddr;

use serde_json::{json, Value};
use tracing::{debug, trace, warn};

use shared_crypto::hashing::sha256_hex;
use shared_crypto::ShardKey;
use shared_types::{GossipEvent, NodeEvent, PacketGate, PeerId, ResourceKind, ScopeId, SectorId};
use sm_01_envelope::{codec, DecodeError, Envelope, EnvelopeFlags, WirePayload, PROTOCOL_VERSION};
use sm_02_reliability::Receipt;
use sm_03_peer_table::{CandidateSource, NetsplitTracker, PeerTable};
use sm_04_gossip::{Disposition, EventSink, GossipEngine};
use sm_05_worldgen::{price_at_slot, slot_for};
use sm_06_snapshot::{digest_inventory, inventory_hash, Reconciler};

use crate::config::NodeConfig;
use crate::store::WorldStore;

/// A datagram the control loop should put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Unicast { addr: SocketAddr, bytes: Vec<u8> },
    /// LAN broadcast to the shard's listen port.
    Broadcast { port: u16, bytes: Vec<u8> },
}

/// Read-only health snapshot for the host.
#[derive(Debug, Clone, Default)]
pub struct NodeMetrics {
    pub peer_count: usize,
    pub healthy_peers: usize,
    pub pending_packets: usize,
    pub events_seen: u64,
    pub auth_failures: u64,
    pub version_rejected: u64,
    pub epoch_rejected: u64,
    pub malformed: u64,
    pub netsplit_active: bool,
    pub merge_count: u32,
    pub seen_cache: usize,
}

#[derive(Debug, Default)]
struct Counters {
    events_seen: u64,
    auth_failures: u64,
    version_rejected: u64,
    epoch_rejected: u64,
    malformed: u64,
}

/// Applies deduplicated gossip to the world store.
struct StoreSink<'a> {
    store: &'a mut dyn WorldStore,
    now_ms: u64,
}

impl EventSink for StoreSink<'_> {
    fn apply(&mut self, event: &GossipEvent) -> bool {
        self.store.apply_event(event, self.now_ms)
    }
}

/// One node's complete mesh state. Mutated only from the control loop.
pub struct MeshNode {
    cfg: NodeConfig,
    key: ShardKey,
    codec_policy: codec::CodecPolicy,
    peers: PeerTable,
    gossip: GossipEngine,
    reconciler: Reconciler,
    netsplit: NetsplitTracker,
    gate: PacketGate,
    store: Box<dyn WorldStore>,
    counters: Counters,
    outbound: Vec<Outgoing>,
    events_out: Vec<NodeEvent>,
    /// The sector this node's ship currently occupies.
    sector: SectorId,
    alliance: Option<String>,
    last_announce_ms: u64,
    last_ping_ms: u64,
    last_digest_ms: u64,
    last_market_slot: Option<u64>,
}

impl MeshNode {
    pub fn new(cfg: NodeConfig, key: ShardKey, store: Box<dyn WorldStore>, now_ms: u64) -> Self {
        let codec_policy = codec::CodecPolicy::new(
            cfg.policy.min_protocol_version,
            cfg.policy.max_protocol_version,
            cfg.shard.clone(),
        );
        Self {
            codec_policy,
            peers: PeerTable::new(cfg.peer_id.clone(), cfg.peer_table),
            gossip: GossipEngine::new(cfg.gossip),
            reconciler: Reconciler::new(cfg.reconcile),
            netsplit: NetsplitTracker::new(now_ms),
            gate: PacketGate::new(cfg.policy.packets_per_sec),
            store,
            counters: Counters::default(),
            outbound: Vec::new(),
            events_out: Vec::new(),
            sector: 1,
            alliance: None,
            last_announce_ms: 0,
            last_ping_ms: 0,
            last_digest_ms: 0,
            last_market_slot: None,
            key,
            cfg,
        }
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.cfg.peer_id
    }

    pub fn alliance(&self) -> Option<&str> {
        self.alliance.as_deref()
    }

    pub fn store(&self) -> &dyn WorldStore {
        self.store.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut dyn WorldStore {
        self.store.as_mut()
    }

    /// Feed a candidate address from any discovery source.
    pub fn add_candidate(&mut self, addr: SocketAddr, source: CandidateSource) {
        self.peers.upsert_candidate(addr, source);
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// Process one inbound datagram. Silent on every rejection.
    pub fn handle_datagram(&mut self, bytes: &[u8], from: SocketAddr, now_ms: u64) {
        if !self.gate.try_acquire(from, now_ms) {
            return;
        }

        let envelope = match codec::decode(bytes, &self.key, &self.codec_policy) {
            Ok(env) => env,
            Err(err) => {
                match err {
                    DecodeError::AuthenticationFailure => self.counters.auth_failures += 1,
                    DecodeError::VersionRejected { .. } => self.counters.version_rejected += 1,
                    DecodeError::ShardMismatch { .. } | DecodeError::EpochMismatch { .. } => {
                        self.counters.epoch_rejected += 1
                    }
                    DecodeError::Malformed(_) => self.counters.malformed += 1,
                }
                trace!(%from, %err, "datagram rejected");
                return;
            }
        };

        // Our own LAN broadcasts echo back; drop them.
        if envelope.sender == self.cfg.peer_id {
            return;
        }
        let sender = envelope.sender.clone();

        if self.netsplit.on_peer_seen(now_ms) {
            self.events_out.push(NodeEvent::NetsplitChanged {
                active: false,
                merges: self.netsplit.merge_count(),
            });
        }

        let announce_online = {
            let Some(observed) = self.peers.observe(&sender, from, now_ms) else {
                return;
            };
            observed.newly_admitted || observed.came_back
        };

        // Reliability bookkeeping; sequence 0 is unsequenced traffic.
        if envelope.seq != 0 {
            let Some(record) = self.peers.get_mut(&sender) else {
                return;
            };
            record.link.apply_ack(envelope.ack, envelope.ack_bits);
            let receipt = record.link.observe_incoming(envelope.seq);
            if envelope.flags.reliable {
                record.link.mark_ack_owed(now_ms);
            }
            if receipt == Receipt::Duplicate {
                // Re-acked via the owed-ACK path; never redelivered.
                return;
            }
        }

        if !envelope.flags.ack_only {
            self.dispatch(envelope, sender.clone(), from, now_ms);
        }

        // Announced after dispatch so a HELLO's nick makes it into the
        // notification.
        if announce_online {
            if let Some(record) = self.peers.get(&sender) {
                self.events_out.push(NodeEvent::PeerOnline {
                    peer_id: sender,
                    nick: record.nick.clone(),
                    addr: record.addr,
                });
            }
        }
    }

    /// Explicit dispatch over the payload variants.
    fn dispatch(&mut self, envelope: Envelope, sender: PeerId, from: SocketAddr, now_ms: u64) {
        match envelope.payload {
            WirePayload::Hello { nick, port, .. } => {
                let advertised = SocketAddr::new(from.ip(), port);
                if let Some(record) = self.peers.get_mut(&sender) {
                    record.nick = nick;
                    record.addr = advertised;
                }
                let peers = self.peers.adverts(now_ms);
                self.send_to_peer(&sender, WirePayload::PeerList { peers }, false, now_ms);
            }

            WirePayload::PeerList { peers } => {
                for advert in peers {
                    if advert.id == self.cfg.peer_id {
                        continue;
                    }
                    let Ok(ip) = advert.host.parse() else {
                        continue;
                    };
                    self.peers.upsert_candidate(
                        SocketAddr::new(ip, advert.port),
                        CandidateSource::PeerExchange,
                    );
                }
            }

            WirePayload::Ping { ts_ms } => {
                self.send_to_peer(&sender, WirePayload::Pong { ts_ms }, false, now_ms);
            }

            WirePayload::Pong { ts_ms } => {
                if ts_ms > 0 && now_ms >= ts_ms {
                    let sample = (now_ms - ts_ms) as f64;
                    if let Some(record) = self.peers.get_mut(&sender) {
                        record.record_rtt(sample);
                    }
                }
            }

            WirePayload::EventBatch { events } => {
                let mut relays = Vec::new();
                for event in &events {
                    self.counters.events_seen += 1;
                    let mut sink = StoreSink {
                        store: self.store.as_mut(),
                        now_ms,
                    };
                    match self.gossip.ingest(event, now_ms, &mut sink) {
                        Disposition::Applied { relay: Some(fwd) } => relays.push(fwd),
                        Disposition::Applied { relay: None }
                        | Disposition::Duplicate
                        | Disposition::HopExceeded => {}
                    }
                }
                if !relays.is_empty() {
                    self.fanout_events(&relays, Some(&sender), now_ms);
                }
            }

            WirePayload::SnapshotHash { digest } => {
                let local_hash = self.local_hash_for(digest.scope);
                if let Some(scope) =
                    self.reconciler
                        .on_remote_digest(&digest, local_hash.as_deref(), now_ms)
                {
                    self.send_to_peer(&sender, WirePayload::SnapshotReq { scope }, false, now_ms);
                }
            }

            WirePayload::SnapshotReq { scope } => {
                let ScopeId::Sector(sector) = scope;
                if let Some(inventory) = self.store.sector_inventory(sector) {
                    let hash = inventory_hash(&inventory);
                    self.send_to_peer(
                        &sender,
                        WirePayload::SnapshotRes {
                            scope,
                            inventory,
                            hash,
                        },
                        false,
                        now_ms,
                    );
                }
            }

            WirePayload::SnapshotRes {
                scope, inventory, ..
            } => {
                let ScopeId::Sector(sector) = scope;
                if inventory.sector != sector {
                    debug!(%scope, got = inventory.sector, "snapshot scope mismatch, dropped");
                    return;
                }
                if self.reconciler.on_response(scope) {
                    self.store.replace_sector_inventory(inventory);
                    self.events_out.push(NodeEvent::ScopeRepaired {
                        scope,
                        from: sender,
                    });
                }
            }

            WirePayload::AllianceInvite {
                target,
                alliance_id,
                ..
            } => {
                if target != self.cfg.peer_id {
                    return;
                }
                self.alliance = Some(alliance_id.clone());
                self.send_to_peer(
                    &sender,
                    WirePayload::AllianceAccept {
                        alliance_id: alliance_id.clone(),
                    },
                    true,
                    now_ms,
                );
                self.broadcast_event(
                    "alliance_join",
                    json!({
                        "player_id": self.cfg.peer_id,
                        "alliance_id": alliance_id,
                    }),
                    now_ms,
                );
                self.events_out.push(NodeEvent::AllianceJoined {
                    alliance_id,
                    invited_by: sender,
                });
            }

            WirePayload::AllianceAccept { alliance_id } => {
                debug!(peer = %sender, alliance_id, "alliance invite accepted");
            }

            WirePayload::Chat { nick, text } => {
                self.events_out.push(NodeEvent::ChatReceived {
                    from: sender,
                    nick,
                    text,
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Outbound application surface
    // ------------------------------------------------------------------

    /// Create a local event and fan it out to the mesh. This is the one
    /// entry point consuming domain logic uses to publish changes.
    pub fn broadcast_event(
        &mut self,
        event_type: &str,
        payload: Value,
        now_ms: u64,
    ) -> GossipEvent {
        let event = self
            .gossip
            .create_event(&self.cfg.peer_id, event_type, payload, now_ms);
        self.store.apply_event(&event, now_ms);
        self.fanout_events(std::slice::from_ref(&event), None, now_ms);
        event
    }

    /// Send a chat line to every healthy peer.
    pub fn send_chat(&mut self, text: &str, now_ms: u64) {
        let reliable = self.cfg.policy.is_reliable("chat");
        let targets = self.peers.fanout_targets(now_ms, &HashSet::new());
        for (peer_id, _) in targets {
            self.send_to_peer(
                &peer_id,
                WirePayload::Chat {
                    nick: self.cfg.nick.clone(),
                    text: text.to_owned(),
                },
                reliable,
                now_ms,
            );
        }
    }

    /// Invite a peer into this node's alliance, creating one if needed.
    pub fn invite_to_alliance(&mut self, target: &PeerId, now_ms: u64) -> Option<String> {
        self.peers.get(target)?;
        let alliance_id = self.alliance.clone().unwrap_or_else(|| {
            let raw = format!("{}:{}", self.cfg.peer_id, self.cfg.nick);
            let id = sha256_hex(raw.as_bytes())[..16].to_owned();
            self.alliance = Some(id.clone());
            id
        });
        self.send_to_peer(
            target,
            WirePayload::AllianceInvite {
                target: target.clone(),
                alliance_id: alliance_id.clone(),
                alliance_name: format!("{}-alliance", self.cfg.nick),
            },
            true,
            now_ms,
        );
        Some(alliance_id)
    }

    /// Announce presence to every candidate and the local network.
    pub fn announce(&mut self, now_ms: u64) {
        self.last_announce_ms = now_ms;
        let hello = WirePayload::Hello {
            nick: self.cfg.nick.clone(),
            port: self.cfg.listen_port,
            sector: self.sector,
        };
        let candidates: Vec<SocketAddr> =
            self.peers.candidates().iter().map(|c| c.addr).collect();
        for addr in candidates {
            self.send_unsequenced(addr, hello.clone(), now_ms);
        }
        self.send_broadcast(hello, now_ms);
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// The periodic tick: retransmits, silent ACKs, liveness, GC, announce
    /// and ping rounds, market drift, and the snapshot digest round. All
    /// timeouts in the node are evaluated here; nothing blocks.
    pub fn tick(&mut self, now_ms: u64) {
        self.drift_market(now_ms);
        self.scan_retransmits(now_ms);
        self.flush_silent_acks(now_ms);

        for peer_id in self.peers.evict_expired(now_ms) {
            self.events_out.push(NodeEvent::PeerExpired { peer_id });
        }
        self.gossip.gc(now_ms);
        self.gate.prune(now_ms);

        if now_ms.saturating_sub(self.last_announce_ms) >= self.cfg.announce_interval_ms {
            self.announce(now_ms);
        }
        if now_ms.saturating_sub(self.last_ping_ms) >= self.cfg.ping_interval_ms {
            self.last_ping_ms = now_ms;
            self.ping_round(now_ms);
        }
        if now_ms.saturating_sub(self.last_digest_ms) >= self.cfg.snapshot_interval_ms {
            self.last_digest_ms = now_ms;
            self.digest_round(now_ms);
        }

        self.reconciler.tick(now_ms);

        let healthy = self.peers.healthy_count(now_ms);
        if self
            .netsplit
            .tick(healthy, now_ms, NetsplitTracker::DEFAULT_TIMEOUT_MS)
        {
            self.events_out.push(NodeEvent::NetsplitChanged {
                active: true,
                merges: self.netsplit.merge_count(),
            });
        }
    }

    fn drift_market(&mut self, now_ms: u64) {
        let slot = slot_for(now_ms);
        if self.last_market_slot == Some(slot) {
            return;
        }
        self.last_market_slot = Some(slot);
        for res in ResourceKind::ALL {
            let price = price_at_slot(&self.cfg.shard.name, self.cfg.shard.epoch, slot, res);
            self.store.set_price(res, price);
        }
    }

    fn scan_retransmits(&mut self, now_ms: u64) {
        let mut resends = Vec::new();
        let mut abandoned = Vec::new();
        for record in self.peers.records_mut() {
            let scan = record.link.scan_retransmits(now_ms, &self.cfg.reliability);
            for (_, bytes) in scan.resend {
                resends.push((record.addr, bytes));
            }
            for msg in scan.abandoned {
                abandoned.push((record.peer_id.clone(), msg.seq, msg.msg_type));
            }
        }
        for (addr, bytes) in resends {
            self.outbound.push(Outgoing::Unicast { addr, bytes });
        }
        for (peer_id, seq, msg_type) in abandoned {
            self.peers.mark_unreachable(&peer_id);
            self.events_out.push(NodeEvent::DeliveryAbandoned {
                peer_id,
                seq,
                msg_type,
            });
        }
    }

    fn flush_silent_acks(&mut self, now_ms: u64) {
        let due: Vec<PeerId> = self
            .peers
            .records()
            .filter(|r| r.link.ack_flush_due(now_ms, &self.cfg.reliability))
            .map(|r| r.peer_id.clone())
            .collect();
        for peer_id in due {
            self.send_ack_only(&peer_id, now_ms);
        }
    }

    fn ping_round(&mut self, now_ms: u64) {
        let targets = self.peers.fanout_targets(now_ms, &HashSet::new());
        for (peer_id, _) in targets {
            self.send_to_peer(&peer_id, WirePayload::Ping { ts_ms: now_ms }, false, now_ms);
        }
    }

    /// Advertise the digest of the next scope in the rotation.
    fn digest_round(&mut self, now_ms: u64) {
        let scopes: Vec<ScopeId> = self
            .store
            .port_sectors()
            .into_iter()
            .map(ScopeId::Sector)
            .collect();
        let Some(scope) = self.reconciler.next_scope(&scopes) else {
            return;
        };
        let ScopeId::Sector(sector) = scope;
        let Some(inventory) = self.store.sector_inventory(sector) else {
            return;
        };
        let digest = digest_inventory(&inventory, now_ms);
        let targets = self.peers.fanout_targets(now_ms, &HashSet::new());
        for (peer_id, _) in targets {
            self.send_to_peer(
                &peer_id,
                WirePayload::SnapshotHash {
                    digest: digest.clone(),
                },
                false,
                now_ms,
            );
        }
        self.send_broadcast(WirePayload::SnapshotHash { digest }, now_ms);
    }

    // ------------------------------------------------------------------
    // Drains and metrics
    // ------------------------------------------------------------------

    pub fn drain_outbound(&mut self) -> Vec<Outgoing> {
        std::mem::take(&mut self.outbound)
    }

    pub fn drain_events(&mut self) -> Vec<NodeEvent> {
        std::mem::take(&mut self.events_out)
    }

    pub fn metrics(&self, now_ms: u64) -> NodeMetrics {
        NodeMetrics {
            peer_count: self.peers.len(),
            healthy_peers: self.peers.healthy_count(now_ms),
            pending_packets: self.peers.pending_total(),
            events_seen: self.counters.events_seen,
            auth_failures: self.counters.auth_failures,
            version_rejected: self.counters.version_rejected,
            epoch_rejected: self.counters.epoch_rejected,
            malformed: self.counters.malformed,
            netsplit_active: self.netsplit.split_active(),
            merge_count: self.netsplit.merge_count(),
            seen_cache: self.gossip.seen_len(),
        }
    }

    // ------------------------------------------------------------------
    // Send paths
    // ------------------------------------------------------------------

    /// Fan events out to healthy peers (minus the one we got them from),
    /// splitting the batch by delivery class.
    fn fanout_events(&mut self, events: &[GossipEvent], exclude: Option<&PeerId>, now_ms: u64) {
        let mut excluded = HashSet::new();
        if let Some(peer) = exclude {
            excluded.insert(peer.clone());
        }
        let targets = self.peers.fanout_targets(now_ms, &excluded);
        if targets.is_empty() {
            // Nobody known yet: fall back to the local network.
            self.send_broadcast(
                WirePayload::EventBatch {
                    events: events.to_vec(),
                },
                now_ms,
            );
            return;
        }
        let selected = self.gossip.config().fanout.select(targets);

        let (reliable, fire_and_forget): (Vec<GossipEvent>, Vec<GossipEvent>) = events
            .iter()
            .cloned()
            .partition(|e| self.cfg.policy.is_reliable(&e.event_type));

        for (batch, reliable) in [(reliable, true), (fire_and_forget, false)] {
            if batch.is_empty() {
                continue;
            }
            for (peer_id, _) in &selected {
                self.send_to_peer(
                    peer_id,
                    WirePayload::EventBatch {
                        events: batch.clone(),
                    },
                    reliable,
                    now_ms,
                );
            }
        }
    }

    /// Unicast to a known peer over its reliability link.
    fn send_to_peer(&mut self, peer_id: &PeerId, payload: WirePayload, reliable: bool, now_ms: u64) {
        let msg_type = payload.msg_type().as_str();
        let Some(record) = self.peers.get_mut(peer_id) else {
            return;
        };
        let addr = record.addr;
        let seq = record.link.next_seq();
        let snapshot = record.link.ack_snapshot();
        let envelope = Envelope {
            version: PROTOCOL_VERSION,
            sender: self.cfg.peer_id.clone(),
            seq,
            ack: snapshot.ack,
            ack_bits: snapshot.ack_bits,
            timestamp_ms: now_ms,
            shard: self.cfg.shard.clone(),
            flags: EnvelopeFlags {
                reliable,
                ack_only: false,
            },
            payload,
        };
        match codec::encode(&envelope, &self.key) {
            Ok(bytes) => {
                if reliable {
                    record.link.track_pending(seq, bytes.clone(), msg_type, now_ms);
                }
                record.link.clear_ack_owed();
                self.outbound.push(Outgoing::Unicast { addr, bytes });
            }
            Err(err) => warn!(%err, msg_type, "encode failed"),
        }
    }

    /// A dedicated acknowledgment when no traffic has piggybacked one.
    fn send_ack_only(&mut self, peer_id: &PeerId, now_ms: u64) {
        let Some(record) = self.peers.get_mut(peer_id) else {
            return;
        };
        let addr = record.addr;
        let seq = record.link.next_seq();
        let snapshot = record.link.ack_snapshot();
        let envelope = Envelope {
            version: PROTOCOL_VERSION,
            sender: self.cfg.peer_id.clone(),
            seq,
            ack: snapshot.ack,
            ack_bits: snapshot.ack_bits,
            timestamp_ms: now_ms,
            shard: self.cfg.shard.clone(),
            flags: EnvelopeFlags {
                reliable: false,
                ack_only: true,
            },
            payload: WirePayload::Pong { ts_ms: 0 },
        };
        match codec::encode(&envelope, &self.key) {
            Ok(bytes) => {
                record.link.clear_ack_owed();
                self.outbound.push(Outgoing::Unicast { addr, bytes });
            }
            Err(err) => warn!(%err, "ack-only encode failed"),
        }
    }

    /// First-contact unicast (candidate probe); unsequenced.
    fn send_unsequenced(&mut self, addr: SocketAddr, payload: WirePayload, now_ms: u64) {
        let envelope = self.unsequenced_envelope(payload, now_ms);
        match codec::encode(&envelope, &self.key) {
            Ok(bytes) => self.outbound.push(Outgoing::Unicast { addr, bytes }),
            Err(err) => warn!(%err, "encode failed"),
        }
    }

    /// LAN broadcast; unsequenced.
    fn send_broadcast(&mut self, payload: WirePayload, now_ms: u64) {
        let envelope = self.unsequenced_envelope(payload, now_ms);
        match codec::encode(&envelope, &self.key) {
            Ok(bytes) => self.outbound.push(Outgoing::Broadcast {
                port: self.cfg.listen_port,
                bytes,
            }),
            Err(err) => warn!(%err, "encode failed"),
        }
    }

    fn unsequenced_envelope(&self, payload: WirePayload, now_ms: u64) -> Envelope {
        Envelope {
            version: PROTOCOL_VERSION,
            sender: self.cfg.peer_id.clone(),
            seq: 0,
            ack: 0,
            ack_bits: 0,
            timestamp_ms: now_ms,
            shard: self.cfg.shard.clone(),
            flags: EnvelopeFlags::default(),
            payload,
        }
    }

    fn local_hash_for(&self, scope: ScopeId) -> Option<String> {
        let ScopeId::Sector(sector) = scope;
        self.store
            .sector_inventory(sector)
            .map(|inv| inventory_hash(&inv))
    }
}
