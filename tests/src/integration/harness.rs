//! In-memory mesh harness.
//!
//! Routes [`Outgoing`] frames between [`MeshNode`]s by simulated address.
//! Unicasts go to the node owning the target address; broadcasts reach
//! every other node, mimicking one LAN segment. Time is a plain `u64` the
//! test advances by hand.

use std::net::SocketAddr;

use serde_json::Value;

use node_runtime::config::NodeConfig;
use node_runtime::node::{MeshNode, Outgoing};
use node_runtime::store::MemoryWorldStore;
use node_runtime::Profile;
use shared_types::MeshPolicy;
use sm_03_peer_table::CandidateSource;
use sm_05_worldgen::{generate, WorldSeed};

/// Listen port shared by every simulated node (unique IPs).
pub const SIM_PORT: u16 = 39_000;
/// Sector count for simulated worlds; small keeps tests fast.
pub const SIM_SECTORS: u32 = 32;

pub struct SimNode {
    pub node: MeshNode,
    pub addr: SocketAddr,
}

/// A fully connected in-memory network of mesh nodes.
pub struct SimNet {
    pub nodes: Vec<SimNode>,
    /// Deliver every frame this many times (1 = clean network).
    pub duplicate_factor: usize,
    /// Whether LAN broadcasts reach the other nodes. Turn off to hold a
    /// constrained topology (line, ring) in place.
    pub deliver_broadcasts: bool,
}

impl SimNet {
    /// Build `n` nodes on the default policy.
    pub fn build(n: usize) -> Self {
        Self::build_with_policy(n, MeshPolicy::default())
    }

    /// Build `n` nodes sharing one policy document.
    pub fn build_with_policy(n: usize, policy: MeshPolicy) -> Self {
        let nodes = (0..n)
            .map(|i| {
                let node = build_node(&format!("sim{i}"), policy.clone());
                let addr = sim_addr(i);
                SimNode { node, addr }
            })
            .collect();
        Self {
            nodes,
            duplicate_factor: 1,
            deliver_broadcasts: true,
        }
    }

    pub fn node(&mut self, i: usize) -> &mut MeshNode {
        &mut self.nodes[i].node
    }

    pub fn peer_id(&self, i: usize) -> shared_types::PeerId {
        self.nodes[i].node.peer_id().clone()
    }

    /// Introduce node `a` to node `b`'s address and say hello.
    pub fn introduce(&mut self, a: usize, b: usize, now_ms: u64) {
        let addr = self.nodes[b].addr;
        self.nodes[a]
            .node
            .add_candidate(addr, CandidateSource::SeedConfig);
        self.nodes[a].node.announce(now_ms);
    }

    /// One delivery round: drain every node's outbound queue and deliver.
    /// Returns the number of frames delivered.
    pub fn step(&mut self, now_ms: u64) -> usize {
        let mut deliveries: Vec<(usize, SocketAddr, Vec<u8>)> = Vec::new();
        for i in 0..self.nodes.len() {
            let from = self.nodes[i].addr;
            for outgoing in self.nodes[i].node.drain_outbound() {
                match outgoing {
                    Outgoing::Unicast { addr, bytes } => {
                        if let Some(j) = self.nodes.iter().position(|n| n.addr == addr) {
                            deliveries.push((j, from, bytes));
                        }
                    }
                    Outgoing::Broadcast { bytes, .. } => {
                        if !self.deliver_broadcasts {
                            continue;
                        }
                        for j in 0..self.nodes.len() {
                            if j != i {
                                deliveries.push((j, from, bytes.clone()));
                            }
                        }
                    }
                }
            }
        }
        let mut count = 0;
        for (target, from, bytes) in deliveries {
            for _ in 0..self.duplicate_factor.max(1) {
                self.nodes[target].node.handle_datagram(&bytes, from, now_ms);
                count += 1;
            }
        }
        count
    }

    /// Step until no frames are in flight (bounded).
    pub fn settle(&mut self, now_ms: u64) {
        for _ in 0..32 {
            if self.step(now_ms) == 0 {
                break;
            }
        }
    }

    /// Tick every node, then settle deliveries.
    pub fn tick_all(&mut self, now_ms: u64) {
        for sim in &mut self.nodes {
            sim.node.tick(now_ms);
        }
        self.settle(now_ms);
    }

    /// Fully mesh every node with every other.
    pub fn connect_pairwise(&mut self, now_ms: u64) {
        for a in 0..self.nodes.len() {
            for b in 0..self.nodes.len() {
                if a != b {
                    self.introduce(a, b, now_ms);
                }
            }
        }
        self.settle(now_ms);
    }

    /// Connect nodes in a line: 0-1, 1-2, 2-3, ...
    pub fn connect_line(&mut self, now_ms: u64) {
        for i in 0..self.nodes.len().saturating_sub(1) {
            self.introduce(i, i + 1, now_ms);
            self.introduce(i + 1, i, now_ms);
        }
        self.settle(now_ms);
    }

    /// Emit a market trade from node `i` for its first port sector.
    pub fn emit_trade(&mut self, i: usize, qty: i64, side: &str, now_ms: u64) -> Value {
        let sector = self.nodes[i].node.store().port_sectors()[0];
        let payload = serde_json::json!({
            "sector": sector,
            "resource": "ore",
            "qty": qty,
            "side": side,
        });
        self.nodes[i]
            .node
            .broadcast_event("market_trade", payload.clone(), now_ms);
        payload
    }
}

pub fn sim_addr(i: usize) -> SocketAddr {
    format!("10.44.0.{}:{SIM_PORT}", i + 1).parse().unwrap()
}

/// One node on the shared sim world, with a unique identity.
pub fn build_node(nick: &str, policy: MeshPolicy) -> MeshNode {
    let mut profile = Profile::create(nick.into(), ("0.0.0.0".into(), SIM_PORT), "alpha".into());
    profile.sector_count = SIM_SECTORS;
    let (cfg, key) = NodeConfig::from_profile(&profile, policy).expect("sim profile is valid");
    let map = generate(&WorldSeed::new(
        cfg.shard.name.clone(),
        cfg.shard.epoch,
        SIM_SECTORS,
    ));
    MeshNode::new(cfg, key, Box::new(MemoryWorldStore::new(&map)), 0)
}
