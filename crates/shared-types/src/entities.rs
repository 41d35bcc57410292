//! # Wire Entities
//!
//! Data shapes that ride inside envelope payloads or are exchanged between
//! subsystems. Maps are `BTreeMap` so every serialization of the same value
//! is byte-identical regardless of insertion order.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{EventId, PeerId, ResourceKind, SectorId};

/// A peer's contact card as shared in `PEER_LIST` payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAdvert {
    pub id: PeerId,
    pub host: String,
    pub port: u16,
    pub nick: String,
}

/// An application-level change propagated through the mesh.
///
/// Immutable after creation except for `hops`, which each relaying node
/// increments. The payload is opaque to the transport: only `event_type`
/// and `hops` are interpreted below the consuming domain logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GossipEvent {
    /// Deduplication key; at most one application per node.
    pub event_id: EventId,
    /// Node that created the event.
    pub origin: PeerId,
    /// Domain tag, e.g. `"market_trade"` or `"battle"`.
    pub event_type: String,
    /// Opaque domain payload.
    pub payload: serde_json::Value,
    /// Relay distance from the origin so far.
    pub hops: u8,
}

/// A bounded state scope the reconciler can fingerprint and resynchronize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeId {
    /// One sector's market/port inventory.
    Sector(SectorId),
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeId::Sector(s) => write!(f, "sector:{s}"),
        }
    }
}

/// Compact fingerprint of a bounded state scope.
///
/// `as_of_ms` is carried for observability; application of a correction is
/// replace-on-receipt and does not gate on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDigest {
    pub scope: ScopeId,
    /// SHA-256 (hex) over the canonical encoding of the scope state.
    pub hash: String,
    pub as_of_ms: u64,
}

/// The reconcilable state of one sector: its port (if any) and local prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorInventory {
    pub sector: SectorId,
    /// Three-letter port class over Buy/Sell lanes, absent for portless sectors.
    pub port_class: Option<String>,
    /// Port stock per resource; empty for portless sectors.
    pub stock: BTreeMap<ResourceKind, i64>,
    /// Locally observed market prices per resource.
    pub prices: BTreeMap<ResourceKind, i64>,
}

impl SectorInventory {
    /// An empty inventory for a sector without a port.
    pub fn bare(sector: SectorId) -> Self {
        Self {
            sector,
            port_class: None,
            stock: BTreeMap::new(),
            prices: BTreeMap::new(),
        }
    }
}
