//! Local node notifications.
//!
//! These never ride the wire: they are drained by whatever is hosting the
//! node (the terminal front end, a bot harness, a test) to observe what the
//! mesh layer did. None of them is fatal.

use std::net::SocketAddr;

use crate::entities::ScopeId;
use crate::ids::PeerId;

/// A notification surfaced by the mesh layer to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeEvent {
    /// A peer was admitted or came back after being stale.
    PeerOnline {
        peer_id: PeerId,
        nick: String,
        addr: SocketAddr,
    },
    /// A peer was evicted after its liveness grace period lapsed.
    PeerExpired { peer_id: PeerId },
    /// A reliable message exceeded its retry ceiling; the peer was demoted
    /// to unreachable but kept in the table.
    DeliveryAbandoned {
        peer_id: PeerId,
        seq: u64,
        msg_type: &'static str,
    },
    /// A chat line arrived.
    ChatReceived {
        from: PeerId,
        nick: String,
        text: String,
    },
    /// Another node invited this one into an alliance (already auto-joined).
    AllianceJoined {
        alliance_id: String,
        invited_by: PeerId,
    },
    /// A divergent scope was replaced with a peer's authoritative copy.
    ScopeRepaired { scope: ScopeId, from: PeerId },
    /// The netsplit detector changed state.
    NetsplitChanged { active: bool, merges: u32 },
}
