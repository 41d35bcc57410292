//! The envelope: header, flags, and the tagged payload enum.

use serde::{Deserialize, Serialize};

use shared_types::{
    GossipEvent, PeerAdvert, PeerId, ScopeId, SectorId, SectorInventory, ShardId, StateDigest,
};

/// Current wire protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

/// Delivery flags carried by every envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeFlags {
    /// Retransmitted until acknowledged or abandoned.
    pub reliable: bool,
    /// Sent purely to acknowledge; carries no application traffic.
    pub ack_only: bool,
}

/// One wire message. Immutable once constructed; one instance per
/// transmitted or received datagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub version: u16,
    pub sender: PeerId,
    /// Sender's sequence number toward the addressed peer.
    pub seq: u64,
    /// Highest sequence received from the addressed peer.
    pub ack: u64,
    /// Bit k acknowledges sequence `ack - 1 - k`.
    pub ack_bits: u64,
    pub timestamp_ms: u64,
    pub shard: ShardId,
    pub flags: EnvelopeFlags,
    pub payload: WirePayload,
}

impl Envelope {
    pub fn msg_type(&self) -> MessageType {
        self.payload.msg_type()
    }
}

/// Message type tags, used for dispatch logging and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    Hello,
    PeerList,
    Ping,
    Pong,
    EventBatch,
    SnapshotHash,
    SnapshotReq,
    SnapshotRes,
    AllianceInvite,
    AllianceAccept,
    Chat,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Hello => "HELLO",
            MessageType::PeerList => "PEER_LIST",
            MessageType::Ping => "PING",
            MessageType::Pong => "PONG",
            MessageType::EventBatch => "EVENT_BATCH",
            MessageType::SnapshotHash => "SNAPSHOT_HASH",
            MessageType::SnapshotReq => "SNAPSHOT_REQ",
            MessageType::SnapshotRes => "SNAPSHOT_RES",
            MessageType::AllianceInvite => "ALLIANCE_INVITE",
            MessageType::AllianceAccept => "ALLIANCE_ACCEPT",
            MessageType::Chat => "CHAT",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload variants, one per message type.
///
/// Dispatch is an explicit `match` in the control loop, never open-ended
/// handler registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WirePayload {
    Hello {
        nick: String,
        /// The sender's listen port; the host comes from the datagram source.
        port: u16,
        sector: SectorId,
    },
    PeerList {
        peers: Vec<PeerAdvert>,
    },
    Ping {
        ts_ms: u64,
    },
    Pong {
        ts_ms: u64,
    },
    EventBatch {
        events: Vec<GossipEvent>,
    },
    SnapshotHash {
        digest: StateDigest,
    },
    SnapshotReq {
        scope: ScopeId,
    },
    SnapshotRes {
        scope: ScopeId,
        inventory: SectorInventory,
        hash: String,
    },
    AllianceInvite {
        target: PeerId,
        alliance_id: String,
        alliance_name: String,
    },
    AllianceAccept {
        alliance_id: String,
    },
    Chat {
        nick: String,
        text: String,
    },
}

impl WirePayload {
    pub fn msg_type(&self) -> MessageType {
        match self {
            WirePayload::Hello { .. } => MessageType::Hello,
            WirePayload::PeerList { .. } => MessageType::PeerList,
            WirePayload::Ping { .. } => MessageType::Ping,
            WirePayload::Pong { .. } => MessageType::Pong,
            WirePayload::EventBatch { .. } => MessageType::EventBatch,
            WirePayload::SnapshotHash { .. } => MessageType::SnapshotHash,
            WirePayload::SnapshotReq { .. } => MessageType::SnapshotReq,
            WirePayload::SnapshotRes { .. } => MessageType::SnapshotRes,
            WirePayload::AllianceInvite { .. } => MessageType::AllianceInvite,
            WirePayload::AllianceAccept { .. } => MessageType::AllianceAccept,
            WirePayload::Chat { .. } => MessageType::Chat,
        }
    }
}
