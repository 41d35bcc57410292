//! # Identifiers
//!
//! Newtypes for the ids that cross subsystem boundaries. All of them are
//! cheap to clone and hash; `PeerId` and `EventId` are lowercase-hex strings
//! derived by `shared-crypto`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A sector number, 1-based.
pub type SectorId = u32;

/// Stable identity of a mesh node.
///
/// Derived once at startup as the first 32 hex characters of the SHA-256 of
/// the node's private secret; never reused across secrets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for logs and nick fallbacks.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Deduplication key of a gossip event (24 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The shard a node participates in.
///
/// Nodes in different shards, or in the same shard at different protocol
/// epochs, never interoperate: the shard key (and therefore every MAC) is
/// derived from both fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShardId {
    /// Human-chosen shard name, e.g. `"alpha"`.
    pub name: String,
    /// Protocol epoch; bumping it rotates keys and reseeds generation.
    pub epoch: u32,
}

impl ShardId {
    pub fn new(name: impl Into<String>, epoch: u32) -> Self {
        Self {
            name: name.into(),
            epoch,
        }
    }
}

impl fmt::Display for ShardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.epoch)
    }
}

/// The tradeable resources of the universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Ore,
    Gas,
    Crystal,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [ResourceKind::Ore, ResourceKind::Gas, ResourceKind::Crystal];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Ore => "ore",
            ResourceKind::Gas => "gas",
            ResourceKind::Crystal => "crystal",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
