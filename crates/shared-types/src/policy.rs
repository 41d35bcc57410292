//! # Mesh Policy
//!
//! The policy document every node loads once at startup. Peers only
//! interoperate when their policies agree on the protocol version window and
//! epoch; `policy_hash` gives operators a quick way to compare deployments.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Errors raised while loading or normalizing a policy document.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("policy document is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("policy field out of range: {0}")]
    OutOfRange(&'static str),
}

/// Startup policy for one node; read-only for the session's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshPolicy {
    pub min_protocol_version: u16,
    pub max_protocol_version: u16,
    pub protocol_epoch: u32,
    pub max_event_hops: u8,
    /// Event types worth the retransmit cost; everything else is
    /// fire-and-forget.
    pub reliable_event_types: BTreeSet<String>,
    /// Per-source-address inbound packet budget.
    pub packets_per_sec: u32,
    /// First 16 hex chars of the SHA-256 over the canonical document.
    pub policy_hash: String,
}

impl Default for MeshPolicy {
    fn default() -> Self {
        let reliable: BTreeSet<String> = [
            "battle",
            "market_trade",
            "chat",
            "mission_complete",
            "tech_upgrade",
            "jump",
            "defense_upgrade",
            "alliance_join",
            "alliance_create",
            "alliance_rename",
            "alliance_leave",
            "alliance_kick",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();

        let mut policy = Self {
            min_protocol_version: 1,
            max_protocol_version: 1,
            protocol_epoch: 1,
            max_event_hops: 2,
            reliable_event_types: reliable,
            packets_per_sec: 120,
            policy_hash: String::new(),
        };
        policy.policy_hash = policy.canonical_hash();
        policy
    }
}

impl MeshPolicy {
    /// Parse and normalize a policy document. Missing fields fall back to
    /// the defaults; the hash is always recomputed from the normalized form.
    pub fn from_value(doc: &Value) -> Result<Self, PolicyError> {
        let defaults = Self::default();

        let min_v = field_u64(doc, "min_protocol_version")
            .unwrap_or(u64::from(defaults.min_protocol_version));
        let max_v = field_u64(doc, "max_protocol_version").unwrap_or(min_v);
        let epoch =
            field_u64(doc, "protocol_epoch").unwrap_or(u64::from(defaults.protocol_epoch));
        let max_hops =
            field_u64(doc, "max_event_hops").unwrap_or(u64::from(defaults.max_event_hops));
        let pps = doc
            .get("rate_limits")
            .and_then(|rl| rl.get("packets_per_sec"))
            .and_then(Value::as_u64)
            .unwrap_or(u64::from(defaults.packets_per_sec));

        let reliable = match doc.get("reliable_event_types") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect(),
            _ => defaults.reliable_event_types,
        };

        let mut policy = Self {
            min_protocol_version: u16::try_from(min_v)
                .map_err(|_| PolicyError::OutOfRange("min_protocol_version"))?,
            max_protocol_version: u16::try_from(max_v)
                .map_err(|_| PolicyError::OutOfRange("max_protocol_version"))?,
            protocol_epoch: u32::try_from(epoch)
                .map_err(|_| PolicyError::OutOfRange("protocol_epoch"))?,
            max_event_hops: u8::try_from(max_hops)
                .map_err(|_| PolicyError::OutOfRange("max_event_hops"))?,
            reliable_event_types: reliable,
            packets_per_sec: u32::try_from(pps)
                .map_err(|_| PolicyError::OutOfRange("packets_per_sec"))?,
            policy_hash: String::new(),
        };
        policy.policy_hash = policy.canonical_hash();
        Ok(policy)
    }

    pub fn from_json(text: &str) -> Result<Self, PolicyError> {
        let doc: Value = serde_json::from_str(text)?;
        Self::from_value(&doc)
    }

    /// Whether an event type must be delivered reliably.
    pub fn is_reliable(&self, event_type: &str) -> bool {
        self.reliable_event_types.contains(event_type)
    }

    fn canonical_hash(&self) -> String {
        // serde_json maps are sorted, so this encoding is canonical.
        let canonical = json!({
            "min_protocol_version": self.min_protocol_version,
            "max_protocol_version": self.max_protocol_version,
            "protocol_epoch": self.protocol_epoch,
            "max_event_hops": self.max_event_hops,
            "reliable_event_types": self.reliable_event_types,
            "rate_limits": { "packets_per_sec": self.packets_per_sec },
        });
        let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
        shared_crypto::hashing::sha256_hex(&bytes)[..16].to_owned()
    }
}

fn field_u64(doc: &Value, key: &str) -> Option<u64> {
    doc.get(key).and_then(Value::as_u64)
}
