//! Typed codec outcomes.
//!
//! Every rejection is silent by policy: the codec returns the reason so the
//! control loop can count it, but nothing is ever echoed back to the wire
//! (bad MACs may be spoofed traffic).

use thiserror::Error;

/// Reasons an inbound datagram never reaches a higher layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The MAC did not verify under the receiver's shard key.
    #[error("envelope failed authentication")]
    AuthenticationFailure,

    /// Protocol version outside the configured acceptance window.
    #[error("protocol version {got} outside accepted window")]
    VersionRejected { got: u16 },

    /// Envelope names a different shard.
    #[error("shard mismatch: got '{got}'")]
    ShardMismatch { got: String },

    /// Right shard, wrong protocol epoch.
    #[error("epoch mismatch: got {got}")]
    EpochMismatch { got: u32 },

    /// Datagram too short or not a valid envelope encoding.
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

/// Errors while producing wire bytes.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("envelope serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Encoded envelope would not fit a single datagram.
    #[error("envelope too large: {size} bytes")]
    TooLarge { size: usize },
}
