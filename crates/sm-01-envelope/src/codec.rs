//! Encode, authenticate, and gate envelopes.
//!
//! The codec is stateless: it owns nothing and mutates nothing. MAC
//! verification runs over the raw body bytes before deserialization, so a
//! forged datagram costs one HMAC and no parsing.

use shared_crypto::{Authenticator, MAC_LEN};
use shared_types::ShardId;

use crate::envelope::Envelope;
use crate::error::{DecodeError, EncodeError};

/// Ceiling for one UDP payload; larger envelopes are a caller bug.
pub const MAX_DATAGRAM_BYTES: usize = 60_000;

/// The receiver's acceptance window, fixed at startup.
#[derive(Debug, Clone)]
pub struct CodecPolicy {
    pub min_version: u16,
    pub max_version: u16,
    /// Shard name and epoch this node participates in.
    pub shard: ShardId,
}

impl CodecPolicy {
    pub fn new(min_version: u16, max_version: u16, shard: ShardId) -> Self {
        Self {
            min_version,
            max_version,
            shard,
        }
    }
}

/// Serialize and sign an envelope into datagram bytes.
pub fn encode(envelope: &Envelope, auth: &dyn Authenticator) -> Result<Vec<u8>, EncodeError> {
    let mut bytes = serde_json::to_vec(envelope)?;
    if bytes.len() + MAC_LEN > MAX_DATAGRAM_BYTES {
        return Err(EncodeError::TooLarge {
            size: bytes.len() + MAC_LEN,
        });
    }
    let tag = auth.sign(&bytes);
    bytes.extend_from_slice(&tag);
    Ok(bytes)
}

/// Authenticate and gate one datagram. Rejections carry the reason but are
/// never answered on the wire.
pub fn decode(
    bytes: &[u8],
    auth: &dyn Authenticator,
    policy: &CodecPolicy,
) -> Result<Envelope, DecodeError> {
    if bytes.len() <= MAC_LEN {
        return Err(DecodeError::Malformed("datagram shorter than MAC".into()));
    }
    let (body, tag) = bytes.split_at(bytes.len() - MAC_LEN);

    if !auth.verify(body, tag) {
        return Err(DecodeError::AuthenticationFailure);
    }

    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;

    if envelope.version < policy.min_version || envelope.version > policy.max_version {
        return Err(DecodeError::VersionRejected {
            got: envelope.version,
        });
    }
    if envelope.shard.name != policy.shard.name {
        return Err(DecodeError::ShardMismatch {
            got: envelope.shard.name.clone(),
        });
    }
    if envelope.shard.epoch != policy.shard.epoch {
        return Err(DecodeError::EpochMismatch {
            got: envelope.shard.epoch,
        });
    }

    Ok(envelope)
}
