//! # Envelope Authentication
//!
//! Keyed authentication of envelope body bytes. The shard key is derived
//! once at startup from `(shard name, protocol epoch, optional secret)` and
//! is read-only for the session's lifetime.
//!
//! ## Security Properties
//!
//! - Verification is constant-time (`hmac`'s `verify_slice`).
//! - Without the per-shard secret the key is public knowledge: it provides
//!   clean epoch rotation for honest nodes, not protection against a
//!   determined attacker. Deployments wanting the latter set the secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::errors::CryptoError;
use crate::hashing::sha256;

type HmacSha256 = Hmac<Sha256>;

/// Width of the authenticator trailer on the wire.
pub const MAC_LEN: usize = 32;

/// Signs and verifies envelope body bytes.
///
/// Kept as a trait so an asymmetric signature can replace the keyed hash
/// without changing the envelope shape.
pub trait Authenticator {
    /// Compute the authenticator tag for `body`.
    fn sign(&self, body: &[u8]) -> [u8; MAC_LEN];

    /// Verify `tag` against `body` in constant time.
    fn verify(&self, body: &[u8], tag: &[u8]) -> bool;
}

/// HMAC-SHA256 key shared by every node of one `(shard, epoch)` pair.
#[derive(Clone)]
pub struct ShardKey {
    key: [u8; 32],
}

impl ShardKey {
    /// Derive the key from the shard name, protocol epoch, and an optional
    /// private secret. All nodes of a shard derive the same key from the
    /// same inputs.
    pub fn derive(shard_name: &str, epoch: u32, secret: &str) -> Self {
        let material = format!("starmesh:{shard_name}:epoch:{epoch}:{secret}");
        Self {
            key: sha256(material.as_bytes()),
        }
    }

    /// Load an explicitly configured key (64 hex characters).
    pub fn from_hex(key_hex: &str) -> Result<Self, CryptoError> {
        let bytes =
            hex::decode(key_hex).map_err(|_| CryptoError::InvalidHex(key_hex.to_owned()))?;
        let key: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::InvalidKeyLength {
                expected: 32,
                got: bytes.len(),
            })?;
        Ok(Self { key })
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.key)
    }

    fn mac(&self) -> HmacSha256 {
        // 32-byte keys are always accepted by HMAC.
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length")
    }
}

impl Authenticator for ShardKey {
    fn sign(&self, body: &[u8]) -> [u8; MAC_LEN] {
        let mut mac = self.mac();
        mac.update(body);
        mac.finalize().into_bytes().into()
    }

    fn verify(&self, body: &[u8], tag: &[u8]) -> bool {
        let mut mac = self.mac();
        mac.update(body);
        mac.verify_slice(tag).is_ok()
    }
}

impl std::fmt::Debug for ShardKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never leak key material through logs.
        f.write_str("ShardKey(..)")
    }
}
