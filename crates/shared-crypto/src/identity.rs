//! Node identity derivation.
//!
//! A node's public identity is a pure function of its private secret, so a
//! profile can be rebuilt from the secret alone and two nodes can never
//! claim the same id without sharing the secret.

use crate::errors::CryptoError;
use crate::hashing::sha256;

/// Length of a peer id in hex characters (128 bits of the digest).
pub const PEER_ID_HEX_LEN: usize = 32;

/// Derive the peer id for a node secret: the first 32 hex characters of
/// SHA-256 over the raw secret bytes.
pub fn derive_peer_id(secret_hex: &str) -> Result<String, CryptoError> {
    let secret =
        hex::decode(secret_hex).map_err(|_| CryptoError::InvalidHex(secret_hex.to_owned()))?;
    let digest = hex::encode(sha256(&secret));
    Ok(digest[..PEER_ID_HEX_LEN].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_is_stable() {
        let a = derive_peer_id("ab".repeat(32).as_str()).unwrap();
        let b = derive_peer_id("ab".repeat(32).as_str()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), PEER_ID_HEX_LEN);
    }

    #[test]
    fn test_distinct_secrets_distinct_ids() {
        let a = derive_peer_id(&"ab".repeat(32)).unwrap();
        let b = derive_peer_id(&"cd".repeat(32)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_non_hex() {
        assert!(derive_peer_id("not hex!").is_err());
    }
}
