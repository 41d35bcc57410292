//! Error types for key material handling.

use thiserror::Error;

/// Errors raised while decoding or deriving key material.
#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    /// Input was not valid lowercase hex.
    #[error("invalid hex input: {0}")]
    InvalidHex(String),

    /// Key material had the wrong length.
    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
}
