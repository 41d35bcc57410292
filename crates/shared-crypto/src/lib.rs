//! # Shared Crypto Crate
//!
//! The small cryptographic toolbox every subsystem shares: SHA-256 helpers,
//! 64-bit seed derivation for deterministic generation, node identity, and
//! the keyed authenticator that signs and verifies envelope bodies.
//!
//! The authenticator is deliberately a trait: the wire reserves a fixed
//! 32-byte trailer, so a signature scheme can replace the HMAC without
//! changing any envelope shape.

pub mod errors;
pub mod hashing;
pub mod identity;
pub mod mac;

pub use errors::CryptoError;
pub use identity::derive_peer_id;
pub use mac::{Authenticator, ShardKey, MAC_LEN};
