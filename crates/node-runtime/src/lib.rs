//! # Starmesh Node Runtime
//!
//! Everything that turns the subsystem crates into a running node:
//!
//! - `config/` — profile and policy documents, identity derivation
//! - `store` — the world store port and its in-memory adapter
//! - `node` — the transport-free [`node::MeshNode`] orchestrator
//! - `transport` — the tokio UDP endpoint driving the control loop
//!
//! ## Control Flow
//!
//! One task owns all mesh state. It interleaves non-blocking datagram
//! receives with a fixed-period tick that drives retransmit scans, peer
//! expiry, gossip-cache GC, announce/ping rounds, market drift, and the
//! snapshot digest round. Nothing blocks; timeouts are evaluated against
//! stored timestamps during the tick.

pub mod config;
pub mod node;
pub mod store;
pub mod transport;

pub use config::{NodeConfig, Profile};
pub use node::{MeshNode, NodeMetrics, Outgoing};
pub use store::{MemoryWorldStore, OfflineDigest, StoredEvent, WorldStore};
