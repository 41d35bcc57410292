//! Cross-subsystem choreography tests.

pub mod harness;

mod convergence;
mod envelope_auth;
mod gossip_flow;
mod reliability;
mod scenario;
mod snapshot_sync;
mod worldgen_determinism;
