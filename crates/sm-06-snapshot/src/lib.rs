//! # Snapshot Subsystem (sm-06)
//!
//! Detects divergence between nodes with compact rolling hashes over
//! bounded state scopes, and repairs it with a request/response exchange
//! that transfers only the divergent scope — never the whole world. The
//! exchange never blocks: an unanswered request simply times out on a tick
//! and is retried on a later digest round.

pub mod digest;
pub mod reconciler;

pub use digest::{digest_inventory, inventory_hash};
pub use reconciler::{ReconcileConfig, ReconcileState, Reconciler};
