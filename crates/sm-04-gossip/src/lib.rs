//! # Gossip Subsystem (sm-04)
//!
//! Propagates application events to the whole mesh by flood-with-hop-limit:
//! every node re-fans fresh events to peers other than the one it heard
//! them from, until the hop counter hits the policy ceiling. A bounded
//! recently-seen cache guarantees at-most-once application per node; the
//! redundancy this trades for is what lets the mesh tolerate arbitrary
//! peer churn without routing tables or spanning trees.

pub mod cache;
pub mod config;
pub mod engine;

pub use cache::SeenCache;
pub use config::{FanoutPolicy, GossipConfig};
pub use engine::{Disposition, EventSink, GossipEngine};
