//! # Reliability Subsystem (sm-02)
//!
//! Per-peer ACK/retransmit bookkeeping layered over the unordered, lossy
//! transport. Each peer gets one [`ReliableLink`] owned by that peer's
//! record; all mutation happens from the single control loop while
//! processing that peer's traffic or during the periodic tick.
//!
//! Outbound reliable messages move `Pending -> Acknowledged` or
//! `Pending -> Abandoned` (retry ceiling), never anything else. Abandonment
//! is a report to the caller, not an error: the node keeps running and the
//! peer is merely demoted.

pub mod config;
pub mod link;

pub use config::ReliabilityConfig;
pub use link::{AckSnapshot, PendingMessage, Receipt, ReliableLink, RetransmitScan};
