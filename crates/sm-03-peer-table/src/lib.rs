//! # Peer Table Subsystem (sm-03)
//!
//! Tracks every peer this node knows about: address, nick, liveness, RTT,
//! and the peer's [`sm_02_reliability::ReliableLink`]. Candidate addresses
//! from any discovery source funnel through one uniform entry point — the
//! table neither knows nor cares whether a candidate came from a LAN
//! broadcast, a configured seed, a fetched bootstrap list, or DNS.
//!
//! Records are owned exclusively by the table and mutated only from the
//! control loop; consumers read snapshots.

pub mod candidates;
pub mod netsplit;
pub mod record;
pub mod table;

pub use candidates::{Candidate, CandidateSource};
pub use netsplit::NetsplitTracker;
pub use record::{Liveness, PeerRecord};
pub use table::{ObservedPeer, PeerTable, PeerTableConfig};
