//! # World Generation Subsystem (sm-05)
//!
//! Deterministic world generation is critical for a serverless mesh: every
//! node of the same shard and epoch must derive the same topology, ports,
//! and initial stock without coordination or transfer. Everything here is a
//! pure function of [`WorldSeed`] plus a per-purpose discriminator string;
//! no ambient entropy, no floating point, no platform dependence.
//!
//! The generator is ChaCha8 seeded from the first 8 bytes of a SHA-256 over
//! the discriminator and the shared inputs — a fixed, documented algorithm
//! with identical output on every node.

pub mod map;
pub mod market;
pub mod seed;

pub use map::{generate, PortClass, PortLane, PortSpec, SectorSpec, WorldMap};
pub use market::{base_price, drift_shift, price_at_slot, slot_for, SLOT_MS};
pub use seed::{discriminator, DetRng, WorldSeed};
