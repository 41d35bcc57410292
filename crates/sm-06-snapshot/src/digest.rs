//! Scope fingerprints.

use shared_crypto::hashing::sha256_hex;
use shared_types::{ScopeId, SectorInventory, StateDigest};

/// Hash of a sector inventory's canonical JSON encoding. Field order is
/// fixed and maps are sorted, so equal inventories hash equal on any node.
pub fn inventory_hash(inventory: &SectorInventory) -> String {
    let canonical = serde_json::to_vec(inventory).unwrap_or_default();
    sha256_hex(&canonical)
}

/// Build the digest advertised in `SNAPSHOT_HASH`.
pub fn digest_inventory(inventory: &SectorInventory, as_of_ms: u64) -> StateDigest {
    StateDigest {
        scope: ScopeId::Sector(inventory.sector),
        hash: inventory_hash(inventory),
        as_of_ms,
    }
}
