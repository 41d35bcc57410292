//! The world store port and its in-memory adapter.
//!
//! The mesh layer only ever talks to [`WorldStore`]: it records applied
//! gossip events (at most once by event id), reads and replaces bounded
//! sector inventories, and moves per-player digest cursors. Persistent
//! backends live behind the same port; the in-memory adapter here is what
//! the runtime and the tests use.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::trace;

use shared_types::{EventId, GossipEvent, PeerId, ResourceKind, SectorId, SectorInventory};
use sm_05_worldgen::{base_price, WorldMap, WorldSeed};

/// One recorded event, in arrival order.
#[derive(Debug, Clone)]
pub struct StoredEvent {
    /// 1-based append-log row.
    pub row: u64,
    pub event: GossipEvent,
    pub recorded_ms: u64,
}

/// What the mesh layer needs from persistence.
pub trait WorldStore: Send {
    fn world_seed(&self) -> &WorldSeed;

    /// Record and apply one event. Returns `false` when the event id was
    /// already recorded (the caller must not re-apply or relay it).
    fn apply_event(&mut self, event: &GossipEvent, now_ms: u64) -> bool;

    /// Events with a row strictly greater than `cursor`.
    fn events_since(&self, cursor: u64) -> Vec<StoredEvent>;

    fn digest_cursor(&self, player: &PeerId) -> u64;

    fn advance_digest_cursor(&mut self, player: &PeerId, row: u64);

    fn sector_inventory(&self, sector: SectorId) -> Option<SectorInventory>;

    /// Replace-on-receipt correction from a snapshot response.
    fn replace_sector_inventory(&mut self, inventory: SectorInventory);

    /// Apply the converged per-slot price to every inventory.
    fn set_price(&mut self, resource: ResourceKind, price: i64);

    /// Sectors with ports — the reconciler's scope universe.
    fn port_sectors(&self) -> Vec<SectorId>;
}

/// In-memory adapter seeded from a generated [`WorldMap`].
pub struct MemoryWorldStore {
    seed: WorldSeed,
    inventories: BTreeMap<SectorId, SectorInventory>,
    log: Vec<StoredEvent>,
    seen: HashSet<EventId>,
    cursors: HashMap<PeerId, u64>,
}

impl MemoryWorldStore {
    pub fn new(map: &WorldMap) -> Self {
        let mut inventories = BTreeMap::new();
        for (&sector, port) in &map.ports {
            let mut inv = SectorInventory::bare(sector);
            inv.port_class = Some(port.class.code());
            inv.stock = port.stock.clone();
            for res in ResourceKind::ALL {
                inv.prices.insert(res, base_price(res));
            }
            inventories.insert(sector, inv);
        }
        Self {
            seed: map.seed.clone(),
            inventories,
            log: Vec::new(),
            seen: HashSet::new(),
            cursors: HashMap::new(),
        }
    }

    pub fn event_count(&self) -> usize {
        self.log.len()
    }

    /// Domain effects of one event. Trade deltas are commutative, so any
    /// arrival order converges to the same inventory.
    fn apply_domain(&mut self, event: &GossipEvent) {
        if event.event_type != "market_trade" {
            return;
        }
        let payload = &event.payload;
        let Some(sector) = payload.get("sector").and_then(|v| v.as_u64()) else {
            return;
        };
        let Some(inv) = self.inventories.get_mut(&(sector as SectorId)) else {
            return;
        };
        let resource = match payload.get("resource").and_then(|v| v.as_str()) {
            Some("ore") => ResourceKind::Ore,
            Some("gas") => ResourceKind::Gas,
            Some("crystal") => ResourceKind::Crystal,
            _ => return,
        };
        let qty = payload.get("qty").and_then(|v| v.as_i64()).unwrap_or(0);
        // A player buying drains port stock; selling refills it.
        let delta = match payload.get("side").and_then(|v| v.as_str()) {
            Some("buy") => -qty,
            Some("sell") => qty,
            _ => 0,
        };
        if let Some(stock) = inv.stock.get_mut(&resource) {
            *stock += delta;
        }
    }
}

impl WorldStore for MemoryWorldStore {
    fn world_seed(&self) -> &WorldSeed {
        &self.seed
    }

    fn apply_event(&mut self, event: &GossipEvent, now_ms: u64) -> bool {
        if !self.seen.insert(event.event_id.clone()) {
            return false;
        }
        self.apply_domain(event);
        let row = self.log.len() as u64 + 1;
        trace!(event_id = %event.event_id, row, "event recorded");
        self.log.push(StoredEvent {
            row,
            event: event.clone(),
            recorded_ms: now_ms,
        });
        true
    }

    fn events_since(&self, cursor: u64) -> Vec<StoredEvent> {
        self.log
            .iter()
            .filter(|e| e.row > cursor)
            .cloned()
            .collect()
    }

    fn digest_cursor(&self, player: &PeerId) -> u64 {
        self.cursors.get(player).copied().unwrap_or(0)
    }

    fn advance_digest_cursor(&mut self, player: &PeerId, row: u64) {
        self.cursors.insert(player.clone(), row);
    }

    fn sector_inventory(&self, sector: SectorId) -> Option<SectorInventory> {
        self.inventories.get(&sector).cloned()
    }

    fn replace_sector_inventory(&mut self, inventory: SectorInventory) {
        self.inventories.insert(inventory.sector, inventory);
    }

    fn set_price(&mut self, resource: ResourceKind, price: i64) {
        for inv in self.inventories.values_mut() {
            inv.prices.insert(resource, price);
        }
    }

    fn port_sectors(&self) -> Vec<SectorId> {
        self.inventories.keys().copied().collect()
    }
}

/// What happened since a player's digest cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineDigest {
    pub new_events: usize,
    pub event_types: BTreeMap<String, u32>,
}

/// Summarize events since the player's cursor and advance it.
pub fn offline_digest(store: &mut dyn WorldStore, player: &PeerId) -> OfflineDigest {
    let cursor = store.digest_cursor(player);
    let events = store.events_since(cursor);
    let mut event_types: BTreeMap<String, u32> = BTreeMap::new();
    for stored in &events {
        *event_types
            .entry(stored.event.event_type.clone())
            .or_insert(0) += 1;
    }
    if let Some(last) = events.last() {
        store.advance_digest_cursor(player, last.row);
    }
    OfflineDigest {
        new_events: events.len(),
        event_types,
    }
}
