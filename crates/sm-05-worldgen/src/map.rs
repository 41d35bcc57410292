//! Galaxy topology, ports, and stations.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use shared_types::{ResourceKind, SectorId};

use crate::seed::{discriminator, DetRng, WorldSeed};

/// Extra random warps added on top of the ring, per ten sectors.
const EXTRA_WARPS_PER_TEN: u32 = 16;
/// Percent of sectors that host a port.
const PORT_DENSITY_PCT: u32 = 35;
/// Random stock component added on top of the computed base.
const STOCK_JITTER_MAX: i64 = 60;
/// Station stock bounds per resource.
const STATION_STOCK_MIN: i64 = 150;
const STATION_STOCK_MAX: i64 = 450;

/// One trade lane of a port: the port Buys or Sells that resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortLane {
    Buy,
    Sell,
}

/// Three-letter port class, one lane per resource in `ResourceKind::ALL`
/// order (ore, gas, crystal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortClass(pub [PortLane; 3]);

/// The classes ports are drawn from.
pub const PORT_CLASSES: [PortClass; 6] = {
    use PortLane::{Buy as B, Sell as S};
    [
        PortClass([B, B, S]),
        PortClass([B, S, S]),
        PortClass([S, B, B]),
        PortClass([S, S, B]),
        PortClass([B, S, B]),
        PortClass([S, B, S]),
    ]
};

impl PortClass {
    pub fn code(&self) -> String {
        self.0
            .iter()
            .map(|lane| match lane {
                PortLane::Buy => 'B',
                PortLane::Sell => 'S',
            })
            .collect()
    }

    pub fn lane(&self, resource: ResourceKind) -> PortLane {
        match resource {
            ResourceKind::Ore => self.0[0],
            ResourceKind::Gas => self.0[1],
            ResourceKind::Crystal => self.0[2],
        }
    }
}

/// One sector's intrinsic properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorSpec {
    pub id: SectorId,
    /// Mining yield factor, 1..=8.
    pub richness: u8,
    /// Hazard factor, 1..=10.
    pub danger: u8,
}

/// A port and its initial stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSpec {
    pub sector: SectorId,
    pub class: PortClass,
    pub stock: BTreeMap<ResourceKind, i64>,
}

/// Everything generation derives. Two nodes with the same [`WorldSeed`]
/// hold byte-identical maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldMap {
    pub seed: WorldSeed,
    pub sectors: BTreeMap<SectorId, SectorSpec>,
    /// Undirected warp adjacency.
    pub warps: BTreeMap<SectorId, BTreeSet<SectorId>>,
    pub ports: BTreeMap<SectorId, PortSpec>,
    /// Per-sector station stock.
    pub stations: BTreeMap<SectorId, BTreeMap<ResourceKind, i64>>,
}

impl WorldMap {
    pub fn neighbors(&self, sector: SectorId) -> impl Iterator<Item = SectorId> + '_ {
        self.warps.get(&sector).into_iter().flatten().copied()
    }

    pub fn has_warp(&self, from: SectorId, to: SectorId) -> bool {
        self.warps.get(&from).is_some_and(|set| set.contains(&to))
    }

    /// Sectors hosting a port, ascending. The reconciler's scope universe.
    pub fn port_sectors(&self) -> Vec<SectorId> {
        self.ports.keys().copied().collect()
    }
}

/// Derive the full world from the shared seed inputs.
pub fn generate(seed: &WorldSeed) -> WorldMap {
    let base = seed.base_seed();
    let n = seed.sector_count.max(1);

    let mut sectors = BTreeMap::new();
    for s in 1..=n {
        let mut rng = DetRng::for_purpose(discriminator::SECTOR, &[base, u64::from(s)]);
        sectors.insert(
            s,
            SectorSpec {
                id: s,
                richness: rng.range_u32(1, 8) as u8,
                danger: rng.range_u32(1, 10) as u8,
            },
        );
    }

    // Sparse-but-connected undirected warp graph: ring connectivity first,
    // then random extra links.
    let mut warps: BTreeMap<SectorId, BTreeSet<SectorId>> = BTreeMap::new();
    let mut add_warp = |warps: &mut BTreeMap<SectorId, BTreeSet<SectorId>>, a: u32, b: u32| {
        warps.entry(a).or_default().insert(b);
        warps.entry(b).or_default().insert(a);
    };
    for s in 1..=n {
        let next = if s < n { s + 1 } else { 1 };
        add_warp(&mut warps, s, next);
    }
    let extra = n.max(n * EXTRA_WARPS_PER_TEN / 10);
    let mut wrng = DetRng::for_purpose(discriminator::WARPS, &[base]);
    for _ in 0..extra {
        let a = wrng.range_u32(1, n);
        let b = wrng.range_u32(1, n);
        if a == b {
            continue;
        }
        add_warp(&mut warps, a, b);
    }

    // Ports in roughly a third of sectors.
    let mut presence = DetRng::for_purpose(discriminator::PORTS, &[base]);
    let mut ports = BTreeMap::new();
    for s in 1..=n {
        if !presence.chance(PORT_DENSITY_PCT, 100) {
            continue;
        }
        let spec = sectors[&s];
        let mut prng = DetRng::for_purpose(discriminator::PORT, &[base, u64::from(s)]);
        let class = PORT_CLASSES[prng.index(PORT_CLASSES.len())];
        let stock = initial_stock(&spec, class, &mut prng);
        ports.insert(
            s,
            PortSpec {
                sector: s,
                class,
                stock,
            },
        );
    }

    // Every sector keeps a small station inventory.
    let mut stations = BTreeMap::new();
    for s in 1..=n {
        let mut srng = DetRng::for_purpose(discriminator::STATION, &[base, u64::from(s)]);
        let stock: BTreeMap<ResourceKind, i64> = ResourceKind::ALL
            .iter()
            .map(|&res| (res, srng.range_i64(STATION_STOCK_MIN, STATION_STOCK_MAX)))
            .collect();
        stations.insert(s, stock);
    }

    WorldMap {
        seed: seed.clone(),
        sectors,
        warps,
        ports,
        stations,
    }
}

/// Stock formula: richer sectors stock more, dangerous ones less; lanes the
/// port Buys run lean, lanes it Sells run deep. Integer arithmetic only.
fn initial_stock(
    sector: &SectorSpec,
    class: PortClass,
    rng: &mut DetRng,
) -> BTreeMap<ResourceKind, i64> {
    let base = (300 + i64::from(sector.richness) * 70 - i64::from(sector.danger) * 12).max(120);
    ResourceKind::ALL
        .iter()
        .map(|&res| {
            let weighted = match class.lane(res) {
                PortLane::Buy => base * 7 / 10,
                PortLane::Sell => base * 5 / 4,
            };
            (res, weighted + rng.range_i64(0, STOCK_JITTER_MAX))
        })
        .collect()
}
