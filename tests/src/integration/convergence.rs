//! Eventual convergence of port inventories.

use rand::seq::SliceRandom;
use serde_json::json;
use shared_types::{EventId, GossipEvent, PeerId, ResourceKind};

use node_runtime::store::{MemoryWorldStore, WorldStore};
use sm_05_worldgen::{generate, WorldSeed};

use super::harness::{SimNet, SIM_SECTORS};

fn trade_event(n: u32, sector: u32, qty: i64, side: &str) -> GossipEvent {
    GossipEvent {
        event_id: EventId::new(format!("{n:0>24x}")),
        origin: PeerId::new("0123456789abcdef0123456789abcdef"),
        event_type: "market_trade".into(),
        payload: json!({
            "sector": sector,
            "resource": "ore",
            "qty": qty,
            "side": side,
        }),
        hops: 0,
    }
}

#[test]
fn any_order_with_duplicates_converges() {
    let map = generate(&WorldSeed::new("alpha", 1, SIM_SECTORS));
    let mut store_a = MemoryWorldStore::new(&map);
    let mut store_b = MemoryWorldStore::new(&map);
    let sector = store_a.port_sectors()[0];

    let mut events: Vec<GossipEvent> = (0..20)
        .map(|n| trade_event(n, sector, i64::from(n % 7) + 1, if n % 3 == 0 { "sell" } else { "buy" }))
        .collect();
    // Duplicate a handful.
    let dupes: Vec<GossipEvent> = events.iter().take(5).cloned().collect();
    events.extend(dupes);

    let mut order_a = events.clone();
    let mut order_b = events;
    let mut rng = rand::thread_rng();
    order_a.shuffle(&mut rng);
    order_b.shuffle(&mut rng);

    for ev in &order_a {
        store_a.apply_event(ev, 0);
    }
    for ev in &order_b {
        store_b.apply_event(ev, 0);
    }

    assert_eq!(
        store_a.sector_inventory(sector).unwrap(),
        store_b.sector_inventory(sector).unwrap(),
        "shuffled, duplicated delivery must converge"
    );
    // No event lost, none double counted.
    assert_eq!(store_a.events_since(0).len(), 20);
    assert_eq!(store_b.events_since(0).len(), 20);
}

#[test]
fn live_nodes_converge_through_gossip() {
    let mut net = SimNet::build(3);
    net.connect_pairwise(0);
    net.duplicate_factor = 2;

    // Trades originate on different nodes, interleaved.
    net.emit_trade(0, 4, "buy", 100);
    net.settle(100);
    net.emit_trade(1, 9, "sell", 110);
    net.settle(110);
    net.emit_trade(2, 2, "buy", 120);
    for _ in 0..8 {
        net.settle(120);
    }

    let sector = net.node(0).store().port_sectors()[0];
    let reference = net.node(0).store().sector_inventory(sector).unwrap().stock;
    for i in 1..3 {
        assert_eq!(
            net.node(i).store().sector_inventory(sector).unwrap().stock,
            reference,
            "node {i} diverged"
        );
    }

    // Every node holds each trade exactly once.
    for i in 0..3 {
        assert_eq!(net.node(i).store().events_since(0).len(), 3);
    }
}

#[test]
fn market_drift_keeps_prices_in_lockstep() {
    let mut net = SimNet::build(2);
    net.connect_pairwise(0);

    // Two minutes of ticks; prices advance per slot on both nodes.
    for now in [60_000u64, 120_000] {
        net.tick_all(now);
    }

    let sector = net.node(0).store().port_sectors()[0];
    let a = net.node(0).store().sector_inventory(sector).unwrap().prices;
    let b = net.node(1).store().sector_inventory(sector).unwrap().prices;
    assert_eq!(a, b);
    for res in ResourceKind::ALL {
        assert!(a[&res] >= 1);
    }
}
