//! Reliable delivery semantics between live nodes.

use shared_types::{MeshPolicy, NodeEvent};

use super::harness::SimNet;

#[test]
fn duplicated_reliable_delivery_applies_once() {
    let mut net = SimNet::build(2);
    net.connect_pairwise(0);

    // Every frame is delivered three times.
    net.duplicate_factor = 3;
    net.emit_trade(0, 10, "buy", 100);
    net.settle(100);

    let sector = net.node(1).store().port_sectors()[0];
    let a_stock = net.node(0).store().sector_inventory(sector).unwrap().stock;
    let b_stock = net.node(1).store().sector_inventory(sector).unwrap().stock;
    // B applied the trade exactly once despite triplicate datagrams.
    assert_eq!(a_stock, b_stock);
}

#[test]
fn piggybacked_ack_clears_pending() {
    let mut net = SimNet::build(2);
    net.connect_pairwise(0);

    net.emit_trade(0, 5, "buy", 100);
    net.settle(100);
    assert_eq!(net.node(0).metrics(100).pending_packets, 1);

    // B's silent-ACK deadline passes on the next tick; the dedicated
    // ack_only envelope comes back and clears A's outbox.
    net.tick_all(500);
    assert_eq!(net.node(0).metrics(500).pending_packets, 0);
}

#[test]
fn unresponsive_peer_hits_retry_ceiling_and_is_demoted() {
    let mut net = SimNet::build(2);
    net.connect_pairwise(0);

    // B drops off the network entirely.
    let dead = net.nodes.remove(1);
    drop(dead);

    net.emit_trade(0, 5, "buy", 1_000);
    assert_eq!(net.node(0).metrics(1_000).pending_packets, 1);

    // March time forward through every backoff stage.
    let mut now = 1_000;
    let mut abandoned = Vec::new();
    for _ in 0..64 {
        now += 5_000;
        net.node(0).tick(now);
        abandoned.extend(
            net.node(0)
                .drain_events()
                .into_iter()
                .filter(|e| matches!(e, NodeEvent::DeliveryAbandoned { .. })),
        );
        if !abandoned.is_empty() {
            break;
        }
    }

    assert_eq!(abandoned.len(), 1, "exactly one abandonment report");
    assert_eq!(net.node(0).metrics(now).pending_packets, 0);
    // Demoted, not evicted: the record survives, fanout skips it.
    assert_eq!(net.node(0).metrics(now).peer_count, 1);
    assert_eq!(net.node(0).metrics(now).healthy_peers, 0);
}

#[test]
fn unreliable_events_are_fire_and_forget() {
    // "movement" is not in the default reliable set.
    let mut net = SimNet::build(2);
    net.connect_pairwise(0);

    net.node(0).broadcast_event(
        "movement",
        serde_json::json!({"x": 1.5, "y": -4.0}),
        100,
    );
    assert_eq!(
        net.node(0).metrics(100).pending_packets,
        0,
        "unreliable traffic must not enter the retransmit outbox"
    );
    net.settle(100);
    assert_eq!(net.node(1).metrics(100).events_seen, 1);
}

#[test]
fn policy_decides_which_event_types_are_reliable() {
    let policy = MeshPolicy::default();
    assert!(policy.is_reliable("market_trade"));
    assert!(policy.is_reliable("battle"));
    assert!(!policy.is_reliable("movement"));
    assert!(!policy.is_reliable("resource_tick"));
}
