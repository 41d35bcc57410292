//! The canonical three-node exchange: reliable event, piggybacked ack,
//! one relay hop, and a hop-limited stop.

use serde_json::json;
use shared_types::MeshPolicy;

use super::harness::SimNet;

/// A knows only B; B knows A and C; C knows only B. Default policy
/// (two hops max), no LAN broadcast shortcuts.
fn three_node_line() -> SimNet {
    let mut net = SimNet::build_with_policy(3, MeshPolicy::default());
    net.deliver_broadcasts = false;
    net.connect_line(0);
    net
}

#[test]
fn reliable_event_acks_relays_once_and_stops() {
    let mut net = three_node_line();

    // A emits one reliable trade event.
    let sector = net.node(0).store().port_sectors()[0];
    net.node(0).broadcast_event(
        "market_trade",
        json!({
            "sector": sector,
            "resource": "ore",
            "qty": 8,
            "side": "buy",
        }),
        100,
    );
    assert_eq!(net.node(0).metrics(100).pending_packets, 1);

    // B applies it (hop 0) and relays once to C (hop 1); C applies and,
    // having hit the hop ceiling, relays no further.
    for _ in 0..6 {
        net.settle(100);
    }
    let b_events = net.node(1).store().events_since(0);
    assert_eq!(b_events.len(), 1);
    assert_eq!(b_events[0].event.hops, 0);

    let c_events = net.node(2).store().events_since(0);
    assert_eq!(c_events.len(), 1);
    assert_eq!(c_events[0].event.hops, 1);

    // C's only route onward is back to B, which is excluded as the
    // source; and the ceiling is reached anyway. A holds just its own copy.
    assert_eq!(net.node(0).store().events_since(0).len(), 1);

    // B's silent-ACK deadline passes; the piggybacked snapshot covers A's
    // sequence and the pending entry disappears. Same between B and C.
    net.tick_all(500);
    assert_eq!(net.node(0).metrics(500).pending_packets, 0);
    assert_eq!(net.node(1).metrics(500).pending_packets, 0);

    // All three inventories agree.
    let reference = net.node(0).store().sector_inventory(sector).unwrap().stock;
    for i in 1..3 {
        assert_eq!(
            net.node(i).store().sector_inventory(sector).unwrap().stock,
            reference
        );
    }
}

#[test]
fn duplicate_retransmission_does_not_double_apply() {
    let mut net = three_node_line();

    let sector = net.node(0).store().port_sectors()[0];
    net.node(0).broadcast_event(
        "market_trade",
        json!({
            "sector": sector,
            "resource": "ore",
            "qty": 8,
            "side": "buy",
        }),
        100,
    );

    // The ack never makes it back in time: A retransmits on its backoff
    // schedule, so B sees the same sequence again.
    net.settle(100);
    net.nodes[0].node.tick(700); // past the initial RTO
    for _ in 0..4 {
        net.settle(700);
    }

    let b_events = net.node(1).store().events_since(0);
    assert_eq!(b_events.len(), 1, "retransmit must not re-apply");

    let stock = net.node(1).store().sector_inventory(sector).unwrap().stock;
    let reference = net.node(0).store().sector_inventory(sector).unwrap().stock;
    assert_eq!(stock, reference);
}
