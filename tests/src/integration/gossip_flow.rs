//! Hop-limited fanout across constrained topologies.

use serde_json::json;
use shared_types::MeshPolicy;

use super::harness::SimNet;

/// Build a line topology 0-1-2-...-n with broadcasts disabled so events
/// can only travel hop by hop.
fn line(n: usize, max_hops: u8) -> SimNet {
    let policy =
        MeshPolicy::from_value(&json!({ "max_event_hops": max_hops })).expect("valid policy");
    let mut net = SimNet::build_with_policy(n, policy);
    net.deliver_broadcasts = false;
    net.connect_line(0);
    net
}

#[test]
fn event_reaches_exactly_max_hops_deep() {
    // Policy allows 3 hops; the line is 5 nodes long.
    let mut net = line(5, 3);

    net.node(0)
        .broadcast_event("battle", json!({"winner": "sim0"}), 100);
    for _ in 0..8 {
        net.settle(100);
    }

    // Node 0 -> 1 (hop 0) -> 2 (hop 1) -> 3 (hop 2); node 3 stops
    // relaying, so node 4 — reachable only via a path of length 4 —
    // never applies it.
    assert_eq!(net.node(1).store().events_since(0).len(), 1);
    assert_eq!(net.node(2).store().events_since(0).len(), 1);
    assert_eq!(net.node(3).store().events_since(0).len(), 1);
    assert_eq!(
        net.node(4).store().events_since(0).len(),
        0,
        "node beyond the hop ceiling must never apply the event"
    );
}

#[test]
fn relays_skip_the_peer_they_came_from() {
    let mut net = line(2, 4);
    net.node(0)
        .broadcast_event("battle", json!({"winner": "sim0"}), 100);
    net.settle(100);

    // Node 1 applied it once; its only peer is the source, so nothing is
    // echoed back and node 0 still holds exactly its own copy.
    assert_eq!(net.node(1).store().events_since(0).len(), 1);
    assert_eq!(net.node(0).store().events_since(0).len(), 1);
}

#[test]
fn full_mesh_converges_with_duplicates_suppressed() {
    let mut net = SimNet::build(4);
    net.connect_pairwise(0);

    net.node(0)
        .broadcast_event("mission_complete", json!({"mission": 7}), 100);
    for _ in 0..8 {
        net.settle(100);
    }

    for i in 0..4 {
        assert_eq!(
            net.node(i).store().events_since(0).len(),
            1,
            "node {i} must hold the event exactly once"
        );
    }
}

#[test]
fn hop_counts_on_applied_events_never_exceed_policy() {
    let mut net = line(6, 2);
    net.node(0)
        .broadcast_event("tech_upgrade", json!({"domain": "hull"}), 100);
    for _ in 0..8 {
        net.settle(100);
    }

    for i in 0..6 {
        for stored in net.node(i).store().events_since(0) {
            assert!(
                stored.event.hops <= 2,
                "node {i} applied an event at hop {}",
                stored.event.hops
            );
        }
    }
}
