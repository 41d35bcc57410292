//! Divergence detection and bounded-scope repair.

use shared_types::{NodeEvent, ResourceKind};

use super::harness::SimNet;

#[test]
fn diverged_scope_is_repaired_from_advertiser() {
    let mut net = SimNet::build(2);
    net.connect_pairwise(0);

    let sector = net.node(0).store().port_sectors()[0];

    // Corrupt B's copy of the first port sector.
    let mut inv = net.node(1).store().sector_inventory(sector).unwrap();
    inv.stock.insert(ResourceKind::Ore, 1);
    net.node(1).store_mut().replace_sector_inventory(inv);

    let reference = net.node(0).store().sector_inventory(sector).unwrap();
    assert_ne!(
        reference,
        net.node(1).store().sector_inventory(sector).unwrap()
    );

    // Only A runs its digest round; its rotation starts at the first port
    // sector. B compares, requests, and applies A's authoritative copy.
    net.nodes[0].node.tick(11_000);
    net.settle(11_000);
    net.settle(11_000);

    assert_eq!(
        net.node(1).store().sector_inventory(sector).unwrap().stock,
        net.node(0).store().sector_inventory(sector).unwrap().stock,
    );
    let repaired = net
        .node(1)
        .drain_events()
        .into_iter()
        .any(|e| matches!(e, NodeEvent::ScopeRepaired { .. }));
    assert!(repaired, "repair must surface a node event");
}

#[test]
fn matching_digests_cause_no_traffic() {
    let mut net = SimNet::build(2);
    net.connect_pairwise(0);

    net.nodes[0].node.tick(11_000);
    net.settle(11_000);
    // B agreed with the digest, so it neither requested nor repaired.
    let events = net.node(1).drain_events();
    assert!(!events
        .iter()
        .any(|e| matches!(e, NodeEvent::ScopeRepaired { .. })));
}

#[test]
fn unanswered_request_times_out_and_retries_later() {
    let mut net = SimNet::build(2);
    net.connect_pairwise(0);

    let sector = net.node(0).store().port_sectors()[0];
    let mut inv = net.node(1).store().sector_inventory(sector).unwrap();
    inv.stock.insert(ResourceKind::Ore, 1);
    net.node(1).store_mut().replace_sector_inventory(inv);

    // A advertises; B's request is lost in transit.
    net.nodes[0].node.tick(11_000);
    net.step(11_000); // digest reaches B
    net.nodes[1].node.drain_outbound(); // the SNAPSHOT_REQ never arrives

    // B's exchange times out on a later tick and the node keeps running.
    net.nodes[1].node.tick(17_000);
    assert_eq!(
        net.node(1).store().sector_inventory(sector).unwrap().stock[&ResourceKind::Ore],
        1
    );

    // A keeps rotating its digest rounds; once the cursor wraps back to
    // the corrupted scope, B repairs after all.
    let rounds = net.node(0).store().port_sectors().len() + 1;
    let mut now = 11_000u64;
    for _ in 0..rounds {
        now += 11_000;
        net.nodes[0].node.tick(now);
        net.settle(now);
        net.settle(now);
    }
    assert_eq!(
        net.node(1).store().sector_inventory(sector).unwrap().stock,
        net.node(0).store().sector_inventory(sector).unwrap().stock,
    );
}
