//! Integration tests for the collection tree.
//!
//! Each test drives one or two connections by hand through the public event
//! interface, shuttling packets between them the way a radio would.

use rimetree_core::link_estimate::{LinkEstimate, LINK_ESTIMATE_UNIT};
use rimetree_core::prelude::*;
use rimetree_core::test_impls::{MockAnnouncer, MockUnicast, RecordingCallbacks};
use rimetree_core::{AddResult, NeighborTable, PacketAddr, PacketAttr, RTMETRIC_MAX};
use std::time::Duration;

type TestConn = CollectConn<MockUnicast, MockAnnouncer, RecordingCallbacks>;

const CHANNEL: u16 = 128;

fn open_node(hi: u8) -> TestConn {
    let mut conn = CollectConn::new(
        NodeAddr::new(hi, 0),
        CollectConfig::default(),
        MockUnicast::new(),
        MockAnnouncer::new(),
        RecordingCallbacks::new(),
    )
    .expect("default config is valid");
    conn.open(CHANNEL).expect("mock transport opens");
    conn
}

fn reading(originator: NodeAddr, seqno: u8) -> PacketBuffer {
    let mut packet = PacketBuffer::from_payload(b"t=21");
    packet.set_addr(PacketAddr::Esender, originator);
    packet.set_attr(PacketAttr::EpacketId, seqno);
    packet.set_attr(PacketAttr::Hops, 1);
    packet.set_attr(PacketAttr::Ttl, 10);
    packet.set_attr(PacketAttr::MaxRexmit, 2);
    packet
}

#[test]
fn test_fresh_link_is_pessimistic() {
    let mut estimate = LinkEstimate::new();
    assert_eq!(estimate.etx(), LINK_ESTIMATE_UNIT * 4);

    for _ in 0..20 {
        estimate.record_success(1);
    }
    estimate.reset();
    assert_eq!(estimate.etx(), 32);
}

#[test]
fn test_single_failure_has_bounded_influence() {
    let mut estimate = LinkEstimate::new();
    let before = estimate.etx();
    estimate.record_failure(3);
    // One slot went from 4 to 6: 8 * 66 / 16
    assert_eq!(estimate.etx() - before, 1);

    for _ in 0..16 {
        estimate.record_success(2);
    }
    assert_eq!(estimate.etx(), LINK_ESTIMATE_UNIT * 2);
}

#[test]
fn test_sink_stays_at_zero() {
    let mut sink = open_node(1);
    sink.set_sink(true);

    sink.dispatch(CollectEvent::AnnouncementReceived {
        from: NodeAddr::new(2, 0),
        value: 40,
    });
    sink.dispatch(CollectEvent::PacketSent {
        to: NodeAddr::new(2, 0),
        outcome: TxOutcome::Timeout,
        transmissions: 5,
    });
    sink.dispatch(CollectEvent::Tick {
        elapsed: Duration::from_secs(1000),
    });
    assert_eq!(sink.depth(), 0);
    assert_eq!(sink.state(), RouteState::Sink);
}

#[test]
fn test_better_neighbor_lowers_metric() {
    let mut conn = open_node(5);
    conn.on_announcement(NodeAddr::new(3, 0), 64);
    assert_eq!(conn.depth(), 96);
    assert_eq!(conn.parent(), Some(NodeAddr::new(3, 0)));

    conn.on_announcement(NodeAddr::new(4, 0), 16);
    assert_eq!(conn.depth(), 48);
    assert_eq!(conn.parent(), Some(NodeAddr::new(4, 0)));

    // The better neighbor loses its route; fall back to the other one
    conn.on_announcement(NodeAddr::new(4, 0), RTMETRIC_MAX);
    assert_eq!(conn.depth(), 96);

    conn.neighbors_mut().clear();
    conn.on_announcement(NodeAddr::new(3, 0), RTMETRIC_MAX);
    assert_eq!(conn.depth(), RTMETRIC_MAX);
    assert_eq!(conn.state(), RouteState::Disconnected);
}

#[test]
fn test_one_packet_in_flight() {
    let mut conn = open_node(2);
    conn.on_announcement(NodeAddr::new(1, 0), 0);

    conn.on_packet_received(NodeAddr::new(3, 0), reading(NodeAddr::new(3, 0), 0));
    conn.on_packet_received(NodeAddr::new(4, 0), reading(NodeAddr::new(4, 0), 0));

    assert_eq!(conn.unicast().sent().len(), 1);
    assert_eq!(conn.stats().forwarded, 1);
    assert_eq!(conn.stats().busy_drops, 1);

    // Once the outcome arrives the slot is free again
    conn.on_packet_sent(NodeAddr::new(1, 0), TxOutcome::Acked, 1);
    conn.on_packet_received(NodeAddr::new(4, 0), reading(NodeAddr::new(4, 0), 1));
    assert_eq!(conn.unicast().sent().len(), 2);
}

#[test]
fn test_duplicate_forwarded_once() {
    let mut conn = open_node(2);
    conn.on_announcement(NodeAddr::new(1, 0), 0);
    let a = NodeAddr::new(9, 0);

    conn.on_packet_received(NodeAddr::new(3, 0), reading(a, 5));
    conn.on_packet_sent(NodeAddr::new(1, 0), TxOutcome::Acked, 1);
    conn.on_packet_received(NodeAddr::new(3, 0), reading(a, 5));

    assert_eq!(conn.unicast().sent().len(), 1);
    assert_eq!(conn.stats().duplicates_dropped, 1);
}

#[test]
fn test_end_to_end_delivery() {
    let mut a = open_node(1);
    let mut b = open_node(2);
    a.set_sink(true);

    // B alone: nothing to send to, so it solicits neighbors
    assert_eq!(b.send(b"first", 3).unwrap(), SendStatus::DroppedNoRoute);
    assert_eq!(b.announcer().listens(), &[2, 1]);

    // A's beacon reaches B
    let value = a.announcer().value().expect("sink is announcing");
    b.dispatch(CollectEvent::AnnouncementReceived { from: a.addr(), value });
    assert_eq!(b.neighbors().find(&a.addr()).map(|n| n.rtmetric()), Some(0));
    assert_eq!(b.depth(), 32);

    assert_eq!(
        b.send(b"second", 3).unwrap(),
        SendStatus::Forwarded { next_hop: a.addr() }
    );

    // Carry the frame over the air and back
    let sent = b.unicast().sent()[0].clone();
    let frame = sent.packet.to_frame();
    let packet = PacketBuffer::from_frame(&frame).unwrap();
    a.dispatch(CollectEvent::PacketReceived { from: b.addr(), packet });
    b.dispatch(CollectEvent::PacketSent {
        to: a.addr(),
        outcome: TxOutcome::Acked,
        transmissions: 1,
    });

    let got = &a.callbacks().received()[0];
    assert_eq!(got.originator, b.addr());
    assert_eq!(got.seqno, 1);
    assert_eq!(got.hops, 1);
    assert_eq!(got.payload, b"second");
    assert!(!b.is_forwarding());
}

#[test]
fn test_full_table_ignores_newcomer() {
    let config = CollectConfig::default().with_neighbor_capacity(2);
    let mut conn = CollectConn::new(
        NodeAddr::new(5, 0),
        config,
        MockUnicast::new(),
        MockAnnouncer::new(),
        RecordingCallbacks::new(),
    )
    .unwrap();
    conn.open(CHANNEL).unwrap();

    conn.on_announcement(NodeAddr::new(1, 0), 40);
    conn.on_announcement(NodeAddr::new(2, 0), 50);
    let depth = conn.depth();

    conn.on_announcement(NodeAddr::new(3, 0), 0);
    assert!(conn.neighbors().find(&NodeAddr::new(3, 0)).is_none());
    assert_eq!(conn.neighbors().len(), 2);
    assert_eq!(conn.depth(), depth);
}

#[test]
fn test_table_add_reports_full() {
    let mut table = NeighborTable::new(1, 60);
    assert_eq!(table.add(NodeAddr::new(1, 0), 0), AddResult::Added);
    assert_eq!(table.add(NodeAddr::new(1, 0), 8), AddResult::AlreadyExists);
    assert_eq!(table.add(NodeAddr::new(2, 0), 0), AddResult::TableFull);
}

#[test]
fn test_closure_callbacks() {
    let mut delivered = Vec::new();
    {
        let mut sink = CollectConn::new(
            NodeAddr::new(1, 0),
            CollectConfig::default(),
            MockUnicast::new(),
            MockAnnouncer::new(),
            |originator: NodeAddr, seqno: u8, hops: u8, _payload: &[u8]| {
                delivered.push((originator, seqno, hops));
            },
        )
        .unwrap();
        sink.open(CHANNEL).unwrap();
        sink.set_sink(true);
        sink.on_packet_received(NodeAddr::new(2, 0), reading(NodeAddr::new(7, 0), 3));
    }
    assert_eq!(delivered, vec![(NodeAddr::new(7, 0), 3, 1)]);
}
