//! Tree-based hop-by-hop reliable data collection
//!
//! A [`CollectConn`] is the local node's membership in one collection tree.
//! Every node advertises a route metric through the [`Announcer`]: the sink
//! advertises [`RTMETRIC_SINK`], a connected node advertises its best
//! neighbor's metric plus the ETX of the link to it, and a node without any
//! usable neighbor advertises [`RTMETRIC_MAX`]. Data flows toward lower
//! metrics, one reliable unicast hop at a time.
//!
//! ## Event Flow
//!
//! ```text
//!  announcement ──► neighbor table ──► recompute metric ──► re-announce
//!
//!  data packet ──► duplicate check ──┬─► sink: deliver to application
//!                                    └─► forwarder: best neighbor ──► unicast
//!
//!  unicast outcome ──► link estimate ──► recompute metric ──► re-announce
//! ```
//!
//! All handlers run to completion and never block; they are driven one at a
//! time through [`CollectConn::dispatch`]. At most one packet is in flight at
//! a time: while a forward is outstanding, further packets to forward are
//! dropped rather than queued.
//!
//! The design does not guarantee loop freedom. It only refuses to hand a
//! packet straight back to the neighbor it came from; longer transient loops
//! while metrics converge are bounded by the TTL.

use super::config::CollectConfig;
use super::dedup::RecentPackets;
use super::error::{CollectError, CollectResult};
use super::link_estimate::LINK_ESTIMATE_UNIT;
use super::neighbor::{AddResult, NeighborTable};
use super::packet::{NodeAddr, PacketAddr, PacketAttr, PacketBuffer};
use super::traits::{
    Announcer, CollectCallbacks, CollectEvent, CollectStats, ReliableUnicast, TxOutcome,
};
use std::time::Duration;
use tracing::{debug, trace};

/// Route metric of the sink
pub const RTMETRIC_SINK: u16 = 0;

/// Route metric meaning "no route to the sink"
pub const RTMETRIC_MAX: u16 = LINK_ESTIMATE_UNIT * 64 - 1;

/// Where this node stands in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteState {
    /// Root of the tree, metric 0
    Sink,
    /// Has a next hop, finite metric
    Connected,
    /// No usable neighbor, metric [`RTMETRIC_MAX`]
    Disconnected,
}

/// Result of [`CollectConn::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// We are the sink; the packet went straight to the application
    DeliveredLocally,
    /// Handed to reliable unicast toward `next_hop`
    Forwarded {
        /// Chosen next hop
        next_hop: NodeAddr,
    },
    /// No next hop known; nothing transmitted, neighbors solicited
    DroppedNoRoute,
}

/// One node's connection to a collection tree
#[derive(Debug)]
pub struct CollectConn<U, A, C> {
    addr: NodeAddr,
    config: CollectConfig,
    unicast: U,
    announcer: A,
    callbacks: C,
    neighbors: NeighborTable,
    recent: RecentPackets,
    rtmetric: u16,
    state: RouteState,
    seqno: u8,
    forwarding: bool,
    open: bool,
    stats: CollectStats,
}

impl<U, A, C> CollectConn<U, A, C>
where
    U: ReliableUnicast,
    A: Announcer,
    C: CollectCallbacks,
{
    /// Create a closed connection for node `addr`
    pub fn new(
        addr: NodeAddr,
        config: CollectConfig,
        unicast: U,
        announcer: A,
        callbacks: C,
    ) -> CollectResult<Self> {
        config.validate()?;
        let neighbors =
            NeighborTable::new(config.neighbor_capacity, config.neighbor_lifetime_secs);
        let recent = RecentPackets::new(config.recent_packets);
        Ok(Self::with_tables(
            addr, config, neighbors, recent, unicast, announcer, callbacks,
        ))
    }

    /// Create a closed connection around caller-provided tables
    pub fn with_tables(
        addr: NodeAddr,
        config: CollectConfig,
        neighbors: NeighborTable,
        recent: RecentPackets,
        unicast: U,
        announcer: A,
        callbacks: C,
    ) -> Self {
        Self {
            addr,
            config,
            unicast,
            announcer,
            callbacks,
            neighbors,
            recent,
            rtmetric: RTMETRIC_MAX,
            state: RouteState::Disconnected,
            seqno: 0,
            forwarding: false,
            open: false,
            stats: CollectStats::default(),
        }
    }

    /// Open the connection: data on `channel + 1`, announcements on `channel`
    ///
    /// The node starts disconnected and asks its neighbors to announce.
    pub fn open(&mut self, channel: u16) -> CollectResult<()> {
        self.unicast.open(channel.wrapping_add(1))?;
        self.rtmetric = RTMETRIC_MAX;
        self.state = RouteState::Disconnected;
        self.announcer.register(channel, self.rtmetric);
        self.announcer.listen(self.config.open_listen_bursts);
        self.open = true;
        debug!(node = %self.addr, channel, "collect opened");
        Ok(())
    }

    /// Stop announcing and close the unicast endpoint
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.announcer.remove();
        self.unicast.close();
        self.open = false;
        self.forwarding = false;
        debug!(node = %self.addr, "collect closed");
    }

    /// Make this node the sink, or stop being one
    pub fn set_sink(&mut self, should_be_sink: bool) {
        if should_be_sink {
            self.state = RouteState::Sink;
            self.rtmetric = RTMETRIC_SINK;
        } else {
            self.state = RouteState::Disconnected;
            self.rtmetric = RTMETRIC_MAX;
        }
        self.stats.metric_changes += 1;
        debug!(node = %self.addr, sink = should_be_sink, rtmetric = self.rtmetric, "sink role changed");
        self.announcer.set_value(self.rtmetric);
        self.update_rtmetric();
    }

    /// Originate a data packet carrying `payload` toward the sink
    pub fn send(&mut self, payload: &[u8], max_rexmit: u8) -> CollectResult<SendStatus> {
        if !self.open {
            return Err(CollectError::NotOpen);
        }

        let seqno = self.seqno;
        self.seqno = self.seqno.wrapping_add(1);
        self.stats.originated += 1;

        let mut packet = PacketBuffer::from_payload(payload);
        packet.set_attr(PacketAttr::EpacketId, seqno);
        packet.set_addr(PacketAddr::Esender, self.addr);
        packet.set_attr(PacketAttr::Hops, 1);
        packet.set_attr(PacketAttr::Ttl, self.config.max_hop_limit);
        packet.set_attr(PacketAttr::MaxRexmit, max_rexmit);

        if self.state == RouteState::Sink {
            packet.set_attr(PacketAttr::Hops, 0);
            self.deliver(&packet);
            return Ok(SendStatus::DeliveredLocally);
        }

        let next_hop = match self.neighbors.best() {
            Some(n) => n.addr(),
            None => {
                debug!(node = %self.addr, "no neighbor to send to");
                self.stats.no_route_drops += 1;
                self.announcer.listen(self.config.no_route_listen_bursts);
                return Ok(SendStatus::DroppedNoRoute);
            }
        };

        debug!(node = %self.addr, %next_hop, seqno, "sending");
        let was_forwarding = self.forwarding;
        self.forwarding = true;
        if let Err(e) = self.transmit(next_hop, &mut packet, max_rexmit) {
            self.forwarding = was_forwarding;
            return Err(e);
        }
        Ok(SendStatus::Forwarded { next_hop })
    }

    /// Feed one event into the state machine
    pub fn dispatch(&mut self, event: CollectEvent) {
        match event {
            CollectEvent::PacketReceived { from, packet } => self.on_packet_received(from, packet),
            CollectEvent::PacketSent {
                to,
                outcome,
                transmissions,
            } => self.on_packet_sent(to, outcome, transmissions),
            CollectEvent::AnnouncementReceived { from, value } => {
                self.on_announcement(from, value)
            }
            CollectEvent::Tick { elapsed } => self.tick(elapsed),
        }
    }

    /// Handle a data packet from one-hop neighbor `from`
    pub fn on_packet_received(&mut self, from: NodeAddr, mut packet: PacketBuffer) {
        if !self.open {
            return;
        }

        let originator = packet.addr(PacketAddr::Esender);
        let seqno = packet.attr(PacketAttr::EpacketId);

        if !self.recent.check_and_record(originator, seqno) {
            trace!(node = %self.addr, %originator, seqno, "dropping duplicate packet");
            self.stats.duplicates_dropped += 1;
            return;
        }

        if self.state == RouteState::Sink {
            debug!(node = %self.addr, %originator, via = %from, seqno, "sink received packet");
            self.deliver(&packet);
            return;
        }

        let ttl = packet.attr(PacketAttr::Ttl);
        if ttl <= 1 {
            debug!(node = %self.addr, %originator, seqno, "ttl exhausted, dropping");
            self.stats.ttl_drops += 1;
            return;
        }
        if self.rtmetric == RTMETRIC_MAX {
            debug!(node = %self.addr, %originator, seqno, "no route, dropping");
            self.stats.no_route_drops += 1;
            return;
        }

        let hops = packet.attr(PacketAttr::Hops);
        packet.set_attr(PacketAttr::Hops, hops.saturating_add(1));
        packet.set_attr(PacketAttr::Ttl, ttl - 1);

        if self.forwarding {
            debug!(node = %self.addr, %originator, seqno, "still forwarding another packet, dropping");
            self.stats.busy_drops += 1;
            return;
        }

        let next_hop = match self.neighbors.best() {
            Some(n) if n.addr() != from => n.addr(),
            _ => {
                debug!(node = %self.addr, %originator, seqno, "no neighbor to forward to");
                self.stats.no_route_drops += 1;
                return;
            }
        };

        debug!(node = %self.addr, %originator, via = %from, %next_hop, seqno, "forwarding");
        self.forwarding = true;
        let max_rexmit = packet.attr(PacketAttr::MaxRexmit);
        match self.transmit(next_hop, &mut packet, max_rexmit) {
            Ok(()) => self.stats.forwarded += 1,
            Err(e) => {
                debug!(node = %self.addr, error = %e, "transport refused forward");
                self.forwarding = false;
            }
        }
    }

    /// Handle the outcome of a reliable unicast transmission to `to`
    pub fn on_packet_sent(&mut self, to: NodeAddr, outcome: TxOutcome, transmissions: u8) {
        if !self.open {
            return;
        }

        self.forwarding = false;
        let transmissions = transmissions.max(1);

        if outcome.is_success() {
            self.stats.tx_ok += 1;
            if !self.neighbors.record_tx(&to, transmissions)
                && self.neighbors.add(to, RTMETRIC_MAX) == AddResult::Added
            {
                self.neighbors.record_tx(&to, transmissions);
            }
        } else {
            self.stats.tx_failed += 1;
            debug!(node = %self.addr, %to, ?outcome, transmissions, "transmission failed");
            self.neighbors.record_timeout(&to, transmissions);
        }

        self.update_rtmetric();
    }

    /// Handle a route metric announced by neighbor `from`
    pub fn on_announcement(&mut self, from: NodeAddr, value: u16) {
        if !self.open || from == self.addr {
            return;
        }

        match self.neighbors.add(from, value) {
            AddResult::Added | AddResult::TableFull => {}
            AddResult::AlreadyExists => {
                trace!(node = %self.addr, neighbor = %from, value, "updating neighbor");
                self.neighbors.update_rtmetric(&from, value);
            }
        }

        self.update_rtmetric();
    }

    /// Age the neighbor table by `elapsed`
    pub fn tick(&mut self, elapsed: Duration) {
        if !self.open {
            return;
        }
        if !self.neighbors.tick(elapsed).is_empty() {
            self.update_rtmetric();
        }
    }

    /// Current route metric (0 at the sink, [`RTMETRIC_MAX`] when disconnected)
    pub fn depth(&self) -> u16 {
        self.rtmetric
    }

    /// Current role in the tree
    pub fn state(&self) -> RouteState {
        self.state
    }

    /// Whether this node is the sink
    pub fn is_sink(&self) -> bool {
        self.state == RouteState::Sink
    }

    /// Whether a transmission is outstanding
    pub fn is_forwarding(&self) -> bool {
        self.forwarding
    }

    /// Whether the connection is open
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// This node's address
    pub fn addr(&self) -> NodeAddr {
        self.addr
    }

    /// Sequence number the next originated packet will carry
    pub fn next_seqno(&self) -> u8 {
        self.seqno
    }

    /// Current next hop, if any
    pub fn parent(&self) -> Option<NodeAddr> {
        match self.state {
            RouteState::Connected => self.neighbors.best().map(|n| n.addr()),
            _ => None,
        }
    }

    /// Connection configuration
    pub fn config(&self) -> &CollectConfig {
        &self.config
    }

    /// Connection statistics
    pub fn stats(&self) -> &CollectStats {
        &self.stats
    }

    /// The neighbor table
    pub fn neighbors(&self) -> &NeighborTable {
        &self.neighbors
    }

    /// Mutable neighbor table, e.g. to evict entries or change the lifetime
    pub fn neighbors_mut(&mut self) -> &mut NeighborTable {
        &mut self.neighbors
    }

    /// The reliable unicast collaborator
    pub fn unicast(&self) -> &U {
        &self.unicast
    }

    /// Mutable reliable unicast collaborator
    pub fn unicast_mut(&mut self) -> &mut U {
        &mut self.unicast
    }

    /// The announcement collaborator
    pub fn announcer(&self) -> &A {
        &self.announcer
    }

    /// The application callbacks
    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    /// Mutable application callbacks
    pub fn callbacks_mut(&mut self) -> &mut C {
        &mut self.callbacks
    }

    fn transmit(
        &mut self,
        next_hop: NodeAddr,
        packet: &mut PacketBuffer,
        max_rexmit: u8,
    ) -> CollectResult<()> {
        packet.set_addr(PacketAddr::Sender, self.addr);
        packet.set_addr(PacketAddr::Receiver, next_hop);
        self.unicast.send(next_hop, packet, max_rexmit)
    }

    fn deliver(&mut self, packet: &PacketBuffer) {
        self.stats.delivered += 1;
        self.callbacks.recv(
            packet.addr(PacketAddr::Esender),
            packet.attr(PacketAttr::EpacketId),
            packet.attr(PacketAttr::Hops),
            packet.data(),
        );
    }

    /// Recompute our metric from the best neighbor; re-announce on change
    fn update_rtmetric(&mut self) {
        if self.state == RouteState::Sink {
            return;
        }

        let rtmetric = match self.neighbors.best() {
            Some(n) => n.combined_cost().min(RTMETRIC_MAX),
            None => RTMETRIC_MAX,
        };

        if rtmetric != self.rtmetric {
            self.rtmetric = rtmetric;
            self.state = if rtmetric == RTMETRIC_MAX {
                RouteState::Disconnected
            } else {
                RouteState::Connected
            };
            self.stats.metric_changes += 1;
            debug!(node = %self.addr, rtmetric, state = ?self.state, "new rtmetric");
            self.announcer.set_value(rtmetric);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_impls::{MockAnnouncer, MockUnicast, RecordingCallbacks};

    type TestConn = CollectConn<MockUnicast, MockAnnouncer, RecordingCallbacks>;

    fn node(n: u8) -> NodeAddr {
        NodeAddr::new(n, 0)
    }

    fn open_conn(addr: NodeAddr) -> TestConn {
        let mut conn = CollectConn::new(
            addr,
            CollectConfig::default(),
            MockUnicast::new(),
            MockAnnouncer::new(),
            RecordingCallbacks::new(),
        )
        .unwrap();
        conn.open(128).unwrap();
        conn
    }

    fn data_from(originator: NodeAddr, seqno: u8, hops: u8, ttl: u8) -> PacketBuffer {
        let mut packet = PacketBuffer::from_payload(b"reading");
        packet.set_addr(PacketAddr::Esender, originator);
        packet.set_attr(PacketAttr::EpacketId, seqno);
        packet.set_attr(PacketAttr::Hops, hops);
        packet.set_attr(PacketAttr::Ttl, ttl);
        packet.set_attr(PacketAttr::MaxRexmit, 4);
        packet
    }

    #[test]
    fn test_open_starts_disconnected() {
        let conn = open_conn(node(2));
        assert_eq!(conn.depth(), RTMETRIC_MAX);
        assert_eq!(conn.state(), RouteState::Disconnected);
        assert_eq!(conn.unicast().channel(), Some(129));
        assert_eq!(conn.announcer().channel(), Some(128));
        assert_eq!(conn.announcer().value(), Some(RTMETRIC_MAX));
        assert_eq!(conn.announcer().listens(), &[2]);
    }

    #[test]
    fn test_sink_is_sticky() {
        let mut conn = open_conn(node(1));
        conn.set_sink(true);
        assert_eq!(conn.depth(), 0);
        assert_eq!(conn.announcer().value(), Some(0));

        conn.on_announcement(node(2), 16);
        conn.on_packet_sent(node(2), TxOutcome::Acked, 1);
        assert_eq!(conn.depth(), 0);
        assert!(conn.is_sink());

        conn.set_sink(false);
        // Neighbor 2 is still known, so the node reconnects through it
        assert_eq!(conn.state(), RouteState::Connected);
        assert_eq!(conn.depth(), conn.neighbors().best().unwrap().combined_cost());
    }

    #[test]
    fn test_announcement_sets_metric() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), 0);

        assert_eq!(conn.depth(), 32);
        assert_eq!(conn.state(), RouteState::Connected);
        assert_eq!(conn.parent(), Some(node(1)));
        assert_eq!(conn.announcer().value(), Some(32));
    }

    #[test]
    fn test_unchanged_metric_not_reannounced() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), 0);
        let announced = conn.announcer().values().len();

        conn.on_announcement(node(1), 0);
        assert_eq!(conn.announcer().values().len(), announced);
    }

    #[test]
    fn test_announcement_from_self_ignored() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(2), 0);
        assert!(conn.neighbors().is_empty());
    }

    #[test]
    fn test_send_without_route() {
        let mut conn = open_conn(node(2));
        let status = conn.send(b"hello", 4).unwrap();

        assert_eq!(status, SendStatus::DroppedNoRoute);
        assert!(conn.unicast().sent().is_empty());
        assert_eq!(conn.announcer().listens(), &[2, 1]);
        assert!(!conn.is_forwarding());
        // The sequence number was still consumed
        assert_eq!(conn.next_seqno(), 1);
    }

    #[test]
    fn test_send_stamps_packet() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), 0);

        let status = conn.send(b"hello", 3).unwrap();
        assert_eq!(status, SendStatus::Forwarded { next_hop: node(1) });
        assert!(conn.is_forwarding());

        let sent = &conn.unicast().sent()[0];
        assert_eq!(sent.dest, node(1));
        assert_eq!(sent.max_rexmit, 3);
        assert_eq!(sent.packet.addr(PacketAddr::Esender), node(2));
        assert_eq!(sent.packet.attr(PacketAttr::EpacketId), 0);
        assert_eq!(sent.packet.attr(PacketAttr::Hops), 1);
        assert_eq!(sent.packet.attr(PacketAttr::Ttl), 10);
        assert_eq!(sent.packet.data(), b"hello");
    }

    #[test]
    fn test_sink_send_delivers_locally() {
        let mut conn = open_conn(node(1));
        conn.set_sink(true);

        assert_eq!(conn.send(b"self", 2).unwrap(), SendStatus::DeliveredLocally);
        let got = &conn.callbacks().received()[0];
        assert_eq!(got.originator, node(1));
        assert_eq!(got.hops, 0);
        assert!(conn.unicast().sent().is_empty());
    }

    #[test]
    fn test_send_on_closed_connection() {
        let mut conn = open_conn(node(2));
        conn.close();
        assert!(matches!(conn.send(b"x", 1), Err(CollectError::NotOpen)));
        assert!(conn.announcer().is_removed());
        assert!(conn.unicast().is_closed());
    }

    #[test]
    fn test_transport_rejection_clears_flag() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), 0);
        conn.unicast_mut().set_busy(true);

        assert!(matches!(conn.send(b"x", 1), Err(CollectError::TransportBusy)));
        assert!(!conn.is_forwarding());
    }

    #[test]
    fn test_sink_delivers_received_packet() {
        let mut conn = open_conn(node(1));
        conn.set_sink(true);

        conn.on_packet_received(node(3), data_from(node(4), 7, 2, 9));
        let got = &conn.callbacks().received()[0];
        assert_eq!((got.originator, got.seqno, got.hops), (node(4), 7, 2));
        assert_eq!(got.payload, b"reading");
        assert_eq!(conn.stats().delivered, 1);
    }

    #[test]
    fn test_forward_updates_hops_and_ttl() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), 0);

        conn.on_packet_received(node(3), data_from(node(3), 0, 1, 10));
        let sent = &conn.unicast().sent()[0];
        assert_eq!(sent.dest, node(1));
        assert_eq!(sent.max_rexmit, 4);
        assert_eq!(sent.packet.attr(PacketAttr::Hops), 2);
        assert_eq!(sent.packet.attr(PacketAttr::Ttl), 9);
        assert_eq!(sent.packet.addr(PacketAddr::Sender), node(2));
    }

    #[test]
    fn test_no_forward_back_to_sender() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), 0);

        conn.on_packet_received(node(1), data_from(node(5), 0, 1, 10));
        assert!(conn.unicast().sent().is_empty());
        assert_eq!(conn.stats().no_route_drops, 1);
    }

    #[test]
    fn test_ttl_exhausted_dropped() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), 0);

        conn.on_packet_received(node(3), data_from(node(3), 0, 9, 1));
        assert!(conn.unicast().sent().is_empty());
        assert_eq!(conn.stats().ttl_drops, 1);
    }

    #[test]
    fn test_disconnected_node_drops() {
        let mut conn = open_conn(node(2));
        conn.on_packet_received(node(3), data_from(node(3), 0, 1, 10));
        assert!(conn.unicast().sent().is_empty());
    }

    #[test]
    fn test_outcome_feeds_link_estimate() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), 0);
        conn.send(b"x", 4).unwrap();

        conn.on_packet_sent(node(1), TxOutcome::Acked, 1);
        assert!(!conn.is_forwarding());
        // One slot went from 4 to 1: 8 * 61 / 16 = 30
        assert_eq!(conn.depth(), 30);

        conn.send(b"y", 4).unwrap();
        conn.on_packet_sent(node(1), TxOutcome::Timeout, 5);
        // Next slot went from 4 to 10: 8 * 67 / 16 = 33
        assert_eq!(conn.depth(), 33);
        assert_eq!(conn.stats().tx_failed, 1);
    }

    #[test]
    fn test_all_failure_kinds_penalized() {
        for outcome in [TxOutcome::Collision, TxOutcome::NoAck, TxOutcome::Timeout] {
            let mut conn = open_conn(node(2));
            conn.on_announcement(node(1), 0);
            conn.on_packet_sent(node(1), outcome, 2);
            assert_eq!(conn.neighbors().find(&node(1)).unwrap().etx(), 32);
            assert!(!conn.is_forwarding());
        }
    }

    #[test]
    fn test_ack_from_unknown_neighbor_adds_it() {
        let mut conn = open_conn(node(2));
        conn.on_packet_sent(node(7), TxOutcome::Acked, 1);

        let n = conn.neighbors().find(&node(7)).unwrap();
        assert_eq!(n.rtmetric(), RTMETRIC_MAX);
        // Advertises no route, so we stay disconnected
        assert_eq!(conn.depth(), RTMETRIC_MAX);
    }

    #[test]
    fn test_expiry_disconnects() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), 0);
        assert_eq!(conn.state(), RouteState::Connected);

        conn.dispatch(CollectEvent::Tick {
            elapsed: Duration::from_secs(180),
        });
        assert!(conn.neighbors().is_empty());
        assert_eq!(conn.depth(), RTMETRIC_MAX);
        assert_eq!(conn.announcer().value(), Some(RTMETRIC_MAX));
    }

    #[test]
    fn test_metric_saturates_at_max() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), RTMETRIC_MAX - 1);
        assert_eq!(conn.depth(), RTMETRIC_MAX);
        assert_eq!(conn.state(), RouteState::Disconnected);
    }

    #[test]
    fn test_saturated_neighbor_is_not_a_next_hop() {
        let mut conn = open_conn(node(2));
        conn.on_announcement(node(1), 500);
        assert_eq!(conn.state(), RouteState::Disconnected);
        assert_eq!(conn.parent(), None);

        assert_eq!(conn.send(b"x", 3).unwrap(), SendStatus::DroppedNoRoute);
        assert!(conn.unicast().sent().is_empty());
        assert!(!conn.is_forwarding());
        assert_eq!(conn.announcer().listens(), &[2, 1]);
    }
}
