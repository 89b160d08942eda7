//! Collaborator interfaces for the collection layer
//!
//! The connection never talks to a radio directly. It depends on two
//! primitives below it and one callback above it:
//!
//! - [`ReliableUnicast`]: acknowledged point-to-point send with bounded
//!   retransmission. Outcomes come back later as [`CollectEvent::PacketSent`].
//! - [`Announcer`]: periodic broadcast of one small value (our route metric).
//!   Values heard from neighbors come back as
//!   [`CollectEvent::AnnouncementReceived`].
//! - [`CollectCallbacks`]: the application, invoked only at the sink.
//!
//! Implementations exist for the in-memory simulator and for tests
//! ([`test_impls`](crate::test_impls)); a radio driver implements the same traits.

use super::error::CollectResult;
use super::packet::{NodeAddr, PacketBuffer};
use std::time::Duration;

/// Reliable unicast endpoint
pub trait ReliableUnicast {
    /// Open the endpoint on `channel`
    fn open(&mut self, channel: u16) -> CollectResult<()>;

    /// Hand `packet` to the transport for delivery to `dest`
    ///
    /// Returns immediately. `Err` means the transport refused the packet
    /// (e.g. it is still busy with the previous one); `Ok` means an outcome
    /// event will follow.
    fn send(&mut self, dest: NodeAddr, packet: &PacketBuffer, max_rexmit: u8) -> CollectResult<()>;

    /// Close the endpoint
    fn close(&mut self);
}

/// Announcement (beacon) primitive
pub trait Announcer {
    /// Start announcing `value` on `channel`
    fn register(&mut self, channel: u16, value: u16);

    /// Change the announced value; triggers a re-beacon
    fn set_value(&mut self, value: u16);

    /// Request `bursts` extra solicit cycles so neighbors announce to us
    fn listen(&mut self, bursts: u8);

    /// Stop announcing
    fn remove(&mut self);
}

/// Application callbacks
pub trait CollectCallbacks {
    /// A data packet reached the sink
    fn recv(&mut self, originator: NodeAddr, seqno: u8, hops: u8, payload: &[u8]);
}

impl<F> CollectCallbacks for F
where
    F: FnMut(NodeAddr, u8, u8, &[u8]),
{
    fn recv(&mut self, originator: NodeAddr, seqno: u8, hops: u8, payload: &[u8]) {
        self(originator, seqno, hops, payload)
    }
}

/// Outcome of a reliable unicast transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// Acknowledged by the receiver
    Acked,
    /// Lost to a collision
    Collision,
    /// Transmitted but never acknowledged
    NoAck,
    /// Retransmission budget exhausted
    Timeout,
}

impl TxOutcome {
    /// Whether the packet reached the next hop
    pub fn is_success(&self) -> bool {
        matches!(self, TxOutcome::Acked)
    }
}

/// Events driving a collection connection
#[derive(Debug, Clone)]
pub enum CollectEvent {
    /// A data packet arrived over reliable unicast from one-hop neighbor `from`
    PacketReceived {
        /// Link-layer sender
        from: NodeAddr,
        /// The received packet
        packet: PacketBuffer,
    },
    /// The transport finished with a packet we handed it
    PacketSent {
        /// Next hop the packet was addressed to
        to: NodeAddr,
        /// How it ended
        outcome: TxOutcome,
        /// Transmissions used, including the first
        transmissions: u8,
    },
    /// A neighbor's beacon carried its route metric
    AnnouncementReceived {
        /// Announcing neighbor
        from: NodeAddr,
        /// Announced route metric
        value: u16,
    },
    /// Periodic timer for neighbor aging
    Tick {
        /// Time since the previous tick
        elapsed: Duration,
    },
}

/// Statistics for a collection connection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectStats {
    /// Packets originated with `send`
    pub originated: u64,
    /// Packets handed to the application (sink only)
    pub delivered: u64,
    /// Packets relayed toward the sink
    pub forwarded: u64,
    /// Packets dropped by the recent-packet cache
    pub duplicates_dropped: u64,
    /// Sends or forwards dropped for lack of a next hop
    pub no_route_drops: u64,
    /// Forwards dropped because another packet was in flight
    pub busy_drops: u64,
    /// Packets dropped because their TTL ran out
    pub ttl_drops: u64,
    /// Transmissions acknowledged by the next hop
    pub tx_ok: u64,
    /// Transmissions that failed (collision, no ack, timeout)
    pub tx_failed: u64,
    /// Number of times our route metric changed
    pub metric_changes: u64,
}
