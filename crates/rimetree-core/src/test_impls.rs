//! Recording implementations of the collaborator traits for tests and doc examples.

use crate::error::{CollectError, CollectResult};
use crate::packet::{NodeAddr, PacketBuffer};
use crate::traits::{Announcer, CollectCallbacks, ReliableUnicast};

/// A packet handed to [`MockUnicast::send`]
#[derive(Debug, Clone)]
pub struct SentPacket {
    /// Next hop
    pub dest: NodeAddr,
    /// Packet as it was at send time
    pub packet: PacketBuffer,
    /// Retransmission budget
    pub max_rexmit: u8,
}

/// Reliable unicast that records every accepted packet
#[derive(Debug, Default)]
pub struct MockUnicast {
    channel: Option<u16>,
    sent: Vec<SentPacket>,
    busy: bool,
    closed: bool,
}

impl MockUnicast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail with [`CollectError::TransportBusy`]
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Channel passed to `open`
    pub fn channel(&self) -> Option<u16> {
        self.channel
    }

    /// Accepted packets, oldest first
    pub fn sent(&self) -> &[SentPacket] {
        &self.sent
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl ReliableUnicast for MockUnicast {
    fn open(&mut self, channel: u16) -> CollectResult<()> {
        self.channel = Some(channel);
        self.closed = false;
        Ok(())
    }

    fn send(&mut self, dest: NodeAddr, packet: &PacketBuffer, max_rexmit: u8) -> CollectResult<()> {
        if self.busy {
            return Err(CollectError::TransportBusy);
        }
        self.sent.push(SentPacket {
            dest,
            packet: packet.clone(),
            max_rexmit,
        });
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Announcer that records values and listen requests
#[derive(Debug, Default)]
pub struct MockAnnouncer {
    channel: Option<u16>,
    value: Option<u16>,
    values: Vec<u16>,
    listens: Vec<u8>,
    removed: bool,
}

impl MockAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Channel passed to `register`
    pub fn channel(&self) -> Option<u16> {
        self.channel
    }

    /// Currently announced value
    pub fn value(&self) -> Option<u16> {
        self.value
    }

    /// Every value passed to `set_value`, oldest first
    pub fn values(&self) -> &[u16] {
        &self.values
    }

    /// Every listen burst requested, oldest first
    pub fn listens(&self) -> &[u8] {
        &self.listens
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

impl Announcer for MockAnnouncer {
    fn register(&mut self, channel: u16, value: u16) {
        self.channel = Some(channel);
        self.value = Some(value);
        self.removed = false;
    }

    fn set_value(&mut self, value: u16) {
        self.value = Some(value);
        self.values.push(value);
    }

    fn listen(&mut self, bursts: u8) {
        self.listens.push(bursts);
    }

    fn remove(&mut self) {
        self.removed = true;
    }
}

/// A packet delivered to the application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub originator: NodeAddr,
    pub seqno: u8,
    pub hops: u8,
    pub payload: Vec<u8>,
}

/// Application callbacks that keep every delivery
#[derive(Debug, Default)]
pub struct RecordingCallbacks {
    received: Vec<Delivery>,
}

impl RecordingCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries, oldest first
    pub fn received(&self) -> &[Delivery] {
        &self.received
    }

    /// Forget recorded deliveries
    pub fn clear(&mut self) {
        self.received.clear();
    }
}

impl CollectCallbacks for RecordingCallbacks {
    fn recv(&mut self, originator: NodeAddr, seqno: u8, hops: u8, payload: &[u8]) {
        self.received.push(Delivery {
            originator,
            seqno,
            hops,
            payload: payload.to_vec(),
        });
    }
}
