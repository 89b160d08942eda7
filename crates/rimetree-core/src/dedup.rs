//! Recent-packet cache for duplicate suppression on the forwarding path
//!
//! A tiny FIFO ring of `(originator, seqno)` pairs. Entries are never removed
//! explicitly; the oldest is overwritten. It dampens retransmission storms
//! while forwarding and does not give exactly-once delivery.

use super::packet::NodeAddr;

/// Default number of remembered packets
pub const NUM_RECENT_PACKETS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RecentPacket {
    originator: NodeAddr,
    seqno: u8,
}

/// Fixed-size ring of recently seen packets
#[derive(Debug, Clone)]
pub struct RecentPackets {
    entries: Vec<Option<RecentPacket>>,
    next: usize,
}

impl RecentPackets {
    /// Create a cache remembering `capacity` packets (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: vec![None; capacity.max(1)],
            next: 0,
        }
    }

    /// Check whether `(originator, seqno)` is in the cache
    pub fn seen(&self, originator: NodeAddr, seqno: u8) -> bool {
        self.entries
            .iter()
            .flatten()
            .any(|p| p.originator == originator && p.seqno == seqno)
    }

    /// Remember `(originator, seqno)`, overwriting the oldest entry
    pub fn record(&mut self, originator: NodeAddr, seqno: u8) {
        self.entries[self.next] = Some(RecentPacket { originator, seqno });
        self.next = (self.next + 1) % self.entries.len();
    }

    /// Check for a duplicate and record the packet if it is new
    ///
    /// Returns true if this is a NEW packet (not a duplicate)
    pub fn check_and_record(&mut self, originator: NodeAddr, seqno: u8) -> bool {
        if self.seen(originator, seqno) {
            return false;
        }
        self.record(originator, seqno);
        true
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }
}

impl Default for RecentPackets {
    fn default() -> Self {
        Self::new(NUM_RECENT_PACKETS)
    }
}
