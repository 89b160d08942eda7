//! Node addressing and the collection packet buffer
//!
//! The collection layer reads and writes per-packet attributes by symbolic
//! key, the same way the radio stack's packet buffer works, but every event
//! owns its own [`PacketBuffer`] instead of sharing one global scratch area.
//!
//! ## Frame Structure
//!
//! ```text
//! ┌──────────────┬────────────┬──────────┬──────────┬────────────┬─────────────┐
//! │ Esender (2B) │ Seqno (1B) │ Hops(1B) │ TTL (1B) │ Rexmit(1B) │ Payload     │
//! └──────────────┴────────────┴──────────┴──────────┴────────────┴─────────────┘
//! ```

use crate::error::{CollectError, CollectResult};
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Cursor, Read};

/// Link-layer node address (2 bytes, compared by value)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct NodeAddr([u8; 2]);

impl NodeAddr {
    /// The all-zero address, used for unset address slots
    pub const NULL: NodeAddr = NodeAddr([0, 0]);

    /// Create an address from its two bytes
    pub const fn new(hi: u8, lo: u8) -> Self {
        NodeAddr([hi, lo])
    }

    /// Create an address from raw bytes
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        NodeAddr(bytes)
    }

    /// Create an address from a u16
    pub fn from_u16(value: u16) -> Self {
        NodeAddr(value.to_be_bytes())
    }

    /// Convert to u16
    pub fn to_u16(&self) -> u16 {
        u16::from_be_bytes(self.0)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 2] {
        &self.0
    }

    /// Check if this is the null address
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl fmt::Debug for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddr({}.{})", self.0[0], self.0[1])
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0[0], self.0[1])
    }
}

impl std::str::FromStr for NodeAddr {
    type Err = CollectError;

    /// Parse `a.b` notation
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hi, lo) = s
            .split_once('.')
            .ok_or_else(|| CollectError::InvalidConfig(format!("bad node address '{}'", s)))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<u8>()
                .map_err(|e| CollectError::InvalidConfig(format!("bad node address '{}': {}", s, e)))
        };
        Ok(NodeAddr([parse(hi)?, parse(lo)?]))
    }
}

/// Numeric packet attributes carried with every collection data packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketAttr {
    /// End-to-end sequence number assigned by the originator
    EpacketId = 0,
    /// Hops travelled so far
    Hops = 1,
    /// Remaining hop budget
    Ttl = 2,
    /// Retransmission budget for each reliable unicast hop
    MaxRexmit = 3,
}

const ATTR_COUNT: usize = 4;

/// Address attributes of a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketAddr {
    /// Link-layer sender of the current hop
    Sender = 0,
    /// Link-layer receiver of the current hop
    Receiver = 1,
    /// End-to-end originator
    Esender = 2,
}

const ADDR_COUNT: usize = 3;

/// Size of the encoded collection header
pub const FRAME_HEADER_LEN: usize = 6;

/// The packet currently being processed: attributes plus payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketBuffer {
    attrs: [u8; ATTR_COUNT],
    addrs: [NodeAddr; ADDR_COUNT],
    payload: Vec<u8>,
}

impl PacketBuffer {
    /// Create an empty packet buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a packet buffer holding a copy of `data`
    pub fn from_payload(data: &[u8]) -> Self {
        let mut buf = Self::new();
        buf.copy_from(data);
        buf
    }

    /// Read an attribute
    pub fn attr(&self, attr: PacketAttr) -> u8 {
        self.attrs[attr as usize]
    }

    /// Write an attribute
    pub fn set_attr(&mut self, attr: PacketAttr, value: u8) {
        self.attrs[attr as usize] = value;
    }

    /// Read an address attribute
    pub fn addr(&self, which: PacketAddr) -> NodeAddr {
        self.addrs[which as usize]
    }

    /// Write an address attribute
    pub fn set_addr(&mut self, which: PacketAddr, addr: NodeAddr) {
        self.addrs[which as usize] = addr;
    }

    /// Replace the payload with a copy of `data`
    pub fn copy_from(&mut self, data: &[u8]) {
        self.payload.clear();
        self.payload.extend_from_slice(data);
    }

    /// Payload bytes
    pub fn data(&self) -> &[u8] {
        &self.payload
    }

    /// Payload length
    pub fn data_len(&self) -> usize {
        self.payload.len()
    }

    /// Reset all attributes, addresses and the payload
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Encode the collection header and payload for the radio
    pub fn to_frame(&self) -> Vec<u8> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        BigEndian::write_u16(&mut header[0..2], self.addr(PacketAddr::Esender).to_u16());
        header[2] = self.attr(PacketAttr::EpacketId);
        header[3] = self.attr(PacketAttr::Hops);
        header[4] = self.attr(PacketAttr::Ttl);
        header[5] = self.attr(PacketAttr::MaxRexmit);

        let mut out = Vec::with_capacity(FRAME_HEADER_LEN + self.payload.len());
        out.extend_from_slice(&header);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Decode a frame produced by [`to_frame`](Self::to_frame)
    ///
    /// Link-layer sender/receiver are not part of the frame; the transport
    /// fills them in.
    pub fn from_frame(frame: &[u8]) -> CollectResult<Self> {
        if frame.len() < FRAME_HEADER_LEN {
            return Err(CollectError::MalformedFrame(format!(
                "{} bytes, need at least {}",
                frame.len(),
                FRAME_HEADER_LEN
            )));
        }

        let mut cursor = Cursor::new(frame);
        let mut buf = Self::new();
        buf.set_addr(
            PacketAddr::Esender,
            NodeAddr::from_u16(cursor.read_u16::<BigEndian>()?),
        );
        buf.set_attr(PacketAttr::EpacketId, cursor.read_u8()?);
        buf.set_attr(PacketAttr::Hops, cursor.read_u8()?);
        buf.set_attr(PacketAttr::Ttl, cursor.read_u8()?);
        buf.set_attr(PacketAttr::MaxRexmit, cursor.read_u8()?);
        cursor.read_to_end(&mut buf.payload)?;
        Ok(buf)
    }
}
