//! # Rime Collection Tree
//!
//! This crate implements tree-based, hop-by-hop reliable data collection for
//! low-power wireless sensor networks. Every node forwards packets toward a
//! single sink along a gradient of route metrics built from neighbor
//! announcements and per-link delivery estimates.
//!
//! ## Overview
//!
//! - **Link estimation**: ETX over a moving window of recent transmissions
//! - **Neighbor table**: bounded, aging set of one-hop neighbors with their
//!   advertised metric and link estimate
//! - **Collection**: the per-node state machine that announces a metric,
//!   picks a next hop, forwards data and delivers at the sink
//! - **Duplicate suppression**: a small FIFO cache of recently seen packets
//! - **Simulation**: a deterministic multi-node radio for running whole trees
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Application (CollectCallbacks)                │
//! └──────────────────────────────────────────────────────────────┘
//!                               │ recv (sink only)
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         CollectConn                           │
//! │  ┌───────────────┐  ┌─────────────────┐  ┌────────────────┐  │
//! │  │ NeighborTable │  │  RecentPackets  │  │   rtmetric /   │  │
//! │  │ (LinkEstimate)│  │ (dup. suppress) │  │   RouteState   │  │
//! │  └───────────────┘  └─────────────────┘  └────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//!                │                                  │
//!                ▼                                  ▼
//! ┌──────────────────────────────┐  ┌───────────────────────────┐
//! │   ReliableUnicast (data)     │  │   Announcer (metric)      │
//! └──────────────────────────────┘  └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use rimetree_core::prelude::*;
//! use rimetree_core::test_impls::{MockAnnouncer, MockUnicast, RecordingCallbacks};
//!
//! let mut conn = CollectConn::new(
//!     NodeAddr::new(2, 0),
//!     CollectConfig::default(),
//!     MockUnicast::new(),
//!     MockAnnouncer::new(),
//!     RecordingCallbacks::new(),
//! )
//! .unwrap();
//! conn.open(128).unwrap();
//!
//! // The sink (1.0) announces metric 0
//! conn.dispatch(CollectEvent::AnnouncementReceived {
//!     from: NodeAddr::new(1, 0),
//!     value: 0,
//! });
//! assert_eq!(conn.depth(), 32);
//!
//! let status = conn.send(b"temperature=21", 4).unwrap();
//! assert_eq!(status, SendStatus::Forwarded { next_hop: NodeAddr::new(1, 0) });
//! ```

pub mod collect;
pub mod config;
pub mod dedup;
pub mod error;
pub mod link_estimate;
pub mod neighbor;
pub mod packet;
pub mod simulation;
pub mod test_impls;
pub mod traits;

// Re-export main types
pub use collect::{CollectConn, RouteState, SendStatus, RTMETRIC_MAX, RTMETRIC_SINK};
pub use config::{CollectConfig, MAX_HOPLIM};
pub use dedup::{RecentPackets, NUM_RECENT_PACKETS};
pub use error::{CollectError, CollectResult};
pub use link_estimate::LinkEstimate;
pub use neighbor::{AddResult, Neighbor, NeighborTable};
pub use packet::{NodeAddr, PacketAddr, PacketAttr, PacketBuffer};
pub use simulation::{CollectSimulator, SimConfig, SimStats, Topology};
pub use traits::{Announcer, CollectCallbacks, CollectEvent, CollectStats, ReliableUnicast, TxOutcome};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::collect::{CollectConn, RouteState, SendStatus};
    pub use crate::config::CollectConfig;
    pub use crate::error::{CollectError, CollectResult};
    pub use crate::packet::{NodeAddr, PacketBuffer};
    pub use crate::traits::{Announcer, CollectCallbacks, CollectEvent, ReliableUnicast, TxOutcome};
}
