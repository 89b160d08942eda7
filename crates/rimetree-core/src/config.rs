//! Configuration for a collection connection.

use crate::dedup::NUM_RECENT_PACKETS;
use crate::error::{CollectError, CollectResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Hop limit stamped on originated packets
pub const MAX_HOPLIM: u8 = 10;

/// Tunables for one collection tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    /// Neighbor table capacity
    pub neighbor_capacity: usize,

    /// Seconds a neighbor survives without being refreshed
    pub neighbor_lifetime_secs: u64,

    /// TTL stamped on originated packets
    pub max_hop_limit: u8,

    /// Size of the recent-packet cache
    pub recent_packets: usize,

    /// Listen bursts requested when the connection opens
    pub open_listen_bursts: u8,

    /// Listen bursts requested when `send` finds no route
    pub no_route_listen_bursts: u8,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            neighbor_capacity: 8,
            neighbor_lifetime_secs: 180,
            max_hop_limit: MAX_HOPLIM,
            recent_packets: NUM_RECENT_PACKETS,
            open_listen_bursts: 2,
            no_route_listen_bursts: 1,
        }
    }
}

impl CollectConfig {
    /// Builder: neighbor table capacity
    pub fn with_neighbor_capacity(mut self, capacity: usize) -> Self {
        self.neighbor_capacity = capacity;
        self
    }

    /// Builder: neighbor lifetime
    pub fn with_neighbor_lifetime(mut self, secs: u64) -> Self {
        self.neighbor_lifetime_secs = secs;
        self
    }

    /// Builder: hop limit
    pub fn with_max_hop_limit(mut self, hops: u8) -> Self {
        self.max_hop_limit = hops;
        self
    }

    /// Builder: recent-packet cache size
    pub fn with_recent_packets(mut self, count: usize) -> Self {
        self.recent_packets = count;
        self
    }

    /// Check that the values are usable
    pub fn validate(&self) -> CollectResult<()> {
        if self.neighbor_capacity == 0 {
            return Err(CollectError::InvalidConfig(
                "neighbor_capacity must be at least 1".into(),
            ));
        }
        if self.neighbor_lifetime_secs == 0 {
            return Err(CollectError::InvalidConfig(
                "neighbor_lifetime_secs must be at least 1".into(),
            ));
        }
        if self.recent_packets == 0 {
            return Err(CollectError::InvalidConfig(
                "recent_packets must be at least 1".into(),
            ));
        }
        if self.max_hop_limit == 0 {
            return Err(CollectError::InvalidConfig(
                "max_hop_limit must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> CollectResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CollectError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file
    pub fn load(path: impl AsRef<Path>) -> CollectResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Pretty JSON representation
    pub fn to_json(&self) -> CollectResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CollectError::InvalidConfig(e.to_string()))
    }
}
