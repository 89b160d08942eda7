//! Neighbor table for the collection tree
//!
//! Tracks one-hop neighbors, the route metric each of them last advertised,
//! and an ETX [`LinkEstimate`] for the link to each of them. The table has a
//! fixed capacity; a full table refuses new entries instead of evicting, so
//! the owner decides what to age out.
//!
//! Entries are kept in insertion order, which makes [`NeighborTable::best`]
//! deterministic: among equal combined costs the earliest entry wins.

use super::collect::RTMETRIC_MAX;
use super::link_estimate::LinkEstimate;
use super::packet::NodeAddr;
use std::time::Duration;

/// Outcome of [`NeighborTable::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    /// A new entry was created with a fresh link estimate
    Added,
    /// The address is already in the table; nothing changed
    AlreadyExists,
    /// The table is at capacity; nothing changed
    TableFull,
}

/// A neighboring node (directly reachable)
#[derive(Debug, Clone)]
pub struct Neighbor {
    addr: NodeAddr,
    /// Route metric most recently advertised by this neighbor
    rtmetric: u16,
    link_estimate: LinkEstimate,
    /// Time since the entry was last refreshed
    age: Duration,
}

impl Neighbor {
    /// Create a new neighbor entry with a pessimistic link estimate
    pub fn new(addr: NodeAddr, rtmetric: u16) -> Self {
        Self {
            addr,
            rtmetric,
            link_estimate: LinkEstimate::new(),
            age: Duration::ZERO,
        }
    }

    /// Link-layer address
    pub fn addr(&self) -> NodeAddr {
        self.addr
    }

    /// Advertised route metric
    pub fn rtmetric(&self) -> u16 {
        self.rtmetric
    }

    /// Current ETX to this neighbor
    pub fn etx(&self) -> u16 {
        self.link_estimate.etx()
    }

    /// Route metric plus link ETX: what routing through this neighbor costs
    pub fn combined_cost(&self) -> u16 {
        self.rtmetric.saturating_add(self.etx())
    }

    /// The link estimate for this neighbor
    pub fn link_estimate(&self) -> &LinkEstimate {
        &self.link_estimate
    }

    /// Time since the entry was last refreshed
    pub fn age(&self) -> Duration {
        self.age
    }

    /// Check if the entry has outlived `lifetime`
    pub fn is_stale(&self, lifetime: Duration) -> bool {
        self.age >= lifetime
    }

    /// Whether routing through this neighbor reaches the sink below [`RTMETRIC_MAX`]
    pub fn has_route(&self) -> bool {
        self.rtmetric < RTMETRIC_MAX && self.combined_cost() < RTMETRIC_MAX
    }

    fn refresh(&mut self) {
        self.age = Duration::ZERO;
    }
}

/// Bounded neighbor table
#[derive(Debug)]
pub struct NeighborTable {
    neighbors: Vec<Neighbor>,
    capacity: usize,
    lifetime: Duration,
}

impl NeighborTable {
    /// Create a new neighbor table
    pub fn new(capacity: usize, lifetime_secs: u64) -> Self {
        Self {
            neighbors: Vec::with_capacity(capacity),
            capacity,
            lifetime: Duration::from_secs(lifetime_secs),
        }
    }

    /// Insert a neighbor unless it is known or the table is full
    pub fn add(&mut self, addr: NodeAddr, rtmetric: u16) -> AddResult {
        if self.find(&addr).is_some() {
            return AddResult::AlreadyExists;
        }
        if self.neighbors.len() >= self.capacity {
            tracing::warn!(%addr, capacity = self.capacity, "neighbor table full, dropping new neighbor");
            return AddResult::TableFull;
        }
        tracing::debug!(%addr, rtmetric, "adding neighbor");
        self.neighbors.push(Neighbor::new(addr, rtmetric));
        AddResult::Added
    }

    /// Overwrite the advertised route metric of a known neighbor
    ///
    /// Leaves the link estimate alone. Returns `false` if `addr` is unknown.
    pub fn update_rtmetric(&mut self, addr: &NodeAddr, rtmetric: u16) -> bool {
        match self.find_mut(addr) {
            Some(n) => {
                n.rtmetric = rtmetric;
                n.refresh();
                true
            }
            None => false,
        }
    }

    /// Feed an acknowledged transmission into the neighbor's link estimate
    ///
    /// No-op for unknown addresses; returns whether an entry was updated.
    pub fn record_tx(&mut self, addr: &NodeAddr, attempts: u8) -> bool {
        match self.find_mut(addr) {
            Some(n) => {
                n.link_estimate.record_success(attempts);
                n.refresh();
                true
            }
            None => false,
        }
    }

    /// Feed a failed transmission into the neighbor's link estimate
    ///
    /// No-op for unknown addresses; returns whether an entry was updated.
    pub fn record_timeout(&mut self, addr: &NodeAddr, attempts: u8) -> bool {
        match self.find_mut(addr) {
            Some(n) => {
                n.link_estimate.record_failure(attempts);
                true
            }
            None => false,
        }
    }

    /// Look up a neighbor by address
    pub fn find(&self, addr: &NodeAddr) -> Option<&Neighbor> {
        self.neighbors.iter().find(|n| n.addr == *addr)
    }

    fn find_mut(&mut self, addr: &NodeAddr) -> Option<&mut Neighbor> {
        self.neighbors.iter_mut().find(|n| n.addr == *addr)
    }

    /// The neighbor with the lowest route metric + ETX
    ///
    /// Neighbors whose route metric + ETX reaches [`RTMETRIC_MAX`] have no
    /// route and are skipped. Ties go to the entry inserted first.
    pub fn best(&self) -> Option<&Neighbor> {
        let mut best: Option<&Neighbor> = None;
        for n in self.neighbors.iter().filter(|n| n.has_route()) {
            match best {
                Some(b) if b.combined_cost() <= n.combined_cost() => {}
                _ => best = Some(n),
            }
        }
        best
    }

    /// Remove a neighbor
    pub fn remove(&mut self, addr: &NodeAddr) -> Option<Neighbor> {
        let idx = self.neighbors.iter().position(|n| n.addr == *addr)?;
        tracing::debug!(%addr, "removing neighbor");
        Some(self.neighbors.remove(idx))
    }

    /// Age every entry by `elapsed` and evict those past the lifetime
    ///
    /// Returns the evicted addresses.
    pub fn tick(&mut self, elapsed: Duration) -> Vec<NodeAddr> {
        let lifetime = self.lifetime;
        let mut expired = Vec::new();
        self.neighbors.retain_mut(|n| {
            n.age = n.age.saturating_add(elapsed);
            if n.is_stale(lifetime) {
                expired.push(n.addr);
                false
            } else {
                true
            }
        });
        for addr in &expired {
            tracing::debug!(%addr, "neighbor expired");
        }
        expired
    }

    /// Change how long an entry survives without a refresh
    pub fn set_lifetime(&mut self, seconds: u64) {
        self.lifetime = Duration::from_secs(seconds);
    }

    /// Entry lifetime
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the neighbor at `index` in insertion order
    pub fn get(&self, index: usize) -> Option<&Neighbor> {
        self.neighbors.get(index)
    }

    /// Iterate over all neighbors in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Neighbor> {
        self.neighbors.iter()
    }

    /// Get neighbor count
    pub fn len(&self) -> usize {
        self.neighbors.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.neighbors.is_empty()
    }

    /// Clear all neighbors
    pub fn clear(&mut self) {
        self.neighbors.clear();
    }
}

impl Default for NeighborTable {
    fn default() -> Self {
        Self::new(8, 180)
    }
}
