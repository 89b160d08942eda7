//! Multi-node collection tree simulation
//!
//! Runs a set of [`CollectConn`]s over an in-memory lossy radio, without
//! hardware. It models:
//!
//! - Node placement on a line or a grid, with a fixed radio range
//! - Independent per-transmission loss
//! - Reliable unicast with bounded retransmission (acked or timed out)
//! - Periodic beacons, value-change re-beacons and listen bursts
//! - A FIFO event queue standing in for the run-to-completion scheduler
//!
//! ## Example
//!
//! ```
//! use rimetree_core::simulation::{CollectSimulator, SimConfig, Topology};
//!
//! let config = SimConfig::default()
//!     .with_node_count(5)
//!     .with_topology(Topology::Line)
//!     .with_link_loss(0.0);
//! let mut sim = CollectSimulator::new(config).unwrap();
//!
//! sim.run(200);
//! assert!(sim.is_converged());
//! assert!(sim.stats().delivery_rate() > 0.9);
//! ```

use super::collect::{CollectConn, RouteState, SendStatus};
use super::config::CollectConfig;
use super::error::{CollectError, CollectResult};
use super::packet::{NodeAddr, PacketBuffer};
use super::test_impls::{Delivery, RecordingCallbacks};
use super::traits::{Announcer, CollectEvent, CollectStats, ReliableUnicast, TxOutcome};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Channel the simulated collection tree runs on
pub const SIM_CHANNEL: u16 = 128;

/// Upper bound on radio requests and events handled in one step
const MAX_EVENTS_PER_STEP: usize = 100_000;

/// Node placement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Topology {
    /// Node `i` at `(i, 0)`
    Line,
    /// Node `i` at `(i % width, i / width)`
    Grid {
        /// Nodes per row
        width: usize,
    },
}

impl Topology {
    fn position(&self, idx: usize) -> (f64, f64) {
        match *self {
            Topology::Line => (idx as f64, 0.0),
            Topology::Grid { width } => {
                let width = width.max(1);
                ((idx % width) as f64, (idx / width) as f64)
            }
        }
    }
}

/// Simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of nodes; node 0 is the sink
    pub node_count: usize,
    /// Node placement
    pub topology: Topology,
    /// Radio range in grid units
    pub radio_range: f64,
    /// Probability that any single transmission is lost (0.0 - 1.0)
    pub link_loss: f64,
    /// Steps between periodic beacons
    pub beacon_interval: u64,
    /// Steps between originated readings per node
    pub message_interval: u64,
    /// Retransmission budget for originated packets
    pub max_rexmit: u8,
    /// Simulated time per step
    pub step_millis: u64,
    /// Random seed for reproducibility
    pub seed: u64,
    /// Per-node collection config
    pub collect: CollectConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_count: 8,
            topology: Topology::Line,
            radio_range: 1.0,
            link_loss: 0.1,
            beacon_interval: 10,
            message_interval: 20,
            max_rexmit: 4,
            step_millis: 1000,
            seed: 42,
            collect: CollectConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn with_node_count(mut self, count: usize) -> Self {
        self.node_count = count;
        self
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_radio_range(mut self, range: f64) -> Self {
        self.radio_range = range;
        self
    }

    pub fn with_link_loss(mut self, loss: f64) -> Self {
        self.link_loss = loss;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_message_interval(mut self, steps: u64) -> Self {
        self.message_interval = steps;
        self
    }

    pub fn with_collect_config(mut self, config: CollectConfig) -> Self {
        self.collect = config;
        self
    }

    fn validate(&self) -> CollectResult<()> {
        if self.node_count == 0 || self.node_count > u8::MAX as usize {
            return Err(CollectError::InvalidConfig(format!(
                "node_count must be 1..=255, got {}",
                self.node_count
            )));
        }
        if !(0.0..=1.0).contains(&self.link_loss) {
            return Err(CollectError::InvalidConfig(format!(
                "link_loss must be within 0.0..=1.0, got {}",
                self.link_loss
            )));
        }
        if self.beacon_interval == 0 {
            return Err(CollectError::InvalidConfig(
                "beacon_interval must be at least 1".into(),
            ));
        }
        self.collect.validate()
    }
}

/// Something a node asked its radio to do
#[derive(Debug)]
enum RadioRequest {
    Unicast {
        from: usize,
        dest: NodeAddr,
        packet: PacketBuffer,
        max_rexmit: u8,
    },
    Announce {
        from: usize,
        value: u16,
    },
    Listen {
        from: usize,
        bursts: u8,
    },
}

type Outbox = Rc<RefCell<VecDeque<RadioRequest>>>;

/// Reliable unicast endpoint backed by the simulated radio
#[derive(Debug)]
pub struct SimUnicast {
    node: usize,
    outbox: Outbox,
    channel: Option<u16>,
    in_flight: bool,
}

impl SimUnicast {
    fn finish(&mut self) {
        self.in_flight = false;
    }
}

impl ReliableUnicast for SimUnicast {
    fn open(&mut self, channel: u16) -> CollectResult<()> {
        self.channel = Some(channel);
        Ok(())
    }

    fn send(&mut self, dest: NodeAddr, packet: &PacketBuffer, max_rexmit: u8) -> CollectResult<()> {
        if self.channel.is_none() {
            return Err(CollectError::Transport("unicast endpoint not open".into()));
        }
        if self.in_flight {
            return Err(CollectError::TransportBusy);
        }
        self.in_flight = true;
        self.outbox.borrow_mut().push_back(RadioRequest::Unicast {
            from: self.node,
            dest,
            packet: packet.clone(),
            max_rexmit,
        });
        Ok(())
    }

    fn close(&mut self) {
        self.channel = None;
        self.in_flight = false;
    }
}

/// Announcement endpoint backed by the simulated radio
#[derive(Debug)]
pub struct SimAnnouncer {
    node: usize,
    outbox: Outbox,
    value: Option<u16>,
}

impl SimAnnouncer {
    /// Announced value, if registered
    pub fn value(&self) -> Option<u16> {
        self.value
    }
}

impl Announcer for SimAnnouncer {
    fn register(&mut self, _channel: u16, value: u16) {
        self.value = Some(value);
        self.outbox.borrow_mut().push_back(RadioRequest::Announce {
            from: self.node,
            value,
        });
    }

    fn set_value(&mut self, value: u16) {
        if self.value.is_none() {
            return;
        }
        self.value = Some(value);
        self.outbox.borrow_mut().push_back(RadioRequest::Announce {
            from: self.node,
            value,
        });
    }

    fn listen(&mut self, bursts: u8) {
        self.outbox.borrow_mut().push_back(RadioRequest::Listen {
            from: self.node,
            bursts,
        });
    }

    fn remove(&mut self) {
        self.value = None;
    }
}

/// A collection connection wired to the simulated radio
pub type SimConn = CollectConn<SimUnicast, SimAnnouncer, RecordingCallbacks>;

/// Simulation statistics
#[derive(Debug, Clone, Default)]
pub struct SimStats {
    /// Readings originated by non-sink nodes
    pub messages_sent: u64,
    /// Readings that reached the sink
    pub messages_delivered: u64,
    /// Readings refused at the source for lack of a route
    pub messages_no_route: u64,
    /// Unicast transmissions put on the air, retransmissions included
    pub unicast_transmissions: u64,
    /// Unicast packets that exhausted their retransmission budget
    pub unicast_timeouts: u64,
    /// Beacons put on the air
    pub beacons: u64,
    /// Average hop count of delivered readings
    pub avg_hops: f64,
    /// Per-node statistics
    pub per_node: Vec<NodeStats>,
}

impl SimStats {
    /// Reading delivery rate (0.0 - 1.0)
    pub fn delivery_rate(&self) -> f64 {
        if self.messages_sent == 0 {
            0.0
        } else {
            self.messages_delivered as f64 / self.messages_sent as f64
        }
    }
}

/// Per-node statistics
#[derive(Debug, Clone)]
pub struct NodeStats {
    pub addr: NodeAddr,
    pub state: RouteState,
    pub depth: u16,
    pub parent: Option<NodeAddr>,
    pub neighbors: usize,
    pub collect: CollectStats,
}

/// Multi-node collection tree simulator
pub struct CollectSimulator {
    config: SimConfig,
    nodes: Vec<SimConn>,
    positions: Vec<(f64, f64)>,
    outbox: Outbox,
    events: VecDeque<(usize, CollectEvent)>,
    step_count: u64,
    rng: StdRng,
    messages_sent: u64,
    messages_no_route: u64,
    unicast_transmissions: u64,
    unicast_timeouts: u64,
    beacons: u64,
}

impl CollectSimulator {
    /// Create a simulator, open every node and make node 0 the sink
    pub fn new(config: SimConfig) -> CollectResult<Self> {
        config.validate()?;

        let outbox: Outbox = Rc::new(RefCell::new(VecDeque::new()));
        let mut nodes = Vec::with_capacity(config.node_count);
        let mut positions = Vec::with_capacity(config.node_count);

        for idx in 0..config.node_count {
            let unicast = SimUnicast {
                node: idx,
                outbox: Rc::clone(&outbox),
                channel: None,
                in_flight: false,
            };
            let announcer = SimAnnouncer {
                node: idx,
                outbox: Rc::clone(&outbox),
                value: None,
            };
            let mut conn = CollectConn::new(
                Self::addr_of(idx),
                config.collect.clone(),
                unicast,
                announcer,
                RecordingCallbacks::new(),
            )?;
            conn.open(SIM_CHANNEL)?;
            nodes.push(conn);
            positions.push(config.topology.position(idx));
        }

        nodes[0].set_sink(true);
        tracing::info!(nodes = config.node_count, topology = ?config.topology, "simulation initialized");

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            nodes,
            positions,
            outbox,
            events: VecDeque::new(),
            step_count: 0,
            messages_sent: 0,
            messages_no_route: 0,
            unicast_transmissions: 0,
            unicast_timeouts: 0,
            beacons: 0,
        })
    }

    /// Address of node `idx`
    pub fn addr_of(idx: usize) -> NodeAddr {
        NodeAddr::new((idx + 1) as u8, 0)
    }

    fn index_of(&self, addr: NodeAddr) -> Option<usize> {
        let [hi, lo] = *addr.as_bytes();
        let idx = (hi as usize).checked_sub(1)?;
        (lo == 0 && idx < self.nodes.len()).then_some(idx)
    }

    fn in_range(&self, a: usize, b: usize) -> bool {
        if a == b {
            return false;
        }
        let (ax, ay) = self.positions[a];
        let (bx, by) = self.positions[b];
        let dist = ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt();
        dist <= self.config.radio_range + 1e-9
    }

    fn survives(&mut self) -> bool {
        !self.rng.gen_bool(self.config.link_loss)
    }

    /// Run one simulation step
    pub fn step(&mut self) {
        self.step_count += 1;

        // 1. Neighbor aging
        let elapsed = Duration::from_millis(self.config.step_millis);
        for idx in 0..self.nodes.len() {
            self.events.push_back((idx, CollectEvent::Tick { elapsed }));
        }

        // 2. Periodic beacons
        if self.step_count % self.config.beacon_interval == 0 {
            for idx in 0..self.nodes.len() {
                if let Some(value) = self.nodes[idx].announcer().value() {
                    self.broadcast(idx, value);
                }
            }
        }

        // 3. Readings from every non-sink node that is not busy forwarding
        if self.config.message_interval > 0 && self.step_count % self.config.message_interval == 0
        {
            self.generate_readings();
        }

        self.pump();
    }

    fn generate_readings(&mut self) {
        for idx in 0..self.nodes.len() {
            let node = &mut self.nodes[idx];
            if node.is_sink() || node.is_forwarding() {
                continue;
            }
            let payload = format!("reading {} from {}", self.step_count, node.addr());
            match node.send(payload.as_bytes(), self.config.max_rexmit) {
                Ok(SendStatus::DroppedNoRoute) => {
                    self.messages_sent += 1;
                    self.messages_no_route += 1;
                }
                Ok(_) => self.messages_sent += 1,
                Err(e) => tracing::debug!(node = %node.addr(), error = %e, "send refused"),
            }
        }
    }

    /// Handle radio requests and queued events until both run dry
    fn pump(&mut self) {
        for _ in 0..MAX_EVENTS_PER_STEP {
            let request = self.outbox.borrow_mut().pop_front();
            if let Some(request) = request {
                self.handle_request(request);
                continue;
            }

            match self.events.pop_front() {
                Some((idx, event)) => {
                    let node = &mut self.nodes[idx];
                    if matches!(event, CollectEvent::PacketSent { .. }) {
                        node.unicast_mut().finish();
                    }
                    node.dispatch(event);
                }
                None => return,
            }
        }
        tracing::warn!(step = self.step_count, "event budget exhausted, deferring the rest");
    }

    fn handle_request(&mut self, request: RadioRequest) {
        match request {
            RadioRequest::Unicast {
                from,
                dest,
                packet,
                max_rexmit,
            } => {
                let target = self.index_of(dest).filter(|&to| self.in_range(from, to));
                let budget = max_rexmit.saturating_add(1);
                let mut transmissions = 0u8;
                let mut acked = false;
                while transmissions < budget {
                    transmissions += 1;
                    self.unicast_transmissions += 1;
                    // Both the data frame and its ack have to survive
                    if target.is_some() && self.survives() && self.survives() {
                        acked = true;
                        break;
                    }
                }

                if let (true, Some(to)) = (acked, target) {
                    self.events.push_back((
                        to,
                        CollectEvent::PacketReceived {
                            from: Self::addr_of(from),
                            packet,
                        },
                    ));
                    self.events.push_back((
                        from,
                        CollectEvent::PacketSent {
                            to: dest,
                            outcome: TxOutcome::Acked,
                            transmissions,
                        },
                    ));
                } else {
                    self.unicast_timeouts += 1;
                    self.events.push_back((
                        from,
                        CollectEvent::PacketSent {
                            to: dest,
                            outcome: TxOutcome::Timeout,
                            transmissions,
                        },
                    ));
                }
            }
            RadioRequest::Announce { from, value } => self.broadcast(from, value),
            RadioRequest::Listen { from, bursts } => {
                for _ in 0..bursts {
                    for idx in 0..self.nodes.len() {
                        if !self.in_range(from, idx) {
                            continue;
                        }
                        if let Some(value) = self.nodes[idx].announcer().value() {
                            self.beacons += 1;
                            if self.survives() {
                                self.events.push_back((
                                    from,
                                    CollectEvent::AnnouncementReceived {
                                        from: Self::addr_of(idx),
                                        value,
                                    },
                                ));
                            }
                        }
                    }
                }
            }
        }
    }

    fn broadcast(&mut self, from: usize, value: u16) {
        self.beacons += 1;
        for idx in 0..self.nodes.len() {
            if self.in_range(from, idx) && self.survives() {
                self.events.push_back((
                    idx,
                    CollectEvent::AnnouncementReceived {
                        from: Self::addr_of(from),
                        value,
                    },
                ));
            }
        }
    }

    /// Run simulation for a number of steps
    pub fn run(&mut self, steps: u64) {
        for _ in 0..steps {
            self.step();
        }
    }

    /// Run simulation until a condition is met or max steps reached
    pub fn run_until<F>(&mut self, max_steps: u64, condition: F) -> bool
    where
        F: Fn(&Self) -> bool,
    {
        for _ in 0..max_steps {
            self.step();
            if condition(self) {
                return true;
            }
        }
        false
    }

    /// Whether every non-sink node has a route
    pub fn is_converged(&self) -> bool {
        self.nodes
            .iter()
            .all(|n| n.is_sink() || n.state() == RouteState::Connected)
    }

    /// Parent index of each node (None for the sink and disconnected nodes)
    pub fn tree(&self) -> Vec<Option<usize>> {
        self.nodes
            .iter()
            .map(|n| n.parent().and_then(|p| self.index_of(p)))
            .collect()
    }

    /// Readings the sink has received
    pub fn deliveries(&self) -> &[Delivery] {
        self.nodes[0].callbacks().received()
    }

    /// Node by index
    pub fn node(&self, idx: usize) -> Option<&SimConn> {
        self.nodes.get(idx)
    }

    /// Mutable node by index, e.g. to close it and watch the tree repair
    pub fn node_mut(&mut self, idx: usize) -> Option<&mut SimConn> {
        self.nodes.get_mut(idx)
    }

    /// Get node count
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get simulation step count
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Simulation configuration
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Collect current statistics
    pub fn stats(&self) -> SimStats {
        let deliveries = self.deliveries();
        let avg_hops = if deliveries.is_empty() {
            0.0
        } else {
            deliveries.iter().map(|d| d.hops as f64).sum::<f64>() / deliveries.len() as f64
        };

        SimStats {
            messages_sent: self.messages_sent,
            messages_delivered: deliveries.len() as u64,
            messages_no_route: self.messages_no_route,
            unicast_transmissions: self.unicast_transmissions,
            unicast_timeouts: self.unicast_timeouts,
            beacons: self.beacons,
            avg_hops,
            per_node: self
                .nodes
                .iter()
                .map(|n| NodeStats {
                    addr: n.addr(),
                    state: n.state(),
                    depth: n.depth(),
                    parent: n.parent(),
                    neighbors: n.neighbors().len(),
                    collect: n.stats().clone(),
                })
                .collect(),
        }
    }
}
