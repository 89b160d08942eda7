//! Collection Tree Command-Line Interface
//!
//! This CLI provides tools for:
//! - Simulating a collection tree over a lossy in-memory radio
//! - Replaying transmission outcomes through an ETX link estimate
//! - Printing the default collection configuration

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rimetree_core::link_estimate::LinkEstimate;
use rimetree_core::simulation::{CollectSimulator, SimConfig, SimStats, Topology};
use rimetree_core::{CollectConfig, RouteState, RTMETRIC_MAX};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "rimetree")]
#[command(author, version, about = "Collection tree explorer CLI", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum TopologyArg {
    Line,
    Grid,
}

#[derive(Args)]
struct SimulateArgs {
    /// Number of nodes
    #[arg(short, long, default_value = "8")]
    nodes: usize,

    /// Node placement
    #[arg(short, long, value_enum, default_value = "line")]
    topology: TopologyArg,

    /// Nodes per row for the grid topology
    #[arg(long, default_value = "4")]
    width: usize,

    /// Radio range in grid units
    #[arg(long, default_value = "1.0")]
    range: f64,

    /// Simulation steps to run
    #[arg(short, long, default_value = "200")]
    rounds: u64,

    /// Per-transmission loss probability (0.0 - 1.0)
    #[arg(short, long, default_value = "0.1")]
    loss: f64,

    /// Random seed
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Steps between readings from each node (0 disables traffic)
    #[arg(long, default_value = "20")]
    interval: u64,

    /// Collection config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the results as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a collection tree; node 0 is the sink
    Simulate(SimulateArgs),

    /// Replay transmission outcomes through a link estimate
    Etx {
        /// Comma-separated outcomes: `N` acked after N transmissions,
        /// `xN` failed after N transmissions (e.g. "1,1,x3,2")
        #[arg(short, long)]
        outcomes: String,
    },

    /// Print the default collection config as JSON
    Config,
}

fn cmd_simulate(args: SimulateArgs) -> Result<()> {
    let SimulateArgs {
        nodes,
        topology,
        width,
        range,
        rounds,
        loss,
        seed,
        interval,
        config,
        json,
    } = args;

    let collect = match config {
        Some(path) => CollectConfig::load(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CollectConfig::default(),
    };
    let topology = match topology {
        TopologyArg::Line => Topology::Line,
        TopologyArg::Grid => Topology::Grid { width },
    };

    let sim_config = SimConfig::default()
        .with_node_count(nodes)
        .with_topology(topology)
        .with_radio_range(range)
        .with_link_loss(loss)
        .with_seed(seed)
        .with_message_interval(interval)
        .with_collect_config(collect);

    let mut sim = CollectSimulator::new(sim_config).context("invalid simulation parameters")?;
    info!(nodes, rounds, loss, seed, "running simulation");
    sim.run(rounds);

    let stats = sim.stats();
    if json {
        print_json(&sim, &stats)?;
    } else {
        print_summary(&sim, &stats);
    }
    Ok(())
}

fn print_summary(sim: &CollectSimulator, stats: &SimStats) {
    let config = sim.config();

    println!("=== Collection Tree Simulation ===");
    println!();
    println!("Nodes:     {}", sim.node_count());
    println!("Topology:  {:?}", config.topology);
    println!("Range:     {:.2}", config.radio_range);
    println!("Loss:      {:.1}%", config.link_loss * 100.0);
    println!("Steps:     {}", sim.step_count());
    println!("Seed:      {}", config.seed);
    println!();

    println!("=== Simulation Results ===");
    println!();
    println!("Converged:          {}", if sim.is_converged() { "yes" } else { "no" });
    println!("Readings sent:      {}", stats.messages_sent);
    println!("Readings delivered: {}", stats.messages_delivered);
    println!("Dropped (no route): {}", stats.messages_no_route);
    println!("Delivery rate:      {:.1}%", stats.delivery_rate() * 100.0);
    println!("Average hops:       {:.2}", stats.avg_hops);
    println!("Unicast tx:         {}", stats.unicast_transmissions);
    println!("Unicast timeouts:   {}", stats.unicast_timeouts);
    println!("Beacons:            {}", stats.beacons);
    println!();

    println!("Per-Node Statistics:");
    println!(
        "{:<8} {:<14} {:<8} {:<8} {:<6} {:<6} {:<6} {:<6}",
        "Node", "State", "Metric", "Parent", "Nbrs", "Fwd", "Dup", "Busy"
    );
    println!("{}", "-".repeat(68));
    for node in &stats.per_node {
        let metric = if node.depth == RTMETRIC_MAX {
            "-".to_string()
        } else {
            node.depth.to_string()
        };
        let parent = node
            .parent
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let state = match node.state {
            RouteState::Sink => "sink",
            RouteState::Connected => "connected",
            RouteState::Disconnected => "disconnected",
        };
        println!(
            "{:<8} {:<14} {:<8} {:<8} {:<6} {:<6} {:<6} {:<6}",
            node.addr.to_string(),
            state,
            metric,
            parent,
            node.neighbors,
            node.collect.forwarded,
            node.collect.duplicates_dropped,
            node.collect.busy_drops
        );
    }
}

fn print_json(sim: &CollectSimulator, stats: &SimStats) -> Result<()> {
    let nodes: Vec<_> = stats
        .per_node
        .iter()
        .map(|n| {
            serde_json::json!({
                "addr": n.addr.to_string(),
                "state": format!("{:?}", n.state),
                "rtmetric": n.depth,
                "parent": n.parent.map(|p| p.to_string()),
                "neighbors": n.neighbors,
                "originated": n.collect.originated,
                "forwarded": n.collect.forwarded,
                "duplicates_dropped": n.collect.duplicates_dropped,
                "busy_drops": n.collect.busy_drops,
                "no_route_drops": n.collect.no_route_drops,
            })
        })
        .collect();

    let report = serde_json::json!({
        "steps": sim.step_count(),
        "converged": sim.is_converged(),
        "messages_sent": stats.messages_sent,
        "messages_delivered": stats.messages_delivered,
        "delivery_rate": stats.delivery_rate(),
        "avg_hops": stats.avg_hops,
        "unicast_transmissions": stats.unicast_transmissions,
        "unicast_timeouts": stats.unicast_timeouts,
        "beacons": stats.beacons,
        "nodes": nodes,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn parse_outcome(token: &str) -> Result<(bool, u8)> {
    let token = token.trim();
    let (acked, digits) = match token.strip_prefix('x') {
        Some(rest) => (false, rest),
        None => (true, token),
    };
    let attempts: u8 = digits
        .parse()
        .with_context(|| format!("invalid outcome '{}'", token))?;
    if attempts == 0 {
        bail!("outcome '{}' needs at least one transmission", token);
    }
    Ok((acked, attempts))
}

fn cmd_etx(outcomes: String) -> Result<()> {
    let outcomes = outcomes
        .split(',')
        .filter(|t| !t.trim().is_empty())
        .map(parse_outcome)
        .collect::<Result<Vec<_>>>()?;

    let mut estimate = LinkEstimate::new();

    println!("=== ETX Replay ===");
    println!();
    println!("{:<6} {:<10} {:<8} {:<8}", "Step", "Outcome", "ETX", "Tx");
    println!("{}", "-".repeat(34));
    println!("{:<6} {:<10} {:<8} {:<8.2}", 0, "initial", estimate.etx(), estimate.etx_f32());

    for (i, (acked, attempts)) in outcomes.iter().enumerate() {
        let label = if *acked {
            estimate.record_success(*attempts);
            format!("ok x{}", attempts)
        } else {
            estimate.record_failure(*attempts);
            format!("fail x{}", attempts)
        };
        println!(
            "{:<6} {:<10} {:<8} {:<8.2}",
            i + 1,
            label,
            estimate.etx(),
            estimate.etx_f32()
        );
    }

    Ok(())
}

fn cmd_config() -> Result<()> {
    println!("{}", CollectConfig::default().to_json()?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Simulate(args) => cmd_simulate(args),
        Commands::Etx { outcomes } => cmd_etx(outcomes),
        Commands::Config => cmd_config(),
    }
}
