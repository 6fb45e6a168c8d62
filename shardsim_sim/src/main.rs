//! ShardSim CLI
//!
//! Run a sharded blockchain network simulation and report chain statistics.

use clap::Parser;
use shardsim_core::SimConfig;
use shardsim_sim::{ScenarioId, SimError, SimExport, SimRunner};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// ShardSim network simulator
#[derive(Parser, Debug)]
#[command(name = "shardsim")]
#[command(about = "Simulate a sharded blockchain network", long_about = None)]
struct Args {
    /// JSON file with simulation parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Scenario preset (baseline, mining_only, beacon, congested)
    #[arg(short = 'S', long, default_value = "baseline")]
    scenario: String,

    /// Master seed, overrides the config file
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of execution groups
    #[arg(short, long, default_value = "1")]
    groups: u32,

    /// Nodes per group, overrides the config file
    #[arg(short, long)]
    nodes: Option<u32>,

    /// Ticks to simulate, overrides the config file
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Export the run to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// JSON output on stdout
    #[arg(long)]
    json: bool,

    /// Verbose output (RUST_LOG, when set, takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

/// Log filter from `RUST_LOG` directives, falling back to a level picked by
/// `--verbose`.
fn log_filter(verbose: bool, directives: Option<&str>) -> EnvFilter {
    let default = if verbose { "debug" } else { "info" };
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

fn load_config(args: &Args) -> Result<SimConfig, SimError> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(nodes) = args.nodes {
        config.nodes_per_group = nodes;
    }
    if let Some(ticks) = args.ticks {
        config.sim_ticks = ticks;
    }
    Ok(config)
}

async fn run(args: Args) -> Result<(), SimError> {
    let scenario: ScenarioId = args.scenario.parse()?;
    let config = scenario.apply(load_config(&args)?);

    if !args.json {
        info!("ShardSim v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("Scenario: {} ({})", scenario.name(), scenario.description());
    }

    let outcome = SimRunner::new(config.clone(), args.groups).run().await?;
    let stats = &outcome.stats;

    let mut export = SimExport::new(scenario.name(), &config, args.groups);
    export.finalize(
        outcome.summaries.clone(),
        stats.clone(),
        outcome.elapsed.as_millis() as u64,
    );

    if let Some(path) = &args.export {
        export.write_to_file(path)?;
        info!("Exported {} nodes to {}", export.nodes.len(), path);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&export.stats)?);
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("Nodes:            {} ({} miners, {} validators)", stats.nodes, stats.miners, stats.validators);
        info!("Blocks mined:     {}", stats.blocks_mined);
        info!("Main heads:       {}..={} (spread {})", stats.min_head, stats.max_head, stats.head_spread);
        match stats.mean_block_interval {
            Some(interval) => info!("Block interval:   {:.2} ticks", interval),
            None => info!("Block interval:   n/a"),
        }
        info!("Uncle rate:       {:.3}", stats.uncle_rate);
        info!("Beacon proposals: {}", stats.beacon_proposed);
        info!("Messages:         {} sent, {} received, {} lost", stats.messages_sent, stats.messages_received, stats.lost_sends);
        info!("Faults logged:    {}", stats.faults);
        info!("Wall time:        {:?}", outcome.elapsed);
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let directives = std::env::var("RUST_LOG").ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(args.verbose, directives.as_deref()))
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if let Err(e) = run(args).await {
        error!("{}", e);
        if let SimError::UnknownScenario(_) = e {
            eprintln!("Available scenarios: baseline, mining_only, beacon, congested");
        }
        std::process::exit(1);
    }
}
