//! Edgeward Simulation Engine CLI
//!
//! Runs one seeded offloading simulation and prints a summary table

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edgeward_simulation_engine::{
    config::SimulationConfig,
    simulator::{SimulationResult, Simulator},
};

#[derive(Parser, Debug)]
#[command(name = "edgeward-sim")]
#[command(about = "Simulate fuzzy task offloading across edge nodes and cloud", long_about = None)]
struct Args {
    /// JSON config file (defaults are used for anything it omits)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// RNG seed
    #[arg(short, long)]
    seed: Option<u64>,

    /// Simulation horizon in ticks
    #[arg(short, long)]
    ticks: Option<u64>,

    /// Number of devices
    #[arg(short, long)]
    devices: Option<usize>,

    /// Number of edge nodes
    #[arg(short, long)]
    edge_nodes: Option<usize>,

    /// Output JSON file path (optional)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => SimulationConfig::default(),
        };

        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(ticks) = self.ticks {
            config.horizon_ticks = ticks;
        }
        if let Some(devices) = self.devices {
            config.devices.count = devices;
        }
        if let Some(edge_nodes) = self.edge_nodes {
            config.edge.count = edge_nodes;
        }

        config.validate()?;
        Ok(config)
    }
}

fn print_results(result: &SimulationResult) {
    let stats = &result.statistics;

    println!("\n╔══════════════════════════════════════════════════════════╗");
    println!("║  Simulation Results                                      ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!("{:<14} {:>10} {:>12} {:>18}", "Location", "Decisions", "Completed", "Avg Service (ms)");
    println!("{}", "-".repeat(57));
    let rows = [
        ("LOCAL_EDGE", stats.decisions_local_edge, stats.completed_local_edge, stats.local_edge_service_time_ms),
        ("OTHER_EDGE", stats.decisions_other_edge, stats.completed_other_edge, stats.other_edge_service_time_ms),
        ("CLOUD", stats.decisions_cloud, stats.completed_cloud, stats.cloud_service_time_ms),
    ];
    for (label, decisions, completed, service) in rows {
        println!("{:<14} {:>10} {:>12} {:>18.2}", label, decisions, completed, service);
    }

    println!("\nUtilization:");
    println!("  Avg edge: {:.1}%", stats.avg_edge_utilization_pct);
    println!("  Cloud:    {:.1}%", stats.cloud_utilization_pct);

    println!("\nTasks:");
    println!("  Generated: {}", result.tasks_generated);
    println!("  Completed: {}", stats.completed_tasks());
    println!("  Dropped:   {}", result.tasks_dropped);
    println!("  Failed:    {}", stats.failed_tasks);
    println!("  Recovered: {}", stats.recovered_tasks);

    println!("\nEvents:");
    println!("  Migrations:         {} ok / {} refused", stats.successful_migrations, stats.failed_migrations);
    println!("  Handovers:          {}", stats.handovers);
    println!("  Node failures:      {}", result.node_failures);
    println!("  Tampered tasks:     {}", result.tasks_tampered);
    println!("  Security incidents: {}", stats.security_incidents);
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "edgeward=info,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = args.load_config()?;

    println!("╔══════════════════════════════════════════════════════════╗");
    println!("║  Edgeward Simulation Engine                              ║");
    println!("╚══════════════════════════════════════════════════════════╝\n");

    println!("Configuration:");
    println!("  Seed: {}", config.seed);
    println!("  Ticks: {} ({} ms each)", config.horizon_ticks, config.tick_duration_ms);
    println!("  Edge nodes: {}", config.edge.count);
    println!("  Devices: {}", config.devices.count);
    println!("  Task probability: {:.1}%/tick", config.devices.task_probability * 100.0);
    println!("  Checkpointing: {}\n", if config.faults.checkpointing { "on" } else { "off" });

    print!("Running simulation... ");
    let result = Simulator::new(config)?.run();
    println!("Done");

    print_results(&result);

    if let Some(output_path) = args.output {
        println!("\nWriting results to {}...", output_path.display());
        let json = serde_json::to_string_pretty(&result)?;
        fs::write(&output_path, json)
            .with_context(|| format!("writing {}", output_path.display()))?;
        println!("  Results saved");
    }

    println!("\n✅ Simulation complete!\n");
    Ok(())
}
