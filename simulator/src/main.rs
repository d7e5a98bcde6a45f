//! StableSettle Simulator
//!
//! Drives the conversion settlement engine through seeded scenarios:
//! happy-path settlement, concurrent overdraw, conflict retry, retry
//! exhaustion, and mixed load.

use clap::Parser;
use rust_decimal::Decimal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod accounts;
mod controller;
mod metrics;
mod scenario;

use controller::SimulationController;
use scenario::Scenario;
use stablesettle_engine::EngineConfig;

/// StableSettle Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "simulator")]
#[command(about = "StableSettle conversion scenario simulator")]
struct Args {
    /// Number of simulated users to onboard
    #[arg(short, long, default_value = "3")]
    users: usize,

    /// Scenario to run (omit for random conversions)
    #[arg(short, long)]
    scenario: Option<String>,

    /// List built-in scenarios and exit
    #[arg(long)]
    list: bool,

    /// Conversions to generate in random mode
    #[arg(short, long, default_value = "25")]
    conversions: u64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Active USD/NGN rate
    #[arg(long, default_value = "1500")]
    rate: Decimal,

    /// Platform fee percentage
    #[arg(long, default_value = "1")]
    fee_percent: Decimal,

    /// Print engine metrics in Prometheus format at exit
    #[arg(long)]
    prometheus: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    if args.list {
        for name in Scenario::builtin_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let config = EngineConfig::from_env();
    config.validate().map_err(|e| anyhow::anyhow!(e))?;

    info!("Starting StableSettle Simulator");
    info!("Users: {}", args.users);

    let mut controller = SimulationController::new(args.users, config);
    controller.initialize(args.rate, args.fee_percent)?;

    if let Some(scenario_name) = &args.scenario {
        let scenario = Scenario::load(scenario_name)?;
        controller.run_scenario(scenario).await?;
    } else {
        info!("Running {} random conversions", args.conversions);
        controller.run_random(args.conversions, args.seed).await?;
    }

    let metrics = controller.metrics();
    info!("Simulation complete");
    info!("Total conversions: {}", metrics.total_conversions);
    info!("Completed: {}", metrics.completed_conversions);
    info!("Failed: {}", metrics.failed_conversions);
    info!("Assertions passed: {}", metrics.assertions_passed);
    info!("Average latency: {}ms", metrics.average_latency_ms());

    if args.prometheus {
        println!("{}", controller.engine_metrics());
    }

    Ok(())
}
