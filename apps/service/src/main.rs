use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing::level_filters::LevelFilter;

use blockwatch_service::config::Config;
use blockwatch_service::database::{Database, DatabaseImpl, initialize_database};
use blockwatch_service::orchestrator::{PollOrchestrator, PollScheduler};
use blockwatch_service::pool::open_pool;
use blockwatch_service::registry::NetworkRegistry;

/// Number of incidents and block snapshots shown for a single network
const DETAIL_LIMIT: usize = 20;

#[derive(Parser)]
#[command(name = "blockwatch", version, about = "Cross-validated block production liveness monitoring")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll every network on an interval until interrupted
    Run {
        /// Seconds between cycles, overrides the configured interval
        #[arg(long, value_parser = clap::value_parser!(u64).range(10..=86400))]
        interval: Option<u64>,
    },
    /// Run a single polling cycle and print the report as JSON
    Poll {
        /// Only poll these networks (repeatable)
        #[arg(long = "network")]
        networks: Vec<String>,
    },
    /// Print the published status of every network, or details for one
    Status { network: Option<String> },
    /// Delete every recorded halt event
    ResetHaltEvents,
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    if cli.verbose {
        logger::init_tracing_with_level(LevelFilter::DEBUG);
    } else {
        logger::init_tracing();
    }

    let config = Config::from_config(cli.config.as_ref())?;

    match cli.command {
        Command::Run { interval } => run(&config, interval).await?,
        Command::Poll { networks } => return poll(&config, &networks).await,
        Command::Status { network } => status(&config, network.as_deref()).await?,
        Command::ResetHaltEvents => {
            let database = open_database(&config).await?;
            let deleted = database.delete_all_halt_events().await?;
            info!("Deleted {} halt events", deleted);
            println!("Deleted {} halt events", deleted);
        }
        Command::Config => println!("{}", config),
    }

    Ok(ExitCode::SUCCESS)
}

async fn open_database(config: &Config) -> Result<Arc<DatabaseImpl>> {
    let pool = open_pool(&config.database).await?;

    let conn = pool.get().await.context("Failed to get database connection")?;
    info!("Initializing database schema...");
    initialize_database(&conn).await?;
    drop(conn);

    Ok(Arc::new(DatabaseImpl::new_from_pool(pool)))
}

async fn build_orchestrator(config: &Config) -> Result<PollOrchestrator> {
    let database = open_database(config).await?;
    let registry = NetworkRegistry::from_config(config)?;

    let orchestrator = PollOrchestrator::new(Arc::new(registry), database);
    orchestrator.initialize().await?;
    Ok(orchestrator)
}

async fn run(config: &Config, interval: Option<u64>) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(config).await?);
    let interval = Duration::from_secs(interval.unwrap_or(config.polling.interval_seconds));

    let scheduler = PollScheduler::new(orchestrator, interval).start();

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    scheduler.abort();
    Ok(())
}

async fn poll(config: &Config, networks: &[String]) -> Result<ExitCode> {
    let orchestrator = build_orchestrator(config).await?;

    let report = if networks.is_empty() {
        orchestrator.run_polling_cycle().await
    } else {
        orchestrator.run_polling_cycle_for(networks).await
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.success { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn status(config: &Config, network: Option<&str>) -> Result<()> {
    let database = open_database(config).await?;

    let output = match network {
        None => serde_json::to_value(database.get_network_statuses().await?)?,
        Some(network_id) => {
            let status = database
                .get_network_status(network_id)
                .await?
                .with_context(|| format!("Unknown network: {}", network_id))?;
            let seconds_since_last_block = status.seconds_since_last_block(chrono::Utc::now().timestamp());
            json!({
                "status": status,
                "seconds_since_last_block": seconds_since_last_block,
                "halt_events": database.get_recent_halt_events(network_id, DETAIL_LIMIT).await?,
                "block_snapshots": database.get_recent_block_snapshots(network_id, DETAIL_LIMIT).await?,
            })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
