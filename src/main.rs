// Review Gateway - Main Entry Point
//
// CLI for the admission gateway:
// - serve: run the HTTP gateway (and the metrics listener when enabled)
// - check-config: print the effective configuration
// - estimate: print the token estimate for a file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use review_gateway::admission::{Backends, JobAdmissionController};
use review_gateway::auth::StaticTokenVerifier;
use review_gateway::config::GatewayConfig;
use review_gateway::jobs::{InMemoryJobStore, InMemoryWorkQueue};
use review_gateway::quota::{estimate_cost, InMemoryAccountStore};
use review_gateway::rate_limit::InMemoryWindowStore;
use review_gateway::{logging, metrics, metrics_server, server};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Review Gateway: admission control for code-review jobs
#[derive(Parser, Debug)]
#[command(name = "review-gateway")]
#[command(version)]
#[command(about = "Rate limiting and token quota gateway for review jobs", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP gateway
    Serve,
    /// Print the effective configuration as TOML
    CheckConfig,
    /// Print the token estimate for a file
    Estimate {
        /// File to estimate
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GatewayConfig::load_from_path(path)?,
        None => GatewayConfig::load()?,
    };

    match args.command {
        Some(Commands::Serve) => {
            logging::init(&config.logging, args.verbose)?;
            serve(config).await?;
        }
        Some(Commands::CheckConfig) => {
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            println!("{}", rendered);
        }
        Some(Commands::Estimate { file }) => {
            let content = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            println!("{}", estimate_cost(&content));
        }
        None => {
            println!("No command specified. Use \"review-gateway --help\" for usage.");
        }
    }

    Ok(())
}

async fn serve(config: GatewayConfig) -> Result<()> {
    info!("Review gateway v{} starting...", env!("CARGO_PKG_VERSION"));

    if config.auth.static_tokens.is_empty() {
        warn!("No static tokens configured; only access credentials can authenticate");
    }

    if config.metrics.enabled {
        metrics::init().context("Failed to initialize metrics")?;
        let port = config.metrics.port;
        tokio::spawn(async move {
            if let Err(e) = metrics_server::start_metrics_server(port).await {
                error!("Metrics server stopped: {:#}", e);
            }
        });
    }

    let windows = InMemoryWindowStore::new();
    windows.spawn_purge_task(Duration::from_secs(config.rate_limit.window_secs));

    let backends = Backends {
        verifier: Arc::new(StaticTokenVerifier::new(config.auth.static_tokens.clone())),
        accounts: Arc::new(InMemoryAccountStore::new()),
        windows: Arc::new(windows),
        jobs: Arc::new(InMemoryJobStore::new()),
        queue: Arc::new(InMemoryWorkQueue::new()),
    };
    let controller = JobAdmissionController::from_config(&config, backends);

    server::serve(&config.server.bind_address, controller).await
}
