//! # swarmgate CLI entry point
//!
//! Keeps a proxy's backend routing table synchronized with Docker-managed
//! game servers. The binary is an operational tool: `watch` runs the
//! reconciliation engine against an in-memory routing table and logs every
//! registration change, `discover` performs a single discovery pass and
//! prints the result as plain text.
//!
//! ## Usage
//!
//! ```bash
//! # Watch the daemon and log registration changes every 10 seconds
//! swarmgate watch
//!
//! # Faster cycles
//! swarmgate watch --interval 2
//!
//! # One-shot discovery, unix-friendly output
//! swarmgate discover
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use argh::FromArgs;

use swarmgate_core::{MemoryRoutingTable, Reconciler, ReconcilerConfig};
use swarmgate_docker::DockerOrchestrator;

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// swarmgate - backend auto-registration for container-managed game servers
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Watch(WatchArgs),
    Discover(DiscoverArgs),
}

/// Arguments for the continuous reconciliation mode.
#[derive(FromArgs)]
#[argh(subcommand, name = "watch")]
/// run reconciliation cycles continuously
struct WatchArgs {
    /// seconds between reconciliation cycles
    ///
    /// Defaults to 10 seconds, matching the deployment contract.
    #[argh(option, short = 'i', long = "interval", default = "10")]
    interval_secs: u64,
}

/// Arguments for the one-shot discovery mode.
///
/// Prints one line per discovered backend (`id address:port`) to stdout.
/// Errors go to stderr with a non-zero exit code.
#[derive(FromArgs)]
#[argh(subcommand, name = "discover")]
/// run a single discovery pass and print the result
struct DiscoverArgs {}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // Keep stdout clean for the one-shot mode (piping to sort, awk, etc.).
    if matches!(cli.command, Commands::Watch(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Watch(args) => run_watch(args).await,
        Commands::Discover(args) => run_discover(args).await,
    }
}

async fn run_watch(args: WatchArgs) -> Result<()> {
    let orchestrator = Arc::new(DockerOrchestrator::connect()?);

    let config = ReconcilerConfig {
        interval: Duration::from_secs(args.interval_secs),
        ..Default::default()
    };
    let reconciler = Arc::new(Reconciler::new(
        orchestrator,
        Arc::new(MemoryRoutingTable::new()),
        config,
    ));

    tracing::info!(
        "Watching Docker for game servers, reconciling every {}s",
        args.interval_secs
    );
    reconciler.start().await?;
    Ok(())
}

async fn run_discover(_args: DiscoverArgs) -> Result<()> {
    let orchestrator = Arc::new(DockerOrchestrator::connect()?);

    let reconciler = Arc::new(Reconciler::new(
        orchestrator,
        Arc::new(MemoryRoutingTable::new()),
        ReconcilerConfig::default(),
    ));
    let summary = reconciler.run_cycle().await?;

    for id in reconciler.registered().await {
        if let Some(record) = reconciler.lookup(&id).await {
            println!("{} {}:{}", record.id, record.address, record.port);
        }
    }
    eprintln!(
        "{} backend(s) discovered via {:?} mode",
        summary.discovered, summary.mode
    );
    Ok(())
}
