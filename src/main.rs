//! Land-Ledger main entry point
//!
//! This is the command-line interface for the Land-Ledger harvester.

use anyhow::Context;
use clap::Parser;
use land_ledger::config::{load_config_with_hash, Config, PortalConfig, PortalKind};
use land_ledger::crawler::{crawl, Coordinator, HarvestOptions};
use land_ledger::Level;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Land-Ledger: a polite land-record hierarchy harvester
///
/// Land-Ledger walks the district, mandal, village, survey and khata hierarchy
/// of government land-record portals and writes one CSV file per level.
#[derive(Parser, Debug)]
#[command(name = "land-ledger")]
#[command(version = "1.0.0")]
#[command(about = "A polite land-record hierarchy harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Harvest only this portal (repeatable)
    #[arg(long = "portal", value_name = "NAME")]
    portals: Vec<String>,

    /// Harvest only this region code (repeatable; overrides the portal's `regions`)
    #[arg(long = "region", value_name = "CODE")]
    regions: Vec<String>,

    /// Write CSV files under this directory instead of `output.directory`
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Validate config and show what would be harvested without any network access
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let options = HarvestOptions {
        portals: cli.portals,
        regions: cli.regions,
        output: cli.output,
    };

    if cli.dry_run {
        handle_dry_run(config, options)?;
    } else {
        handle_harvest(config, options).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("land_ledger=info,warn"),
            1 => EnvFilter::new("land_ledger=debug,info"),
            2 => EnvFilter::new("land_ledger=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates selections and shows what would be harvested
fn handle_dry_run(config: Config, options: HarvestOptions) -> anyhow::Result<()> {
    println!("=== Land-Ledger Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Retry budget: {}", config.crawler.retry_budget);
    println!("  Backoff unit: {}ms", config.crawler.backoff_unit_ms);
    println!(
        "  Timeouts: {}s request, {}s connect",
        config.crawler.request_timeout_secs, config.crawler.connect_timeout_secs
    );
    println!("  User agent: {}", config.crawler.user_agent);

    let coordinator = Coordinator::new(config, options)?;
    let portals = coordinator.selected_portals();

    println!("\nPortals ({}):", portals.len());
    for portal in &portals {
        print_portal_plan(&coordinator, portal);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would harvest {} portal(s)", portals.len());

    Ok(())
}

fn print_portal_plan(coordinator: &Coordinator, portal: &PortalConfig) {
    let deepest = match (&portal.kind, &portal.stateless) {
        (PortalKind::Stateless, Some(stateless)) => stateless.deepest_level(),
        _ => Level::Locality,
    };
    let kind = match portal.kind {
        PortalKind::Stateful => "stateful",
        PortalKind::Stateless => "stateless",
    };

    println!("  - {} ({}, down to {})", portal.name, kind, deepest);
    println!("    URL: {}", portal.base_url);

    let regions = coordinator.region_filter(portal);
    if regions.is_empty() {
        println!("    Regions: all");
    } else {
        println!("    Regions: {}", regions.join(", "));
    }

    if !portal.cookies.is_empty() {
        let names: Vec<&str> = portal.cookies.keys().map(String::as_str).collect();
        println!("    Cookies: {}", names.join(", "));
    }

    let directory = coordinator.output_directory(portal);
    for level in Level::ALL.iter().filter(|level| **level <= deepest) {
        println!("    * {}", directory.join(level.file_name()).display());
    }
}

/// Handles the main harvest operation
async fn handle_harvest(config: Config, options: HarvestOptions) -> anyhow::Result<()> {
    tracing::info!("Portals configured: {}", config.portals.len());

    match crawl(config, options).await {
        Ok(results) => {
            let rows: u64 = results.iter().map(|(_, stats)| stats.total_rows()).sum();
            tracing::info!("Harvest finished: {} portal(s), {} rows", results.len(), rows);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Harvest failed: {}", e);
            Err(e.into())
        }
    }
}
