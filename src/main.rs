//! Regwatch main entry point
//!
//! This is the command-line interface for the regulatory-content harvester.

use anyhow::{Context, Result};
use clap::Parser;
use regwatch::config::{load_registry_with_hash, Registry, Tunables};
use regwatch::crawler::{listing_plan, Coordinator};
use regwatch::output::{print_recent_articles, print_run_summary};
use regwatch::storage::open_storage;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Regwatch: a recent-regulatory-content harvester
///
/// Regwatch visits the listing pages named in a source registry, extracts
/// recent English articles (following linked PDFs for short pages) and
/// records them in a SQLite database.
#[derive(Parser, Debug)]
#[command(name = "regwatch")]
#[command(version)]
#[command(about = "A recent-regulatory-content harvester", long_about = None)]
struct Cli {
    /// Path to the TOML source registry
    #[arg(value_name = "SOURCES", required_unless_present = "recent")]
    sources: Option<PathBuf>,

    /// Path to the SQLite database
    #[arg(long, default_value = "regwatch.db")]
    database: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate the registry and tunables and show the plan without fetching
    #[arg(long, conflicts_with = "recent")]
    dry_run: bool,

    /// List articles published in the last DAYS days and exit
    #[arg(long, value_name = "DAYS")]
    recent: Option<i64>,

    /// Maximum number of articles listed by --recent
    #[arg(long, default_value_t = 500)]
    limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    if let Some(days) = cli.recent {
        return handle_recent(&cli, days);
    }

    let sources = cli
        .sources
        .as_deref()
        .context("a source registry path is required")?;

    tracing::info!("Loading source registry from: {}", sources.display());
    let (registry, registry_hash) = load_registry_with_hash(sources)
        .with_context(|| format!("failed to load registry {}", sources.display()))?;
    tracing::info!(
        "Registry loaded: {} sources (hash: {})",
        registry.sources.len(),
        registry_hash
    );

    let tunables = Tunables::from_env().context("invalid tunable in environment")?;

    if cli.dry_run {
        handle_dry_run(&registry, &tunables);
        return Ok(());
    }

    handle_run(&cli, &registry, &registry_hash, &tunables).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("regwatch=info,warn"),
            1 => EnvFilter::new("regwatch=debug,info"),
            2 => EnvFilter::new("regwatch=trace,debug"),
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

/// Handles the --dry-run mode: shows the merged sources and tunables
fn handle_dry_run(registry: &Registry, tunables: &Tunables) {
    println!("=== Regwatch Dry Run ===\n");

    println!("Tunables:");
    println!("  Fetch concurrency: {}", tunables.fetch_concurrency);
    println!("  Per-host concurrency: {}", tunables.per_host_concurrency);
    println!("  Minimum text length: {}", tunables.min_text_length);
    println!("  Max age: {} days", tunables.max_age_days);
    println!(
        "  HTTP: timeout {:?}, {} retries, backoff base {}s",
        tunables.http_timeout, tunables.http_retries, tunables.http_backoff_base
    );
    println!("  Evergreen hosts: {}", tunables.evergreen_domains.join(", "));

    println!("\nSources ({}):", registry.sources.len());
    for source in &registry.sources {
        println!("  - {}", source.name);
        for attempt in listing_plan(source).iter().filter(|a| !a.escalation) {
            println!("    * {}", attempt.url);
        }
        println!(
            "    max_links={} same_host_only={} last_week_only={} pdf_chase={}",
            source.max_links, source.same_host_only, source.last_week_only, source.pdf_chase
        );
        if !source.allow_substr.is_empty() {
            println!("    allow: {}", source.allow_substr.join(", "));
        }
        if !source.deny_substr.is_empty() {
            println!("    deny: {}", source.deny_substr.join(", "));
        }
    }

    println!("\n✓ Registry is valid");
}

/// Handles the --recent mode: lists stored articles
fn handle_recent(cli: &Cli, days: i64) -> Result<()> {
    let storage = open_storage(&cli.database)
        .with_context(|| format!("failed to open database {}", cli.database.display()))?;
    print_recent_articles(&storage, days, cli.limit)?;
    Ok(())
}

/// Handles the main harvesting run
async fn handle_run(
    cli: &Cli,
    registry: &Registry,
    registry_hash: &str,
    tunables: &Tunables,
) -> Result<()> {
    let storage = open_storage(&cli.database)
        .with_context(|| format!("failed to open database {}", cli.database.display()))?;

    let coordinator = Coordinator::new(tunables, Arc::new(storage))?;
    let stats = coordinator.run(registry, registry_hash).await?;

    if !cli.quiet {
        print_run_summary(&stats);
    }
    Ok(())
}
