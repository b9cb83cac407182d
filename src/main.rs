//! Term-Sweep main entry point
//!
//! This is the command-line interface for the Term-Sweep campaign runner.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use term_sweep::campaign::{backup_database, Campaign, ImmediateTrigger, TermScheduler};
use term_sweep::config::{load_config_with_hash, Config};
use term_sweep::input::load_terms;
use term_sweep::provider::{CseClient, Credentials};
use term_sweep::storage::{SqliteStorage, Storage};
use tracing_subscriber::EnvFilter;

/// Term-Sweep: a patient keyword-search campaign runner
///
/// Term-Sweep spreads a large list of search terms over as many days as the
/// search API's daily quota requires, stores every raw response in SQLite and
/// extracts the result URLs once the campaign is over.
#[derive(Parser, Debug)]
#[command(name = "term-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A patient keyword-search campaign runner", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Delimited file whose first column holds the search terms (first row is a header)
    #[arg(long, value_name = "FILE")]
    terms: Option<PathBuf>,

    /// API key, overriding the configuration file
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Custom search engine id, overriding the configuration file
    #[arg(long, value_name = "ID")]
    cse_id: Option<String>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show the calendar without searching
    #[arg(long, conflicts_with_all = ["stats", "extract_only"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "extract_only"])]
    stats: bool,

    /// Extract URL records from an existing database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    extract_only: bool,

    /// Start every day's job immediately instead of waiting for the start hour
    #[arg(long)]
    no_wait: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config, cli.terms.as_deref())?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.extract_only {
        handle_extract_only(&config)?;
    } else {
        handle_campaign(config, config_hash, &cli).await?;
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
            0 => EnvFilter::new("term_sweep=info,warn"),
            1 => EnvFilter::new("term_sweep=debug,info"),
            2 => EnvFilter::new("term_sweep=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the calendar
fn handle_dry_run(config: &Config, terms: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Term-Sweep Dry Run ===\n");

    println!("Campaign Configuration:");
    println!("  Daily length: {}", config.campaign.daily_length);
    println!("  Results per term: {}", config.campaign.results_per_term);
    println!("  Start hour: {:02}:00", config.campaign.start_hour);
    println!(
        "  Recheck interval: {} minutes",
        config.campaign.recheck_interval_minutes
    );

    println!("\nProvider:");
    println!("  Endpoint: {}", config.provider.endpoint);
    println!(
        "  API key: {}",
        if config.provider.api_key.is_some() { "configured" } else { "not configured" }
    );
    println!(
        "  CSE id: {}",
        if config.provider.cse_id.is_some() { "configured" } else { "not configured" }
    );

    println!("\nPacing:");
    println!("  Batch size: {}", config.pacing.batch_size);
    println!("  Batch interval: {}ms", config.pacing.batch_interval_ms);
    println!("  Max attempts: {}", config.pacing.max_attempts);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(dir) = &config.output.backup_dir {
        println!("  Backup directory: {}", dir);
    }

    println!("\n✓ Configuration is valid");

    if let Some(path) = terms {
        let scheduler = TermScheduler::new(
            load_terms(path)?,
            config.campaign.daily_length,
            config.campaign.start_date,
        )?;

        println!(
            "✓ Would search {} terms over {} days",
            scheduler.len(),
            scheduler.days_required()
        );
        for day in scheduler.calendar() {
            println!("  {}: {} terms", day, scheduler.daily_task_for(*day)?.len());
        }
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use term_sweep::output::{load_statistics, print_statistics};

    println!("Database: {}\n", config.output.database_path);

    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    storage.create_response_table()?;
    storage.create_urls_table()?;

    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the --extract-only mode: derives URL records from stored responses
fn handle_extract_only(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut storage = SqliteStorage::new(Path::new(&config.output.database_path))?;
    storage.create_response_table()?;
    storage.create_urls_table()?;

    let inserted = storage.response_to_urls()?;
    storage.close()?;

    println!("✓ Extracted {} URL records", inserted);
    Ok(())
}

/// Handles the main campaign run
async fn handle_campaign(
    config: Config,
    config_hash: String,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    let terms_path = cli
        .terms
        .as_deref()
        .ok_or("--terms is required to run a campaign")?;
    let universe = load_terms(terms_path)?;

    let credentials = Credentials::new(
        cli.api_key.as_deref().or(config.provider.api_key.as_deref()),
        cli.cse_id.as_deref().or(config.provider.cse_id.as_deref()),
    )?;

    let db_path = PathBuf::from(&config.output.database_path);
    let backup_dir = config.output.backup_dir.clone();

    let storage = SqliteStorage::new(&db_path)?;
    let provider = Arc::new(CseClient::from_config(&config.provider)?);

    let mut campaign = Campaign::new(config, storage, provider, credentials)?
        .with_config_hash(config_hash);
    if cli.no_wait {
        tracing::info!("Daily start hour disabled, days run back to back");
        campaign = campaign.with_trigger(Box::new(ImmediateTrigger));
    }

    match campaign.run(universe).await {
        Ok(report) => {
            tracing::info!(
                "Campaign {} completed: {} succeeded, {} failed, {} URL records",
                report.campaign_id,
                report.succeeded(),
                report.failed(),
                report.url_records
            );
        }
        Err(e) => {
            tracing::error!("Campaign failed: {}", e);
            return Err(e.into());
        }
    }

    if let Some(dir) = backup_dir {
        backup_database(&db_path, Path::new(&dir))?;
    }

    Ok(())
}
