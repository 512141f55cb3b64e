//! no2scan - NO2 pollution anomaly extraction
//!
//! A CLI tool that queries Sentinel-5P NO2 imagery on Earth Engine around
//! a fixed set of industrial sites and writes half-year anomaly tables.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (credentials, config, remote failure, file write, etc.)

mod analysis;
mod campaign;
mod cli;
mod config;
mod geometry;
mod imagery;
mod models;
mod registry;
mod report;

use anyhow::{Context, Result};
use campaign::{campaign_plan, CampaignRunner};
use cli::Args;
use config::{Config, CONFIG_FILE};
use imagery::{EarthEngineClient, RegionAggregator};
use models::{AnomalyTable, CampaignError};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("no2scan v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run_campaign(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Campaign failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .no2scan.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml()?;
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set your Earth Engine project and output directory.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete extraction. Returns the exit code.
async fn run_campaign(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    if args.dry_run {
        return handle_dry_run();
    }

    let token = args
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(CampaignError::MissingCredentials)?;

    println!("🛰️  Connecting to Earth Engine...");
    println!("   Endpoint: {}", config.imagery.endpoint);
    println!("   Project: {}", config.imagery.project);
    println!("   Collection: {}", config.imagery.collection);
    println!("   Timeout: {}s", config.imagery.timeout_seconds);

    let client = EarthEngineClient::new(config.earth_engine(token))?;
    let aggregator = RegionAggregator::new(
        client,
        config.imagery.collection.clone(),
        config.imagery.band.clone(),
    );
    let runner = CampaignRunner::new(aggregator, !args.quiet);

    println!("\n🔬 Summing NO2 columns over inner and outer boxes...\n");
    let records = runner.run().await?;

    println!("\n📝 Computing anomaly ratios...");
    let tables = analysis::compute_tables(&records)?;

    let indeterminate =
        tables.first_half.indeterminate_count() + tables.second_half.indeterminate_count();
    if indeterminate > 0 {
        warn!(
            "{} ratios are indeterminate and are written as empty cells",
            indeterminate
        );
    }

    let output_dir = &config.export.output_dir;
    let mut written = report::export_tables(&tables, output_dir, args.format)?;
    if config.export.write_raw_sums {
        written.push(report::export_raw_sums(&records, output_dir)?);
    }

    println!("\n📊 Anomaly Summary:");
    print_table_summary(&tables.first_half);
    print_table_summary(&tables.second_half);
    println!("   Files written:");
    for path in &written {
        println!("     📄 {}", path.display());
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());

    println!(
        "\n✅ Data extraction finished, saved files to: {}",
        output_dir.display()
    );

    Ok(0)
}

/// Print column means and the highest-ranked location of a table.
fn print_table_summary(table: &AnomalyTable) {
    let means: Vec<String> = table
        .columns
        .iter()
        .zip(analysis::column_means(table))
        .map(|(column, mean)| match mean {
            Some(m) => format!("{}: {:.3}", column, m),
            None => format!("{}: n/a", column),
        })
        .collect();

    println!("   {} means: {}", table.grid, means.join(" | "));
    if let Some((name, mean)) = analysis::rank_locations(table).first() {
        println!("   Highest {} anomaly: {} ({:.3})", table.grid, name, mean);
    }
}

/// Handle --dry-run: print the planned queries and exit.
fn handle_dry_run() -> Result<i32> {
    println!("\n🔍 Dry run: planning queries (no Earth Engine calls)...\n");

    let plan = campaign_plan()?;
    for query in &plan {
        println!(
            "     📍 {:<10} {:<5} {}..{} -> {}",
            query.location.name,
            query.box_size,
            query.window.start,
            query.window.end,
            query.period
        );
    }
    println!("\n   Total: {} queries", plan.len());

    println!("\n✅ Dry run complete. No Earth Engine calls were made.");
    Ok(0)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location; a file that exists but does not parse is fatal
    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
