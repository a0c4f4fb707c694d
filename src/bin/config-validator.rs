//! # Cadence Configuration Validator
//!
//! Command-line tool for validating Cadence configuration files across environments.
//! Surfaces bad batching bounds or malformed overrides before a pipeline starts.

use anyhow::{Context, Result};
use cadence_core::batching::max_time_series_count;
use cadence_core::config::{CadenceConfig, ConfigManager};
use cadence_core::constants::CONFIG_FILE_STEM;
use cadence_core::models::CadenceRange;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "config-validator")]
#[command(about = "Validate Cadence configuration files")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Environment to validate (development, test, production, ...)
    #[arg(short, long, default_value = "development")]
    environment: String,

    /// Configuration directory path (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate the configuration for the environment
    Validate,

    /// Print the merged configuration
    Show,

    /// List environments that have an override file
    Environments,

    /// Show the per-batch series budget for a cadence range
    Budget {
        /// First cadence index
        #[arg(long, default_value_t = 0)]
        start: i32,

        /// Last cadence index (inclusive)
        #[arg(long)]
        end: i32,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let _ = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    let result = match &cli.command {
        Some(Commands::Validate) | None => validate(&cli),
        Some(Commands::Show) => show(&cli),
        Some(Commands::Environments) => list_environments(&cli),
        Some(Commands::Budget { start, end }) => budget(&cli, *start, *end),
    };

    match result {
        Ok(()) => {
            info!("Configuration check completed successfully");
            process::exit(0);
        }
        Err(e) => {
            error!("Configuration check failed: {:#}", e);
            eprintln!("❌ {e:#}");
            process::exit(1);
        }
    }
}

fn load(cli: &Cli) -> Result<CadenceConfig> {
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &cli.environment)
        .with_context(|| format!("loading configuration for '{}'", cli.environment))?;
    Ok(manager.config().clone())
}

fn validate(cli: &Cli) -> Result<()> {
    let config = load(cli)?;

    match cli.format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "environment": cli.environment,
                "valid": true,
                "config": config,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("🔧 Validating Cadence Configuration");
            println!("Environment: {}", cli.environment);
            if let Some(dir) = &cli.config_dir {
                println!("Config Directory: {}", dir.display());
            }
            println!();
            print_table(&config);
            println!("\n✅ Configuration is valid");
        }
    }
    Ok(())
}

fn show(cli: &Cli) -> Result<()> {
    let config = load(cli)?;
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Table => print_table(&config),
    }
    Ok(())
}

fn print_table(config: &CadenceConfig) {
    println!("[batching]");
    println!("  max_sample_count           {}", config.batching.max_sample_count);
    println!("  max_read_count             {}", config.batching.max_read_count);
    println!("  prefetch_enabled           {}", config.batching.prefetch_enabled);
    println!("[sequencer]");
    println!("  max_in_flight_bundles      {}", config.sequencer.max_in_flight_bundles);
    println!("  persist_cumulative_lineage {}", config.sequencer.persist_cumulative_lineage);
    println!("  retry_attempts             {}", config.sequencer.retry_attempts);
    println!("[events]");
    println!("  channel_capacity           {}", config.events.channel_capacity);
    println!("[logging]");
    println!("  level                      {}", config.logging.level);
    println!("  json_file                  {}", config.logging.json_file);
    println!("  log_dir                    {}", config.logging.log_dir.display());
}

fn list_environments(cli: &Cli) -> Result<()> {
    let dir = cli
        .config_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("config"));

    if !dir.exists() {
        println!("❌ Configuration directory not found: {}", dir.display());
        return Ok(());
    }

    let prefix = format!("{CONFIG_FILE_STEM}.");
    let mut environments = Vec::new();
    for entry in std::fs::read_dir(&dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some(env) = stem.strip_prefix(&prefix) {
            environments.push(env.to_string());
        }
    }
    environments.sort();

    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&environments)?),
        OutputFormat::Table => {
            println!("📋 Available Environments:");
            for env in environments {
                println!("  • {env}");
            }
        }
    }
    Ok(())
}

fn budget(cli: &Cli, start: i32, end: i32) -> Result<()> {
    let config = load(cli)?;
    let range = CadenceRange::new(start, end)?;
    let per_batch = max_time_series_count(config.batching.max_sample_count, range);

    match cli.format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "cadence_count": range.len(),
                "max_sample_count": config.batching.max_sample_count,
                "max_time_series_per_batch": per_batch,
                "max_read_count": config.batching.max_read_count,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!("Cadences:                   {}", range.len());
            println!("Max sample count:           {}", config.batching.max_sample_count);
            println!("Max time series per batch:  {per_batch}");
            println!("Max identifiers per read:   {}", config.batching.max_read_count);
        }
    }
    Ok(())
}
