//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// no2scan - NO2 pollution anomaly extraction from Sentinel-5P imagery
///
/// Sums the tropospheric NO2 column over an inner and an outer box around
/// each industrial site, for eight half-year windows, and writes the
/// anomaly ratios of the two half-year grids as CSV or JSON tables.
///
/// Examples:
///   no2scan --project my-ee-project --token "$(gcloud auth print-access-token)"
///   no2scan --output-dir ./out --format json
///   no2scan --dry-run
///   no2scan --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .no2scan.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory the tables are written to
    ///
    /// Default: from config or ./data
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Cloud project used for Earth Engine requests
    #[arg(short, long, value_name = "PROJECT", env = "EARTHENGINE_PROJECT")]
    pub project: Option<String>,

    /// OAuth access token for Earth Engine
    ///
    /// For example the output of `gcloud auth print-access-token`.
    #[arg(long, value_name = "TOKEN", env = "EARTHENGINE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Earth Engine API endpoint URL
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Output format (csv, json)
    #[arg(long, default_value = "csv", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Request timeout in seconds
    ///
    /// Default: from config or 300s.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Also write the raw inner/outer sums to raw_sums.csv
    #[arg(long)]
    pub raw_sums: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: list the planned queries without calling Earth Engine
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .no2scan.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the anomaly tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// CSV format (default)
    #[default]
    Csv,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref endpoint) = self.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err("Endpoint URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(ref project) = self.project {
            if project.trim().is_empty() {
                return Err("Project must not be empty".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref dir) = self.output_dir {
            if dir.is_file() {
                return Err(format!(
                    "Output path is a file, not a directory: {}",
                    dir.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
