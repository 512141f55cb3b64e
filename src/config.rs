//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.no2scan.toml` files.

use crate::imagery::{EarthEngineConfig, DEFAULT_BAND, DEFAULT_COLLECTION};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".no2scan.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Imagery service settings.
    #[serde(default)]
    pub imagery: ImageryConfig,

    /// Export settings.
    #[serde(default)]
    pub export: ExportConfig,
}

/// Earth Engine and dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageryConfig {
    /// Earth Engine API URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Cloud project the requests are billed to.
    #[serde(default = "default_project")]
    pub project: String,

    /// Image collection id.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Band that is summed.
    #[serde(default = "default_band")]
    pub band: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            project: default_project(),
            collection: default_collection(),
            band: default_band(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_endpoint() -> String {
    EarthEngineConfig::default().endpoint
}

fn default_project() -> String {
    EarthEngineConfig::default().project
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_band() -> String {
    DEFAULT_BAND.to_string()
}

fn default_timeout() -> u64 {
    EarthEngineConfig::default().timeout_seconds
}

/// Table export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory the tables are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Also write `raw_sums.csv`.
    #[serde(default)]
    pub write_raw_sums: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            write_raw_sums: false,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_optional(Path::new(CONFIG_FILE))
    }

    /// Load `path` if it exists.
    pub fn load_optional(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref endpoint) = args.endpoint {
            self.imagery.endpoint = endpoint.clone();
        }
        if let Some(ref project) = args.project {
            self.imagery.project = project.clone();
        }
        if let Some(timeout) = args.timeout {
            self.imagery.timeout_seconds = timeout;
        }
        if let Some(ref dir) = args.output_dir {
            self.export.output_dir = dir.clone();
        }

        // Flags always override
        if args.raw_sums {
            self.export.write_raw_sums = true;
        }
    }

    /// Client settings for the given access token.
    pub fn earth_engine(&self, access_token: &str) -> EarthEngineConfig {
        EarthEngineConfig {
            endpoint: self.imagery.endpoint.clone(),
            project: self.imagery.project.clone(),
            access_token: access_token.to_string(),
            timeout_seconds: self.imagery.timeout_seconds,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> Result<String> {
        toml::to_string_pretty(&Config::default()).context("Failed to serialize default config")
    }
}
