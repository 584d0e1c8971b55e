//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.pubtrack.toml` files.

use crate::analysis::Metric;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".pubtrack.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// HTTP and pagination settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Upstream endpoints.
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Analytics and reporting settings.
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory holding the CSV artifacts.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Records created before this year are ignored.
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    /// Number of agencies fetched at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            start_year: default_start_year(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_start_year() -> i32 {
    2010
}

fn default_concurrency() -> usize {
    1
}

/// HTTP client, retry and pagination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Attempts per batch before it is skipped.
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// First backoff delay; doubled after every failed attempt.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Pause between successful batches of high-volume sources.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,

    /// Results requested per catalog page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Consecutive skipped batches after which pagination gives up.
    #[serde(default = "default_max_skipped_batches")]
    pub max_skipped_batches: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Some agency pages serve broken certificate chains.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            retries: default_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            rate_limit_ms: default_rate_limit_ms(),
            page_size: default_page_size(),
            max_skipped_batches: default_max_skipped_batches(),
            user_agent: default_user_agent(),
            accept_invalid_certs: false,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    5000
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_page_size() -> usize {
    1000
}

fn default_max_skipped_batches() -> u32 {
    3
}

fn default_user_agent() -> String {
    format!("pubtrack/{}", env!("CARGO_PKG_VERSION"))
}

/// Upstream endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Base URL of the CKAN catalog.
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,

    #[serde(default = "default_cdc_metadata_url")]
    pub cdc_metadata_url: String,

    #[serde(default = "default_mmwr_feed_url")]
    pub mmwr_feed_url: String,

    #[serde(default = "default_vsrr_page_url")]
    pub vsrr_page_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            catalog_url: default_catalog_url(),
            cdc_metadata_url: default_cdc_metadata_url(),
            mmwr_feed_url: default_mmwr_feed_url(),
            vsrr_page_url: default_vsrr_page_url(),
        }
    }
}

fn default_catalog_url() -> String {
    "https://catalog.data.gov".to_string()
}

fn default_cdc_metadata_url() -> String {
    "https://data.cdc.gov/api/views/metadata/v1".to_string()
}

fn default_mmwr_feed_url() -> String {
    "https://tools.cdc.gov/api/v2/resources/media/403372.rss".to_string()
}

fn default_vsrr_page_url() -> String {
    "https://www.cdc.gov/nchs/nvss/vsrr.htm".to_string()
}

/// Analytics and reporting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Months of history shown in the report window.
    #[serde(default = "default_window_months")]
    pub window_months: u32,

    /// Keep the current, incomplete month in the window.
    #[serde(default = "default_true")]
    pub include_current_month: bool,

    /// Calendar month compared year over year; previous month if unset.
    #[serde(default)]
    pub yoy_month: Option<u32>,

    /// Number of most recent years in the comparison.
    #[serde(default = "default_yoy_years")]
    pub yoy_years: usize,

    /// Value scanned for drop-offs: `normalized` or `count`.
    #[serde(default)]
    pub dropoff_metric: Metric,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            window_months: default_window_months(),
            include_current_month: true,
            yoy_month: None,
            yoy_years: default_yoy_years(),
            dropoff_metric: Metric::Normalized,
        }
    }
}

fn default_window_months() -> u32 {
    6
}

fn default_true() -> bool {
    true
}

fn default_yoy_years() -> usize {
    3
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
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data_dir) = args.data_dir {
            self.general.data_dir = data_dir.display().to_string();
        }
        if let Some(start_year) = args.start_year {
            self.general.start_year = start_year;
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }

        if let Some(timeout) = args.timeout {
            self.http.timeout_seconds = timeout;
        }

        if let Some(window) = args.window_months {
            self.analytics.window_months = window;
        }
        if let Some(month) = args.yoy_month {
            self.analytics.yoy_month = Some(month);
        }
        if let Some(years) = args.yoy_years {
            self.analytics.yoy_years = years;
        }
        if args.exclude_current_month {
            self.analytics.include_current_month = false;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
