//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::AgencyId;
use clap::Parser;
use std::path::PathBuf;

/// pubtrack - dataset publication tracker for US government agencies
///
/// Fetches dataset creation dates from agency catalogs, feeds and release
/// pages, stores daily and monthly counts as CSV, and reports recent
/// activity, drop-offs and year-over-year trends.
///
/// Examples:
///   pubtrack
///   pubtrack --agency epa,noaa --start-year 2018
///   pubtrack --skip-fetch --format json --report activity.json
///   pubtrack --yoy-month 3 --yoy-years 5
///   pubtrack --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .pubtrack.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory holding the CSV artifacts
    #[arg(short, long, value_name = "DIR", env = "PUBTRACK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Ignore records created before this year
    #[arg(long, value_name = "YEAR")]
    pub start_year: Option<i32>,

    /// Agencies to fetch (comma-separated, default: all)
    ///
    /// Example: --agency epa,noaa
    #[arg(short, long, value_name = "AGENCY", value_delimiter = ',')]
    pub agency: Vec<AgencyId>,

    /// Skip fetching and recompute analytics from cached monthly files
    #[arg(long)]
    pub skip_fetch: bool,

    /// Months of history in the recent activity window
    #[arg(long, value_name = "MONTHS")]
    pub window_months: Option<u32>,

    /// Leave the current, incomplete month out of the window
    #[arg(long)]
    pub exclude_current_month: bool,

    /// Calendar month (1-12) compared year over year
    ///
    /// Defaults to the previous calendar month.
    #[arg(long, value_name = "MONTH")]
    pub yoy_month: Option<u32>,

    /// Number of most recent years in the year-over-year comparison
    #[arg(long, value_name = "YEARS")]
    pub yoy_years: Option<usize>,

    /// Write the report to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Number of agencies fetched at the same time
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only, no progress bar)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .pubtrack.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
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
        if self.init_config {
            return Ok(());
        }

        if let Some(year) = self.start_year {
            if !(1990..=2100).contains(&year) {
                return Err(format!("Start year must be between 1990 and 2100, got {}", year));
            }
        }

        if let Some(month) = self.yoy_month {
            if !(1..=12).contains(&month) {
                return Err(format!("Year-over-year month must be 1-12, got {}", month));
            }
        }

        if let Some(years) = self.yoy_years {
            if years < 2 {
                return Err("Year-over-year comparison needs at least 2 years".to_string());
            }
        }

        if let Some(months) = self.window_months {
            if months == 0 || months > 600 {
                return Err("Window must be between 1 and 600 months".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
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

    /// Agencies to fetch: the `--agency` filter, or every agency.
    pub fn selected_agencies(&self) -> Vec<AgencyId> {
        if self.agency.is_empty() {
            return AgencyId::ALL.to_vec();
        }
        let mut agencies = self.agency.clone();
        agencies.sort();
        agencies.dedup();
        agencies
    }
}
