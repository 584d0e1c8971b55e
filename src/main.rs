//! pubtrack - Dataset Publication Tracker
//!
//! A CLI tool that counts the datasets US government agencies publish over
//! time, persists daily and monthly counts as CSV, and reports recent
//! activity, drop-offs and year-over-year trends.
//!
//! Exit codes:
//!   0 - Success (including a run where no agency produced data)
//!   1 - Runtime error (invalid arguments, config, report write, etc.)

mod analysis;
mod cli;
mod config;
mod models;
mod pipeline;
mod report;
mod sources;
mod store;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use models::{AgencyId, Report, ReportMetadata};
use pipeline::AgencyRun;
use sources::{HttpFetcher, RetryPolicy};
use std::collections::BTreeSet;
use std::time::Instant;
use store::ArtifactStore;
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

    init_logging(&args);

    info!("pubtrack v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\nError: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .pubtrack.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize endpoints, retries, and the report window.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
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

/// Run the fetch, combine and report workflow. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let store = ArtifactStore::new(&config.general.data_dir);
    info!("Artifacts in: {}", store.dir().display());

    let mut fetched = Vec::new();
    let mut without_data = Vec::new();

    if args.skip_fetch {
        info!("Skipping fetch, using cached monthly artifacts");
    } else {
        fetched = args.selected_agencies();
        let runs = fetch_agencies(&fetched, &config, &store, !args.quiet).await?;
        for (agency, outcome) in runs {
            match outcome {
                Ok(run) if run.has_data() => {}
                Ok(_) => without_data.push(agency),
                Err(e) => {
                    warn!("{}: excluded from this run: {:#}", agency, e);
                    without_data.push(agency);
                }
            }
        }
        without_data.sort();
    }

    // Step 2: combine everything on disk and derive analytics
    let series = pipeline::combine_from_store(&store);
    let normalized = analysis::normalize_series(&series);

    if series.is_empty() {
        warn!("No agency produced usable data");
        store.remove_combined()?;
    } else {
        info!(
            "Combined series: {} rows across {} agencies",
            series.len(),
            series.agencies().len()
        );
        let path = store.write_combined(&normalized)?;
        info!("Combined series written to {}", path.display());
    }

    let today = Local::now().date_naive();
    let summary = analysis::summarize(&series, &normalized, &config.analytics, today);

    let months: BTreeSet<_> = series.rows().iter().map(|row| row.month).collect();
    let metadata = ReportMetadata {
        generated_at: Utc::now(),
        start_year: config.general.start_year,
        agencies_fetched: fetched,
        agencies_with_data: series.agencies(),
        agencies_without_data: without_data,
        months_covered: months.len(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };

    let report = Report { metadata, summary };

    // Step 3: render and emit the report
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match args.report {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                eprintln!(
                    "\nAgencies with data: {} | Months covered: {} | Duration: {:.1}s",
                    report.metadata.agencies_with_data.len(),
                    report.metadata.months_covered,
                    report.metadata.duration_seconds
                );
                eprintln!("Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }

    Ok(0)
}

/// Ingest every selected agency, `general.concurrency` at a time.
///
/// A failure for one agency is returned alongside it and never stops the
/// others.
async fn fetch_agencies(
    agencies: &[AgencyId],
    config: &Config,
    store: &ArtifactStore,
    show_progress: bool,
) -> Result<Vec<(AgencyId, Result<AgencyRun>)>> {
    let fetcher = HttpFetcher::new(&config.http)?;
    let retry = RetryPolicy::from(&config.http);
    let start_year = config.general.start_year;
    let concurrency = config.general.concurrency.max(1);

    info!(
        "Fetching {} agencies since {} ({} at a time)",
        agencies.len(),
        start_year,
        concurrency
    );

    let pb = if show_progress {
        let pb = ProgressBar::new(agencies.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let jobs = agencies.iter().map(|&agency| {
        let sources = sources::sources_for(agency, &config.sources, &config.http);
        let (fetcher, retry, pb) = (&fetcher, &retry, &pb);
        async move {
            let outcome = match sources {
                Ok(sources) => {
                    pipeline::ingest_agency(agency, &sources, fetcher, retry, start_year, store)
                        .await
                }
                Err(e) => Err(e),
            };
            pb.set_message(agency.to_string());
            pb.inc(1);
            (agency, outcome)
        }
    });

    let results: Vec<_> = stream::iter(jobs)
        .buffer_unordered(concurrency)
        .collect()
        .await;

    pb.finish_and_clear();
    Ok(results)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_empty_run_clears_old_combined_series() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        std::fs::write(
            store.combined_path(),
            "month,Agency,datasets_created,normalized\n2020-01-01,EPA,99,1.0\n",
        )
        .unwrap();
        let report_path = dir.path().join("report.md");

        let args = Args::parse_from([
            "pubtrack",
            "--skip-fetch",
            "--quiet",
            "--data-dir",
            dir.path().to_str().unwrap(),
            "--report",
            report_path.to_str().unwrap(),
        ]);
        let exit_code = run(args).await.unwrap();

        assert_eq!(exit_code, 0);
        assert!(!store.combined_path().exists());
        let report = std::fs::read_to_string(&report_path).unwrap();
        assert!(report.contains("## No Data"));
    }
}
