//! CSV artifacts shared with the dashboard.
//!
//! Artifacts are a cache: every run rewrites them in full, and any of them
//! may be deleted between runs. Writes go through a temp file in the same
//! directory and are renamed into place.

use crate::models::{AgencyId, DailyCount, MonthlyCount, NormalizedRow};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

const COMBINED_FILE: &str = "combined_monthly.csv";

#[derive(Debug, Serialize, Deserialize)]
struct DailyRow {
    created_date: NaiveDate,
    datasets_created: u64,
    #[serde(rename = "Agency")]
    agency: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct MonthlyRow {
    month: NaiveDate,
    datasets_created: u64,
    #[serde(rename = "Agency")]
    agency: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CombinedRow {
    month: NaiveDate,
    #[serde(rename = "Agency")]
    agency: String,
    datasets_created: u64,
    normalized: f64,
}

/// Reads and writes the per-agency and combined artifacts in one directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn daily_path(&self, agency: AgencyId) -> PathBuf {
        self.dir
            .join(format!("{}_dataset_counts.csv", agency.file_stem()))
    }

    pub fn monthly_path(&self, agency: AgencyId) -> PathBuf {
        self.dir.join(format!("{}_monthly.csv", agency.file_stem()))
    }

    pub fn combined_path(&self) -> PathBuf {
        self.dir.join(COMBINED_FILE)
    }

    pub fn write_daily(&self, agency: AgencyId, daily: &[DailyCount]) -> Result<PathBuf> {
        let path = self.daily_path(agency);
        let rows = daily.iter().map(|d| DailyRow {
            created_date: d.date,
            datasets_created: d.count,
            agency: agency.to_string(),
        });
        write_atomic(&path, rows)?;
        Ok(path)
    }

    pub fn write_monthly(&self, agency: AgencyId, monthly: &[MonthlyCount]) -> Result<PathBuf> {
        let path = self.monthly_path(agency);
        let rows = monthly.iter().map(|m| MonthlyRow {
            month: m.month,
            datasets_created: m.count,
            agency: agency.to_string(),
        });
        write_atomic(&path, rows)?;
        Ok(path)
    }

    pub fn write_combined(&self, rows: &[NormalizedRow]) -> Result<PathBuf> {
        let path = self.combined_path();
        let rows = rows.iter().map(|r| CombinedRow {
            month: r.month,
            agency: r.agency.to_string(),
            datasets_created: r.count,
            normalized: r.normalized,
        });
        write_atomic(&path, rows)?;
        Ok(path)
    }

    /// Remove an agency's artifacts, e.g. after a run that found no data.
    pub fn remove_agency(&self, agency: AgencyId) -> Result<()> {
        remove_stale(&self.daily_path(agency))?;
        remove_stale(&self.monthly_path(agency))
    }

    /// Delete the combined artifact, so readers see no data instead of an
    /// earlier run's numbers.
    pub fn remove_combined(&self) -> Result<()> {
        remove_stale(&self.combined_path())
    }

    /// Read an agency's monthly artifact.
    ///
    /// Returns `Ok(None)` when the file is missing, lacks the
    /// `datasets_created` column, or has no usable rows. Rows that fail to
    /// parse are skipped.
    pub fn read_monthly(&self, agency: AgencyId) -> Result<Option<Vec<MonthlyCount>>> {
        let path = self.monthly_path(agency);
        if !path.exists() {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", path.display()))?;
        if !headers.iter().any(|h| h == "datasets_created") {
            warn!("{} has no datasets_created column", path.display());
            return Ok(None);
        }

        let mut monthly = Vec::new();
        for (index, row) in reader.deserialize::<MonthlyRow>().enumerate() {
            match row {
                Ok(row) => monthly.push(MonthlyCount {
                    month: row.month,
                    agency,
                    count: row.datasets_created,
                }),
                Err(e) => warn!("Skipping line {} of {}: {}", index + 2, path.display(), e),
            }
        }

        if monthly.is_empty() {
            return Ok(None);
        }
        Ok(Some(monthly))
    }
}

fn write_atomic<S, I>(path: &Path, rows: I) -> Result<()>
where
    S: Serialize,
    I: IntoIterator<Item = S>,
{
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let mut temp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    {
        let mut writer = csv::Writer::from_writer(temp.as_file_mut());
        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("Failed to write row to {}", path.display()))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", path.display()))?;
    }

    temp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to move artifact into place at {}", path.display()))?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn remove_stale(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
        debug!("Removed stale artifact {}", path.display());
    }
    Ok(())
}
