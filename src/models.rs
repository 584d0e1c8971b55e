//! Data models for the publication tracker.
//!
//! This module contains the core data structures that flow through the
//! pipeline: raw records from sources, daily and monthly counts, the
//! combined multi-agency series and the derived analytics views.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A tracked government agency.
///
/// The set is closed: adding an agency means adding its sources to the
/// registry, not configuring one at runtime.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgencyId {
    Cdc,
    Doj,
    Epa,
    Hhs,
    Noaa,
    Nsf,
    Usda,
}

impl AgencyId {
    /// Every tracked agency, in sort order.
    pub const ALL: [AgencyId; 7] = [
        AgencyId::Cdc,
        AgencyId::Doj,
        AgencyId::Epa,
        AgencyId::Hhs,
        AgencyId::Noaa,
        AgencyId::Nsf,
        AgencyId::Usda,
    ];

    /// Display name used in artifacts and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            AgencyId::Cdc => "CDC",
            AgencyId::Epa => "EPA",
            AgencyId::Hhs => "HHS",
            AgencyId::Doj => "DOJ",
            AgencyId::Usda => "USDA",
            AgencyId::Nsf => "NSF",
            AgencyId::Noaa => "NOAA",
        }
    }

    /// Lower-cased name used for artifact file names.
    pub fn file_stem(&self) -> String {
        self.as_str().to_lowercase()
    }
}

impl fmt::Display for AgencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single dated item as yielded by a source adapter.
///
/// The timestamp is kept as the source's raw text; parsing and validation
/// happen in the normalizer so every source shares one failure policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Raw creation/publication timestamp, if the item carried one.
    pub timestamp: Option<String>,
    /// Upstream identifier used for deduplication.
    pub external_id: Option<String>,
    /// Agency the record belongs to.
    pub agency: AgencyId,
}

impl RawRecord {
    /// Creates a record without an external id.
    pub fn dated(agency: AgencyId, timestamp: impl Into<String>) -> Self {
        Self {
            timestamp: Some(timestamp.into()),
            external_id: None,
            agency,
        }
    }
}

/// Number of records created on one calendar date for one agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub agency: AgencyId,
    pub count: u64,
}

/// Number of records created in one calendar month for one agency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthlyCount {
    /// First day of the month.
    pub month: NaiveDate,
    pub agency: AgencyId,
    pub count: u64,
}

/// Truncates a date to the first day of its month.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Monthly counts of every agency that supplied data, ordered by month.
///
/// Months without activity for an agency are absent rather than zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedSeries {
    rows: Vec<MonthlyCount>,
}

impl CombinedSeries {
    /// Builds a series, ordering rows by (month, agency).
    pub fn new(mut rows: Vec<MonthlyCount>) -> Self {
        rows.sort_by_key(|row| (row.month, row.agency));
        Self { rows }
    }

    pub fn rows(&self) -> &[MonthlyCount] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Distinct agencies present, in sorted order.
    pub fn agencies(&self) -> Vec<AgencyId> {
        let mut agencies: Vec<AgencyId> = self.rows.iter().map(|row| row.agency).collect();
        agencies.sort();
        agencies.dedup();
        agencies
    }
}

/// A combined row annotated with its activity index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub month: NaiveDate,
    pub agency: AgencyId,
    pub count: u64,
    /// `count` relative to the agency's historical peak, in `[0, 1]`.
    pub normalized: f64,
}

/// A transition from positive to zero activity between two recorded months.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DropoffEvent {
    pub agency: AgencyId,
    /// The first month with zero activity.
    pub month: NaiveDate,
}

/// Total for one agency in one year at the compared calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YoyPoint {
    pub agency: AgencyId,
    pub year: i32,
    pub count: u64,
}

/// Outcome of a year-over-year comparison for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum YearOverYear {
    /// Fewer than two years carry data for the month.
    Insufficient { month: u32, years_available: Vec<i32> },
    /// Per-agency totals for the selected years, newest year first.
    Grouped {
        month: u32,
        years: Vec<i32>,
        points: Vec<YoyPoint>,
    },
}

/// Sum of an agency's counts over a reporting window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgencyTotal {
    pub agency: AgencyId,
    pub total: u64,
}

/// Derived views over the combined series for one reporting window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySummary {
    /// First month included in the window.
    pub window_start: NaiveDate,
    pub window_months: u32,
    pub include_current_month: bool,
    /// Normalized rows inside the window, ordered by month.
    pub recent: Vec<NormalizedRow>,
    pub totals: Vec<AgencyTotal>,
    pub dropoffs: Vec<DropoffEvent>,
    pub year_over_year: YearOverYear,
}

/// Metadata about a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub start_year: i32,
    /// Agencies fetched this run (empty when analytics ran from cache).
    pub agencies_fetched: Vec<AgencyId>,
    /// Agencies present in the combined series.
    pub agencies_with_data: Vec<AgencyId>,
    /// Fetched agencies that produced no usable records.
    pub agencies_without_data: Vec<AgencyId>,
    pub months_covered: usize,
    pub duration_seconds: f64,
}

/// The complete run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    /// `None` when no agency supplied any data.
    pub summary: Option<ActivitySummary>,
}

/// English name of a calendar month (1-12).
pub fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    month
        .checked_sub(1)
        .and_then(|index| NAMES.get(index as usize))
        .copied()
        .unwrap_or("Unknown")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agency_file_stem() {
        assert_eq!(AgencyId::Usda.file_stem(), "usda");
        assert_eq!(AgencyId::Hhs.to_string(), "HHS");
    }

    #[test]
    fn test_first_of_month() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(
            first_of_month(date),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn test_combined_series_ordering() {
        let jan = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let feb = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let series = CombinedSeries::new(vec![
            MonthlyCount { month: feb, agency: AgencyId::Epa, count: 1 },
            MonthlyCount { month: jan, agency: AgencyId::Noaa, count: 2 },
            MonthlyCount { month: jan, agency: AgencyId::Cdc, count: 3 },
        ]);

        let order: Vec<_> = series.rows().iter().map(|r| (r.month, r.agency)).collect();
        assert_eq!(
            order,
            vec![(jan, AgencyId::Cdc), (jan, AgencyId::Noaa), (feb, AgencyId::Epa)]
        );
        assert_eq!(series.agencies(), vec![AgencyId::Cdc, AgencyId::Epa, AgencyId::Noaa]);
    }

    #[test]
    fn test_month_name() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(0), "Unknown");
    }
}
