//! Year-over-year grouping for one calendar month.

use crate::models::{AgencyId, CombinedSeries, YearOverYear, YoyPoint};
use chrono::Datelike;
use std::collections::{BTreeMap, BTreeSet};

/// Minimum number of years for a meaningful comparison.
pub const MIN_YEARS: usize = 2;

/// Compare `month` (1-12) across the `years` most recent years that have
/// any data for it.
///
/// Returns [`YearOverYear::Insufficient`] when fewer than two such years
/// exist, including when the series is empty.
pub fn year_over_year(series: &CombinedSeries, month: u32, years: usize) -> YearOverYear {
    let available: BTreeSet<i32> = series
        .rows()
        .iter()
        .filter(|row| row.month.month() == month)
        .map(|row| row.month.year())
        .collect();

    let selected: Vec<i32> = available.iter().rev().take(years).copied().collect();
    if selected.len() < MIN_YEARS {
        return YearOverYear::Insufficient {
            month,
            years_available: selected,
        };
    }

    let mut totals: BTreeMap<(AgencyId, i32), u64> = BTreeMap::new();
    for row in series.rows() {
        let year = row.month.year();
        if row.month.month() == month && selected.contains(&year) {
            *totals.entry((row.agency, year)).or_insert(0) += row.count;
        }
    }

    let points = totals
        .into_iter()
        .map(|((agency, year), count)| YoyPoint {
            agency,
            year,
            count,
        })
        .collect();

    YearOverYear::Grouped {
        month,
        years: selected,
        points,
    }
}
