//! Reporting window over the normalized series.

use crate::models::{first_of_month, AgencyId, AgencyTotal, NormalizedRow};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::BTreeMap;

/// First month of a window reaching `months` back from the current month.
pub fn window_start(today: NaiveDate, months: u32) -> NaiveDate {
    first_of_month(today)
        .checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// Rows from `window_start` onward.
///
/// The current, still incomplete month is kept only when
/// `include_current_month` is set.
pub fn recent_rows(
    rows: &[NormalizedRow],
    today: NaiveDate,
    months: u32,
    include_current_month: bool,
) -> Vec<NormalizedRow> {
    let start = window_start(today, months);
    let current = first_of_month(today);

    rows.iter()
        .filter(|row| row.month >= start)
        .filter(|row| include_current_month || row.month < current)
        .copied()
        .collect()
}

/// Per-agency sum of counts, in agency order.
pub fn totals_by_agency(rows: &[NormalizedRow]) -> Vec<AgencyTotal> {
    let mut totals: BTreeMap<AgencyId, u64> = BTreeMap::new();
    for row in rows {
        *totals.entry(row.agency).or_insert(0) += row.count;
    }
    totals
        .into_iter()
        .map(|(agency, total)| AgencyTotal { agency, total })
        .collect()
}

/// Calendar month before `today`'s, wrapping December.
pub fn previous_month(today: NaiveDate) -> u32 {
    match today.month() {
        1 => 12,
        m => m - 1,
    }
}
