//! Daily counts rolled up into monthly totals.

use crate::models::{first_of_month, AgencyId, DailyCount, MonthlyCount};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Sum daily counts per (month, agency).
///
/// Only months present in the input appear in the output; gaps are never
/// filled with zero rows.
pub fn aggregate_monthly(daily: &[DailyCount]) -> Vec<MonthlyCount> {
    let mut months: BTreeMap<(NaiveDate, AgencyId), u64> = BTreeMap::new();

    for day in daily {
        *months
            .entry((first_of_month(day.date), day.agency))
            .or_insert(0) += day.count;
    }

    months
        .into_iter()
        .map(|((month, agency), count)| MonthlyCount {
            month,
            agency,
            count,
        })
        .collect()
}

/// Total of all monthly counts.
pub fn total_count(monthly: &[MonthlyCount]) -> u64 {
    monthly.iter().map(|m| m.count).sum()
}
