//! Per-agency activity index relative to each agency's own peak.

use crate::models::{AgencyId, CombinedSeries, NormalizedRow};
use std::collections::HashMap;

/// Annotate every row with `count / max(count)` for its agency.
///
/// An agency whose peak is zero gets `0.0` everywhere, so an empty or
/// all-zero series never divides by zero.
pub fn normalize_series(series: &CombinedSeries) -> Vec<NormalizedRow> {
    let mut peaks: HashMap<AgencyId, u64> = HashMap::new();
    for row in series.rows() {
        let peak = peaks.entry(row.agency).or_insert(0);
        *peak = (*peak).max(row.count);
    }

    series
        .rows()
        .iter()
        .map(|row| {
            let peak = peaks.get(&row.agency).copied().unwrap_or(0);
            let normalized = if peak > 0 {
                row.count as f64 / peak as f64
            } else {
                0.0
            };
            NormalizedRow {
                month: row.month,
                agency: row.agency,
                count: row.count,
                normalized,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MonthlyCount;
    use chrono::NaiveDate;

    fn row(agency: AgencyId, m: u32, count: u64) -> MonthlyCount {
        MonthlyCount {
            month: NaiveDate::from_ymd_opt(2024, m, 1).unwrap(),
            agency,
            count,
        }
    }

    #[test]
    fn test_values_are_bounded_with_single_peak() {
        let series = CombinedSeries::new(vec![
            row(AgencyId::Noaa, 1, 900),
            row(AgencyId::Noaa, 2, 3000),
            row(AgencyId::Noaa, 3, 150),
            row(AgencyId::Nsf, 1, 4),
            row(AgencyId::Nsf, 2, 1),
        ]);

        let normalized = normalize_series(&series);

        assert!(normalized.iter().all(|r| (0.0..=1.0).contains(&r.normalized)));
        for agency in [AgencyId::Noaa, AgencyId::Nsf] {
            let peaks = normalized
                .iter()
                .filter(|r| r.agency == agency && r.normalized == 1.0)
                .count();
            assert_eq!(peaks, 1, "{} should have exactly one peak", agency);
        }
    }

    #[test]
    fn test_scale_is_per_agency() {
        let series = CombinedSeries::new(vec![
            row(AgencyId::Noaa, 1, 5000),
            row(AgencyId::Nsf, 1, 5),
        ]);

        let normalized = normalize_series(&series);

        assert!(normalized.iter().all(|r| r.normalized == 1.0));
    }

    #[test]
    fn test_zero_peak_normalizes_to_zero() {
        let series = CombinedSeries::new(vec![row(AgencyId::Doj, 1, 0), row(AgencyId::Doj, 2, 0)]);

        let normalized = normalize_series(&series);

        assert!(normalized.iter().all(|r| r.normalized == 0.0));
    }

    #[test]
    fn test_empty_series() {
        assert!(normalize_series(&CombinedSeries::default()).is_empty());
    }
}
