//! Drop-off detection: positive activity followed by a recorded zero.

use crate::models::{AgencyId, DropoffEvent, NormalizedRow};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which value of a row is scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Count,
    #[default]
    Normalized,
}

impl Metric {
    fn value(self, row: &NormalizedRow) -> f64 {
        match self {
            Metric::Count => row.count as f64,
            Metric::Normalized => row.normalized,
        }
    }
}

/// Emit an event wherever an agency's previous recorded month was positive
/// and the current one is exactly zero.
///
/// Only consecutive rows that exist are compared: a month missing from the
/// series is not zero and never triggers an event.
pub fn detect_dropoffs(rows: &[NormalizedRow], metric: Metric) -> Vec<DropoffEvent> {
    let mut by_agency: BTreeMap<AgencyId, Vec<&NormalizedRow>> = BTreeMap::new();
    for row in rows {
        by_agency.entry(row.agency).or_default().push(row);
    }

    let mut events = Vec::new();
    for (agency, mut agency_rows) in by_agency {
        agency_rows.sort_by_key(|row| row.month);

        for pair in agency_rows.windows(2) {
            let previous = metric.value(pair[0]);
            let current = metric.value(pair[1]);
            if previous > 0.0 && current == 0.0 {
                events.push(DropoffEvent {
                    agency,
                    month: pair[1].month,
                });
            }
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(agency: AgencyId, counts: &[(u32, u64)]) -> Vec<NormalizedRow> {
        let peak = counts.iter().map(|(_, c)| *c).max().unwrap_or(0);
        counts
            .iter()
            .map(|&(m, count)| NormalizedRow {
                month: NaiveDate::from_ymd_opt(2024, m, 1).unwrap(),
                agency,
                count,
                normalized: if peak > 0 { count as f64 / peak as f64 } else { 0.0 },
            })
            .collect()
    }

    fn month(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    #[test]
    fn test_single_dropoff() {
        let rows = series(AgencyId::Epa, &[(1, 5), (2, 3), (3, 0), (4, 2)]);

        for metric in [Metric::Count, Metric::Normalized] {
            assert_eq!(
                detect_dropoffs(&rows, metric),
                vec![DropoffEvent { agency: AgencyId::Epa, month: month(3) }]
            );
        }
    }

    #[test]
    fn test_leading_zeros_are_not_dropoffs() {
        let rows = series(AgencyId::Epa, &[(1, 0), (2, 0), (3, 5)]);
        assert!(detect_dropoffs(&rows, Metric::Count).is_empty());
    }

    #[test]
    fn test_gap_is_not_a_dropoff() {
        // March is absent, not zero.
        let rows = series(AgencyId::Hhs, &[(1, 4), (2, 2), (4, 1)]);
        assert!(detect_dropoffs(&rows, Metric::Normalized).is_empty());
    }

    #[test]
    fn test_rows_in_any_order_and_interleaved() {
        let mut rows = series(AgencyId::Cdc, &[(3, 0), (1, 2)]);
        rows.extend(series(AgencyId::Doj, &[(1, 0), (2, 9)]));
        rows.reverse();

        assert_eq!(
            detect_dropoffs(&rows, Metric::Count),
            vec![DropoffEvent { agency: AgencyId::Cdc, month: month(3) }]
        );
    }
}
