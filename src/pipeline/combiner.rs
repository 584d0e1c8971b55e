//! Tolerant merge of per-agency monthly series.

use crate::models::{AgencyId, CombinedSeries, MonthlyCount};
use tracing::{debug, warn};

/// Concatenate every usable agency input into one series.
///
/// Missing (`None`) and empty inputs are logged and skipped. No usable
/// input at all yields an empty series, not an error.
pub fn combine_agencies(inputs: Vec<(AgencyId, Option<Vec<MonthlyCount>>)>) -> CombinedSeries {
    let mut rows = Vec::new();

    for (agency, counts) in inputs {
        match counts {
            None => warn!("{}: no monthly data available, excluded from combined series", agency),
            Some(counts) if counts.is_empty() => {
                warn!("{}: monthly data is empty, excluded from combined series", agency)
            }
            Some(counts) => {
                debug!("{}: {} months combined", agency, counts.len());
                rows.extend(counts);
            }
        }
    }

    CombinedSeries::new(rows)
}
