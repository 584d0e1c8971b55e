//! Derived analytics over the combined monthly series.
//!
//! Every view is a pure function of its inputs and is recomputed from
//! scratch on each run.

pub mod dropoff;
pub mod index;
pub mod window;
pub mod yoy;

pub use dropoff::{detect_dropoffs, Metric};
pub use index::normalize_series;
pub use window::{previous_month, recent_rows, totals_by_agency, window_start};
pub use yoy::year_over_year;

use crate::config::AnalyticsConfig;
use crate::models::{ActivitySummary, CombinedSeries, NormalizedRow};
use chrono::NaiveDate;

/// Build the windowed report views.
///
/// Returns `None` for an empty series so callers surface "no data"
/// explicitly.
pub fn summarize(
    series: &CombinedSeries,
    normalized: &[NormalizedRow],
    settings: &AnalyticsConfig,
    today: NaiveDate,
) -> Option<ActivitySummary> {
    if series.is_empty() {
        return None;
    }

    let recent = recent_rows(
        normalized,
        today,
        settings.window_months,
        settings.include_current_month,
    );
    let totals = totals_by_agency(&recent);
    let dropoffs = detect_dropoffs(&recent, settings.dropoff_metric);
    let yoy_month = settings.yoy_month.unwrap_or_else(|| previous_month(today));

    Some(ActivitySummary {
        window_start: window_start(today, settings.window_months),
        window_months: settings.window_months,
        include_current_month: settings.include_current_month,
        recent,
        totals,
        dropoffs,
        year_over_year: year_over_year(series, yoy_month, settings.yoy_years),
    })
}
