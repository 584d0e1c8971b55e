//! Raw records to canonical daily counts.

use crate::models::{AgencyId, DailyCount, RawRecord};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashSet};

/// Counts of records removed at each normalization step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeStats {
    pub received: usize,
    pub unparseable: usize,
    pub before_start_year: usize,
    pub duplicates: usize,
    pub kept: usize,
}

/// Parses, filters and deduplicates raw records into daily counts.
#[derive(Debug, Clone, Copy)]
pub struct RecordNormalizer {
    start_year: i32,
}

impl RecordNormalizer {
    pub fn new(start_year: i32) -> Self {
        Self { start_year }
    }

    /// Normalize one agency's records.
    ///
    /// Steps run in order: drop unparseable timestamps, drop dates before
    /// the start year, drop repeated external ids (first occurrence wins),
    /// then count per (date, agency). Output is sorted by date and every
    /// count is at least one.
    pub fn normalize<I>(&self, records: I) -> (Vec<DailyCount>, NormalizeStats)
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut stats = NormalizeStats::default();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut counts: BTreeMap<(NaiveDate, AgencyId), u64> = BTreeMap::new();

        for record in records {
            stats.received += 1;

            let Some(date) = record.timestamp.as_deref().and_then(parse_timestamp) else {
                stats.unparseable += 1;
                continue;
            };

            if date.year() < self.start_year {
                stats.before_start_year += 1;
                continue;
            }

            if let Some(id) = record.external_id {
                if !seen_ids.insert(id) {
                    stats.duplicates += 1;
                    continue;
                }
            }

            stats.kept += 1;
            *counts.entry((date, record.agency)).or_insert(0) += 1;
        }

        let daily = counts
            .into_iter()
            .map(|((date, agency), count)| DailyCount {
                date,
                agency,
                count,
            })
            .collect();

        (daily, stats)
    }
}

/// Calendar date of a timestamp in any of the forms sources publish.
///
/// Offset-aware timestamps are converted to UTC first; naive ones are
/// taken as-is.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }

    NaiveDate::parse_from_str(raw, "%B %d, %Y").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(ts: &str, id: Option<&str>) -> RawRecord {
        RawRecord {
            timestamp: Some(ts.to_string()),
            external_id: id.map(String::from),
            agency: AgencyId::Epa,
        }
    }

    #[test]
    fn test_parse_timestamp_forms() {
        assert_eq!(parse_timestamp("2021-04-05T06:07:08.000Z"), Some(date(2021, 4, 5)));
        assert_eq!(parse_timestamp("2021-04-05T23:30:00-05:00"), Some(date(2021, 4, 6)));
        assert_eq!(parse_timestamp("2016-03-04T12:34:56.123456"), Some(date(2016, 3, 4)));
        assert_eq!(parse_timestamp("2016-03-04T12:34:56"), Some(date(2016, 3, 4)));
        assert_eq!(parse_timestamp("2016-03-04 12:34:56"), Some(date(2016, 3, 4)));
        assert_eq!(parse_timestamp("2016-03-04"), Some(date(2016, 3, 4)));
        assert_eq!(
            parse_timestamp("Fri, 15 Mar 2024 09:30:00 GMT"),
            Some(date(2024, 3, 15))
        );
        assert_eq!(parse_timestamp("March 5, 2024"), Some(date(2024, 3, 5)));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("February 30, 2024"), None);
        assert_eq!(parse_timestamp("2024-13-01"), None);
    }

    #[test]
    fn test_drops_unparseable_and_missing() {
        let records = vec![
            record("2020-01-01T00:00:00", None),
            record("garbage", None),
            RawRecord {
                timestamp: None,
                external_id: None,
                agency: AgencyId::Epa,
            },
        ];

        let (daily, stats) = RecordNormalizer::new(2010).normalize(records);

        assert_eq!(daily.len(), 1);
        assert_eq!(stats.unparseable, 2);
        assert_eq!(stats.kept, 1);
    }

    #[test]
    fn test_applies_start_year_floor() {
        let records = vec![
            record("2009-12-31T23:59:59", None),
            record("2010-01-01T00:00:00", None),
        ];

        let (daily, stats) = RecordNormalizer::new(2010).normalize(records);

        assert_eq!(
            daily,
            vec![DailyCount {
                date: date(2010, 1, 1),
                agency: AgencyId::Epa,
                count: 1
            }]
        );
        assert_eq!(stats.before_start_year, 1);
    }

    #[test]
    fn test_counts_per_date_without_duplicates() {
        let records = vec![
            record("2020-01-01T08:00:00", None),
            record("2020-01-01T09:00:00", None),
            record("2020-01-03T09:00:00", None),
        ];

        let (daily, _) = RecordNormalizer::new(2010).normalize(records);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].count, 2);
        assert_eq!(daily[1].count, 1);
        assert!(daily.iter().all(|d| d.count >= 1));
        let mut keys: Vec<_> = daily.iter().map(|d| (d.date, d.agency)).collect();
        keys.dedup();
        assert_eq!(keys.len(), daily.len());
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let records = vec![
            record("2020-01-01T00:00:00", Some("a")),
            record("2020-02-01T00:00:00", Some("a")),
            record("2020-02-01T00:00:00", Some("b")),
        ];

        let (daily, stats) = RecordNormalizer::new(2010).normalize(records);

        assert_eq!(stats.duplicates, 1);
        assert_eq!(
            daily,
            vec![
                DailyCount { date: date(2020, 1, 1), agency: AgencyId::Epa, count: 1 },
                DailyCount { date: date(2020, 2, 1), agency: AgencyId::Epa, count: 1 },
            ]
        );
    }

    #[test]
    fn test_overlapping_pages_are_idempotent() {
        let page = vec![
            record("2020-01-01T00:00:00", Some("a")),
            record("2020-01-01T00:00:00", Some("b")),
            record("2020-03-01T00:00:00", Some("c")),
        ];
        let normalizer = RecordNormalizer::new(2010);

        let (once, _) = normalizer.normalize(page.clone());
        let (twice, _) = normalizer.normalize(page.iter().cloned().chain(page.iter().cloned()));

        assert_eq!(once, twice);
    }

    #[test]
    fn test_floor_applies_before_dedup() {
        // An id first seen with an out-of-range date still counts when it
        // reappears in range.
        let records = vec![
            record("2005-01-01T00:00:00", Some("a")),
            record("2020-01-01T00:00:00", Some("a")),
        ];

        let (daily, stats) = RecordNormalizer::new(2010).normalize(records);

        assert_eq!(daily.len(), 1);
        assert_eq!(stats.duplicates, 0);
    }
}
