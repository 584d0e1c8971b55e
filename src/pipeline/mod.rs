//! Ingestion pipeline: records to daily counts to monthly totals, and the
//! tolerant merge of every agency's monthly series.

pub mod aggregator;
pub mod combiner;
pub mod normalizer;

pub use aggregator::{aggregate_monthly, total_count};
pub use combiner::combine_agencies;
pub use normalizer::{NormalizeStats, RecordNormalizer};

use crate::models::{AgencyId, CombinedSeries, MonthlyCount, RawRecord};
use crate::sources::{Fetch, RetryPolicy, SourceAdapter};
use crate::store::ArtifactStore;
use anyhow::Result;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

/// Outcome of ingesting one agency.
#[derive(Debug, Clone)]
pub struct AgencyRun {
    pub agency: AgencyId,
    pub stats: NormalizeStats,
    pub monthly: Vec<MonthlyCount>,
}

impl AgencyRun {
    pub fn has_data(&self) -> bool {
        !self.monthly.is_empty()
    }
}

/// Fetch, normalize and persist one agency.
///
/// All of the agency's sources are pooled into one record stream. An agency
/// that yields nothing has its stale artifacts removed so it is absent from
/// this run's combined output.
pub async fn ingest_agency<F: Fetch>(
    agency: AgencyId,
    sources: &[SourceAdapter],
    fetcher: &F,
    retry: &RetryPolicy,
    start_year: i32,
    store: &ArtifactStore,
) -> Result<AgencyRun> {
    let records: Vec<RawRecord> = stream::iter(sources)
        .flat_map(|source| {
            debug!("{}: reading {} source", source.agency(), source.kind());
            source.records(fetcher, retry, start_year)
        })
        .collect()
        .await;

    let (daily, stats) = RecordNormalizer::new(start_year).normalize(records);
    info!(
        "{}: {} records received, {} kept ({} unparseable, {} before {}, {} duplicates)",
        agency,
        stats.received,
        stats.kept,
        stats.unparseable,
        stats.before_start_year,
        start_year,
        stats.duplicates
    );

    if daily.is_empty() {
        warn!("{}: no usable records this run", agency);
        store.remove_agency(agency)?;
        return Ok(AgencyRun {
            agency,
            stats,
            monthly: Vec::new(),
        });
    }

    store.write_daily(agency, &daily)?;
    let monthly = aggregate_monthly(&daily);
    store.write_monthly(agency, &monthly)?;
    info!(
        "{}: {} datasets across {} months",
        agency,
        total_count(&monthly),
        monthly.len()
    );

    Ok(AgencyRun {
        agency,
        stats,
        monthly,
    })
}

/// Combine every agency's monthly artifact currently on disk.
///
/// Unreadable artifacts count as missing input.
pub fn combine_from_store(store: &ArtifactStore) -> CombinedSeries {
    let inputs = AgencyId::ALL
        .into_iter()
        .map(|agency| {
            let counts = store.read_monthly(agency).unwrap_or_else(|e| {
                warn!("{}: could not read monthly artifact: {:#}", agency, e);
                None
            });
            (agency, counts)
        })
        .collect();

    combine_agencies(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::FakeFetcher;
    use crate::sources::{FeedAdapter, PaginatedSearchAdapter};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const SEARCH: &str = "https://catalog.test/api/3/action/package_search";

    fn search_source(agency: AgencyId) -> SourceAdapter {
        SourceAdapter::PaginatedSearch(PaginatedSearchAdapter {
            agency,
            search_url: SEARCH.to_string(),
            organization: agency.file_stem(),
            page_size: 2,
            throttle: None,
            max_skipped_batches: 2,
        })
    }

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_dedups_overlapping_pages() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let fetcher = FakeFetcher::new();
        fetcher.respond(
            &format!("{}?start=0", SEARCH),
            r#"{"result": {"results": [
                {"id": "a", "metadata_created": "2021-01-05T00:00:00"},
                {"id": "b", "metadata_created": "2021-01-20T00:00:00"}]}}"#,
        );
        // upstream re-sorted between requests: "b" shows up again
        fetcher.respond(
            &format!("{}?start=2", SEARCH),
            r#"{"result": {"results": [
                {"id": "b", "metadata_created": "2021-01-20T00:00:00"},
                {"id": "c", "metadata_created": "2008-02-01T00:00:00"},
                {"id": "d", "metadata_created": "2021-03-01T00:00:00"}]}}"#,
        );
        fetcher.respond(&format!("{}?start=5", SEARCH), r#"{"result": {"results": []}}"#);

        let run = ingest_agency(
            AgencyId::Epa,
            &[search_source(AgencyId::Epa)],
            &fetcher,
            &RetryPolicy::immediate(1),
            2010,
            &store,
        )
        .await
        .unwrap();

        assert_eq!(run.stats.duplicates, 1);
        assert_eq!(run.stats.before_start_year, 1);
        assert_eq!(
            run.monthly,
            vec![
                MonthlyCount { month: month(2021, 1), agency: AgencyId::Epa, count: 2 },
                MonthlyCount { month: month(2021, 3), agency: AgencyId::Epa, count: 1 },
            ]
        );
        assert!(store.daily_path(AgencyId::Epa).exists());
        assert_eq!(store.read_monthly(AgencyId::Epa).unwrap(), Some(run.monthly));
    }

    #[tokio::test]
    async fn test_pooled_sources_for_one_agency() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        let fetcher = FakeFetcher::new();
        fetcher.respond(
            "https://feeds.test/one.rss",
            "<rss><item><pubDate>Mon, 04 Mar 2024 10:00:00 GMT</pubDate></item></rss>",
        );
        fetcher.respond(
            "https://feeds.test/two.rss",
            "<rss><item><pubDate>Tue, 05 Mar 2024 10:00:00 GMT</pubDate></item>\
             <item><pubDate>broken</pubDate></item></rss>",
        );
        let feed = |url: &str| {
            SourceAdapter::Feed(FeedAdapter {
                agency: AgencyId::Cdc,
                url: url.to_string(),
            })
        };

        let run = ingest_agency(
            AgencyId::Cdc,
            &[feed("https://feeds.test/one.rss"), feed("https://feeds.test/two.rss")],
            &fetcher,
            &RetryPolicy::immediate(1),
            2010,
            &store,
        )
        .await
        .unwrap();

        assert_eq!(run.stats.unparseable, 1);
        assert_eq!(
            run.monthly,
            vec![MonthlyCount { month: month(2024, 3), agency: AgencyId::Cdc, count: 2 }]
        );
    }

    #[tokio::test]
    async fn test_agency_without_data_is_removed() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        store
            .write_monthly(
                AgencyId::Nsf,
                &[MonthlyCount { month: month(2020, 1), agency: AgencyId::Nsf, count: 1 }],
            )
            .unwrap();
        let fetcher = FakeFetcher::new();

        let run = ingest_agency(
            AgencyId::Nsf,
            &[search_source(AgencyId::Nsf)],
            &fetcher,
            &RetryPolicy::immediate(1),
            2010,
            &store,
        )
        .await
        .unwrap();

        assert!(!run.has_data());
        assert_eq!(store.read_monthly(AgencyId::Nsf).unwrap(), None);
    }

    #[test]
    fn test_combine_from_store_skips_missing_agencies() {
        let dir = TempDir::new().unwrap();
        let store = ArtifactStore::new(dir.path());
        store
            .write_monthly(
                AgencyId::Doj,
                &[MonthlyCount { month: month(2023, 5), agency: AgencyId::Doj, count: 4 }],
            )
            .unwrap();
        store
            .write_monthly(
                AgencyId::Usda,
                &[MonthlyCount { month: month(2023, 4), agency: AgencyId::Usda, count: 9 }],
            )
            .unwrap();

        let combined = combine_from_store(&store);

        assert_eq!(combined.agencies(), vec![AgencyId::Doj, AgencyId::Usda]);
        assert_eq!(combined.rows()[0].agency, AgencyId::Usda);
    }

    #[test]
    fn test_combine_from_empty_store() {
        let dir = TempDir::new().unwrap();
        assert!(combine_from_store(&ArtifactStore::new(dir.path())).is_empty());
    }
}
