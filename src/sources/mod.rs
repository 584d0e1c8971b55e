//! Source adapters that turn upstream catalogs, feeds and pages into
//! raw dated records.
//!
//! Every source kind yields the same thing: a lazy, finite stream of
//! [`RawRecord`]s for one agency. Fetch failures are absorbed here (retried,
//! then skipped) so one bad upstream never aborts the run.

pub mod feed;
pub mod http;
pub mod metadata;
pub mod paginated;
pub mod registry;
pub mod retry;
pub mod scrape;

pub use feed::FeedAdapter;
pub use http::{Fetch, HttpFetcher};
pub use metadata::MetadataApiAdapter;
pub use paginated::PaginatedSearchAdapter;
pub use registry::sources_for;
pub use retry::RetryPolicy;
pub use scrape::ScrapeAdapter;

use crate::models::{AgencyId, RawRecord};
use futures::stream::LocalBoxStream;

/// One upstream source of records for an agency.
#[derive(Debug, Clone)]
pub enum SourceAdapter {
    MetadataApi(MetadataApiAdapter),
    PaginatedSearch(PaginatedSearchAdapter),
    Feed(FeedAdapter),
    Scrape(ScrapeAdapter),
}

impl SourceAdapter {
    pub fn agency(&self) -> AgencyId {
        match self {
            SourceAdapter::MetadataApi(a) => a.agency,
            SourceAdapter::PaginatedSearch(a) => a.agency,
            SourceAdapter::Feed(a) => a.agency,
            SourceAdapter::Scrape(a) => a.agency,
        }
    }

    /// Short name of the source kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceAdapter::MetadataApi(_) => "metadata",
            SourceAdapter::PaginatedSearch(_) => "search",
            SourceAdapter::Feed(_) => "feed",
            SourceAdapter::Scrape(_) => "scrape",
        }
    }

    /// Yield the records of this source.
    ///
    /// `start_year` is pushed upstream where the source supports filtering;
    /// the normalizer enforces it regardless.
    pub fn records<'a, F: Fetch>(
        &'a self,
        fetcher: &'a F,
        retry: &'a RetryPolicy,
        start_year: i32,
    ) -> LocalBoxStream<'a, RawRecord> {
        match self {
            SourceAdapter::MetadataApi(a) => a.records(fetcher, retry),
            SourceAdapter::PaginatedSearch(a) => a.records(fetcher, retry, start_year),
            SourceAdapter::Feed(a) => a.records(fetcher, retry),
            SourceAdapter::Scrape(a) => a.records(fetcher, retry),
        }
    }
}
