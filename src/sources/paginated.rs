//! Paginated catalog search (CKAN `package_search`).

use super::http::{Fetch, FetchError};
use super::retry::{with_retry, RetryPolicy};
use crate::models::{AgencyId, RawRecord};
use futures::stream::{self, LocalBoxStream, StreamExt};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Walks a search endpoint page by page, in increasing offset order.
#[derive(Debug, Clone)]
pub struct PaginatedSearchAdapter {
    pub agency: AgencyId,
    /// Full URL of the search action.
    pub search_url: String,
    /// Catalog organization slug, e.g. `epa-gov`.
    pub organization: String,
    pub page_size: usize,
    /// Pause between successful batches for high-volume sources.
    pub throttle: Option<Duration>,
    /// Consecutive abandoned batches after which the walk stops.
    pub max_skipped_batches: u32,
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(default)]
    result: SearchResult,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    results: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    metadata_created: Option<String>,
}

/// Where the walk stands between pages.
#[derive(Debug, Clone, Copy, Default)]
struct PageCursor {
    offset: usize,
    total: Option<usize>,
    skipped: u32,
    pause_before_next: bool,
    finished: bool,
}

impl PaginatedSearchAdapter {
    /// Stream every result as a record, fetching pages lazily.
    pub fn records<'a, F: Fetch>(
        &'a self,
        fetcher: &'a F,
        retry: &'a RetryPolicy,
        start_year: i32,
    ) -> LocalBoxStream<'a, RawRecord> {
        stream::unfold(PageCursor::default(), move |cursor| async move {
            let (batch, next) = self.next_page(fetcher, retry, start_year, cursor).await?;
            Some((stream::iter(batch), next))
        })
        .flatten()
        .boxed_local()
    }

    async fn next_page<F: Fetch>(
        &self,
        fetcher: &F,
        retry: &RetryPolicy,
        start_year: i32,
        mut cursor: PageCursor,
    ) -> Option<(Vec<RawRecord>, PageCursor)> {
        loop {
            if cursor.finished {
                return None;
            }
            if cursor.total.is_some_and(|total| cursor.offset >= total) {
                debug!("{}: reached reported total at offset {}", self.agency, cursor.offset);
                return None;
            }
            if cursor.pause_before_next {
                if let Some(pause) = self.throttle {
                    tokio::time::sleep(pause).await;
                }
            }

            let offset = cursor.offset;
            let label = format!("{} batch at start={}", self.agency, offset);
            let page = with_retry(retry, &label, || self.fetch_page(fetcher, offset, start_year)).await;

            let Some(page) = page else {
                cursor.skipped += 1;
                cursor.offset += self.page_size;
                cursor.pause_before_next = false;
                if cursor.skipped >= self.max_skipped_batches {
                    warn!(
                        "{}: giving up after {} consecutive skipped batches; keeping partial result",
                        self.agency, cursor.skipped
                    );
                    return None;
                }
                continue;
            };

            if let Some(count) = page.count {
                cursor.total = Some(count);
            }

            let returned = page.results.len();
            if returned == 0 {
                info!("{}: no more results after offset {}", self.agency, offset);
                return None;
            }

            cursor.skipped = 0;
            cursor.offset += returned;
            cursor.pause_before_next = true;
            if returned < self.page_size {
                cursor.finished = true;
            }

            match cursor.total {
                Some(total) => debug!("{}: fetched {} / {}", self.agency, cursor.offset, total),
                None => debug!("{}: fetched {}", self.agency, cursor.offset),
            }

            let agency = self.agency;
            let records = page
                .results
                .into_iter()
                .map(|item| RawRecord {
                    timestamp: item.metadata_created,
                    external_id: item.id,
                    agency,
                })
                .collect();
            return Some((records, cursor));
        }
    }

    async fn fetch_page<F: Fetch>(
        &self,
        fetcher: &F,
        offset: usize,
        start_year: i32,
    ) -> Result<SearchResult, FetchError> {
        let query = [
            (
                "fq",
                format!(
                    "organization:{} AND metadata_created:[{}-01-01T00:00:00Z TO *]",
                    self.organization, start_year
                ),
            ),
            ("rows", self.page_size.to_string()),
            ("start", offset.to_string()),
        ];

        let body = fetcher.get(&self.search_url, &query).await?;
        let envelope: SearchEnvelope =
            serde_json::from_str(&body).map_err(|e| FetchError::decode(&self.search_url, e))?;
        Ok(envelope.result)
    }
}
