//! Single bulk metadata endpoint (Socrata `api/views/metadata/v1`).

use super::http::{Fetch, FetchError};
use super::retry::{with_retry, RetryPolicy};
use crate::models::{AgencyId, RawRecord};
use chrono::DateTime;
use futures::stream::{self, LocalBoxStream, StreamExt};
use serde_json::Value;
use tracing::info;

/// Fetches the whole catalog in one request.
#[derive(Debug, Clone)]
pub struct MetadataApiAdapter {
    pub agency: AgencyId,
    pub url: String,
    /// Item field holding the creation timestamp.
    pub timestamp_field: String,
}

impl MetadataApiAdapter {
    pub fn records<'a, F: Fetch>(
        &'a self,
        fetcher: &'a F,
        retry: &'a RetryPolicy,
    ) -> LocalBoxStream<'a, RawRecord> {
        stream::once(async move {
            let label = format!("{} metadata from {}", self.agency, self.url);
            let records = with_retry(retry, &label, || self.fetch(fetcher))
                .await
                .unwrap_or_default();
            info!("{}: metadata endpoint listed {} items", self.agency, records.len());
            stream::iter(records)
        })
        .flatten()
        .boxed_local()
    }

    async fn fetch<F: Fetch>(&self, fetcher: &F) -> Result<Vec<RawRecord>, FetchError> {
        let body = fetcher.get(&self.url, &[]).await?;
        let items: Vec<Value> =
            serde_json::from_str(&body).map_err(|e| FetchError::decode(&self.url, e))?;

        Ok(items
            .iter()
            .map(|item| RawRecord {
                timestamp: timestamp_text(item.get(&self.timestamp_field)),
                external_id: None,
                agency: self.agency,
            })
            .collect())
    }
}

/// Accepts ISO strings as-is and epoch seconds converted to RFC 3339.
fn timestamp_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => number
            .as_i64()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map(|dt| dt.to_rfc3339()),
        _ => None,
    }
}
