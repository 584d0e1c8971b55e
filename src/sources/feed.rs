//! Syndication feeds (RSS 2.0 and Atom).

use super::http::{Fetch, FetchError};
use super::retry::{with_retry, RetryPolicy};
use crate::models::{AgencyId, RawRecord};
use futures::stream::{self, LocalBoxStream, StreamExt};
use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(item|entry)\b[^>]*>(.*?)</(?:item|entry)>").unwrap()
});

static ENTRY_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(pubDate|published|updated|dc:date)\b[^>]*>(.*?)</(?:pubDate|published|updated|dc:date)>")
        .unwrap()
});

/// Emits one record per feed entry, dated by its publication date.
#[derive(Debug, Clone)]
pub struct FeedAdapter {
    pub agency: AgencyId,
    pub url: String,
}

impl FeedAdapter {
    pub fn records<'a, F: Fetch>(
        &'a self,
        fetcher: &'a F,
        retry: &'a RetryPolicy,
    ) -> LocalBoxStream<'a, RawRecord> {
        stream::once(async move {
            let label = format!("{} feed {}", self.agency, self.url);
            let records = with_retry(retry, &label, || self.fetch(fetcher))
                .await
                .unwrap_or_default();
            info!("{}: feed listed {} entries", self.agency, records.len());
            stream::iter(records)
        })
        .flatten()
        .boxed_local()
    }

    async fn fetch<F: Fetch>(&self, fetcher: &F) -> Result<Vec<RawRecord>, FetchError> {
        let body = fetcher.get(&self.url, &[]).await?;
        Ok(parse_entries(&body)
            .into_iter()
            .map(|timestamp| RawRecord {
                timestamp,
                external_id: None,
                agency: self.agency,
            })
            .collect())
    }
}

/// Publication date text of each entry, `None` for entries without one.
///
/// `published`/`pubDate` win over `updated` when an entry carries both.
pub fn parse_entries(body: &str) -> Vec<Option<String>> {
    ENTRY
        .captures_iter(body)
        .map(|entry| {
            let inner = entry.get(2).map_or("", |m| m.as_str());
            let mut dates: Vec<(String, String)> = ENTRY_DATE
                .captures_iter(inner)
                .map(|c| (c[1].to_lowercase(), unwrap_cdata(&c[2])))
                .collect();
            dates.sort_by_key(|(tag, _)| tag == "updated");
            dates.into_iter().next().map(|(_, text)| text)
        })
        .collect()
}

fn unwrap_cdata(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::FakeFetcher;

    const RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>MMWR</title>
  <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>
  <item><title>Report one</title><pubDate>Thu, 14 Mar 2024 13:00:00 EST</pubDate></item>
  <item><title>Report two</title><pubDate><![CDATA[Fri, 15 Mar 2024 09:30:00 GMT]]></pubDate></item>
  <item><title>Undated</title></item>
</channel></rss>"#;

    #[test]
    fn test_parse_rss_items() {
        let dates = parse_entries(RSS);
        assert_eq!(
            dates,
            vec![
                Some("Thu, 14 Mar 2024 13:00:00 EST".to_string()),
                Some("Fri, 15 Mar 2024 09:30:00 GMT".to_string()),
                None,
            ]
        );
    }

    #[test]
    fn test_parse_atom_prefers_published() {
        let atom = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><updated>2024-02-02T00:00:00Z</updated><published>2024-02-01T00:00:00Z</published></entry>
  <entry><updated>2024-03-01T00:00:00Z</updated></entry>
</feed>"#;
        assert_eq!(
            parse_entries(atom),
            vec![
                Some("2024-02-01T00:00:00Z".to_string()),
                Some("2024-03-01T00:00:00Z".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_feed_records() {
        let fetcher = FakeFetcher::new();
        fetcher.respond("https://feeds.test/mmwr.rss", RSS);

        let adapter = FeedAdapter {
            agency: AgencyId::Cdc,
            url: "https://feeds.test/mmwr.rss".to_string(),
        };
        let retry = RetryPolicy::immediate(3);
        let records: Vec<_> = adapter.records(&fetcher, &retry).collect().await;

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.agency == AgencyId::Cdc));
        assert!(records.iter().all(|r| r.external_id.is_none()));
    }
}
