//! HTML pages scraped for date-bearing text.

use super::http::Fetch;
use super::retry::{with_retry, RetryPolicy};
use crate::models::{AgencyId, RawRecord};
use futures::stream::{self, LocalBoxStream, StreamExt};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info};

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<(script|style)\b.*?</(?:script|style)>").unwrap());
static SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Extracts dates from one or more pages with a source-specific pattern.
///
/// The pattern's `date` capture group (or the whole match, if there is no
/// such group) becomes the record's timestamp text. Scopes narrow the page
/// first: each one is matched inside the fragments kept by the previous
/// one, and only the visible text of the innermost fragments is searched.
#[derive(Debug, Clone)]
pub struct ScrapeAdapter {
    pub agency: AgencyId,
    pub pages: Vec<String>,
    pub pattern: Regex,
    pub scopes: Vec<Regex>,
}

impl ScrapeAdapter {
    pub fn new(agency: AgencyId, pages: Vec<String>, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            agency,
            pages,
            pattern: Regex::new(pattern)?,
            scopes: Vec::new(),
        })
    }

    /// Restrict matching to HTML fragments matched by `scope`.
    pub fn within(mut self, scope: &str) -> Result<Self, regex::Error> {
        self.scopes.push(Regex::new(scope)?);
        Ok(self)
    }

    pub fn records<'a, F: Fetch>(
        &'a self,
        fetcher: &'a F,
        retry: &'a RetryPolicy,
    ) -> LocalBoxStream<'a, RawRecord> {
        stream::iter(&self.pages)
            .then(move |page| async move {
                let label = format!("{} page {}", self.agency, page);
                let body = with_retry(retry, &label, || fetcher.get(page, &[])).await;
                let dates = body.map(|html| self.extract_dates(&html)).unwrap_or_default();
                info!("{}: {} dates matched on {}", self.agency, dates.len(), page);
                stream::iter(dates.into_iter().map(move |date| RawRecord::dated(self.agency, date)))
            })
            .flatten()
            .boxed_local()
    }

    /// Every match of the pattern in the page's visible text.
    pub fn extract_dates(&self, html: &str) -> Vec<String> {
        let mut fragments = vec![html];
        for scope in &self.scopes {
            fragments = fragments
                .into_iter()
                .flat_map(|fragment| scope.find_iter(fragment).map(|m| m.as_str()))
                .collect();
        }

        let dates: Vec<String> = fragments
            .into_iter()
            .flat_map(|fragment| {
                let text = visible_text(fragment);
                self.pattern
                    .captures_iter(&text)
                    .filter_map(|caps| caps.name("date").or_else(|| caps.get(0)))
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|date| !date.is_empty())
                    .collect::<Vec<_>>()
            })
            .collect();
        debug!("{} pattern matches", dates.len());
        dates
    }
}

/// Tag-free page text with whitespace collapsed.
fn visible_text(html: &str) -> String {
    let without_code = SCRIPT.replace_all(html, " ");
    let without_tags = TAG.replace_all(&without_code, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&#160;", " ")
        .replace("&amp;", "&");
    SPACE.replace_all(&decoded, " ").into_owned()
}
