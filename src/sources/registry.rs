//! The fixed set of upstream sources behind each agency.

use super::{FeedAdapter, MetadataApiAdapter, PaginatedSearchAdapter, ScrapeAdapter, SourceAdapter};
use crate::config::{HttpConfig, SourcesConfig};
use crate::models::AgencyId;
use anyhow::{Context, Result};
use std::time::Duration;

/// Release list container on the VSRR page.
const VSRR_SECTION: &str = r#"(?is)<section\b[^>]*class="[^"]*\bcard-body\b[^"]*"[^>]*>.*?</section>"#;

/// Links inside the release list; each one names a release.
const LINK: &str = r"(?is)<a\b[^>]*>.*?</a>";

/// Release dates as printed on NCHS pages, e.g. "March 5, 2024".
const LONG_DATE_PATTERN: &str = r"(?P<date>(?:January|February|March|April|May|June|July|August|September|October|November|December) \d{1,2}, \d{4})";

/// Catalog organization slug for agencies published through the CKAN catalog.
fn catalog_organization(agency: AgencyId) -> Option<&'static str> {
    match agency {
        AgencyId::Cdc => None,
        AgencyId::Doj => Some("doj-gov"),
        AgencyId::Epa => Some("epa-gov"),
        AgencyId::Hhs => Some("hhs-gov"),
        AgencyId::Noaa => Some("noaa-gov"),
        AgencyId::Nsf => Some("nsf-gov"),
        AgencyId::Usda => Some("usda-gov"),
    }
}

/// Agencies whose catalogs are large enough to warrant a pause between batches.
fn is_high_volume(agency: AgencyId) -> bool {
    matches!(agency, AgencyId::Noaa)
}

/// Build the adapters that feed one agency.
pub fn sources_for(
    agency: AgencyId,
    sources: &SourcesConfig,
    http: &HttpConfig,
) -> Result<Vec<SourceAdapter>> {
    if let Some(organization) = catalog_organization(agency) {
        let search_url = format!(
            "{}/api/3/action/package_search",
            sources.catalog_url.trim_end_matches('/')
        );
        let throttle = is_high_volume(agency)
            .then(|| Duration::from_millis(http.rate_limit_ms))
            .filter(|pause| !pause.is_zero());

        return Ok(vec![SourceAdapter::PaginatedSearch(PaginatedSearchAdapter {
            agency,
            search_url,
            organization: organization.to_string(),
            page_size: http.page_size.max(1),
            throttle,
            max_skipped_batches: http.max_skipped_batches.max(1),
        })]);
    }

    let vsrr = ScrapeAdapter::new(agency, vec![sources.vsrr_page_url.clone()], LONG_DATE_PATTERN)
        .and_then(|adapter| adapter.within(VSRR_SECTION))
        .and_then(|adapter| adapter.within(LINK))
        .context("Invalid release-date pattern")?;

    Ok(vec![
        SourceAdapter::MetadataApi(MetadataApiAdapter {
            agency,
            url: sources.cdc_metadata_url.clone(),
            timestamp_field: "createdAt".to_string(),
        }),
        SourceAdapter::Feed(FeedAdapter {
            agency,
            url: sources.mmwr_feed_url.clone(),
        }),
        SourceAdapter::Scrape(vsrr),
    ])
}
