//! Site client: cache-first fetching plus the extractor entry points
//!
//! `SiteClient` is what the HTTP layer talks to. Every method is blocking
//! and is meant to run on a worker thread.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{DiskCache, ImageKind};
use crate::config::Config;
use crate::constants::endpoints;
use crate::parser::{
    parse_autocomplete, parse_browse_list, parse_celebrity, parse_detail, parse_search_page,
    BrowseItem, CelebrityRecord, DetailRecord, SearchKind, SearchResultItem,
};
use crate::scraper::{decode_lossy, Fetch, ScraperError};

/// Timeout for backdrops and portraits, which tend to be large
const LARGE_IMAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Blocking client for the review site
pub struct SiteClient {
    fetcher: Arc<dyn Fetch>,
    cache: DiskCache,
    base_url: String,
    page_ttl_secs: u64,
    detail_ttl_secs: u64,
    http_timeout: Duration,
    search_timeout: Duration,
}

impl SiteClient {
    pub fn new(fetcher: Arc<dyn Fetch>, cache: DiskCache, config: &Config) -> Self {
        Self {
            fetcher,
            cache,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_ttl_secs: config.page_ttl_secs,
            detail_ttl_secs: config.detail_ttl_secs,
            http_timeout: config.http_timeout(),
            search_timeout: config.search_timeout(),
        }
    }

    pub fn cache(&self) -> &DiskCache {
        &self.cache
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Cache-first page fetch
    ///
    /// A fresh cache entry short-circuits the network. A successful fetch is
    /// written back before decoding.
    pub fn fetch_page(
        &self,
        url: &str,
        ttl_secs: u64,
        timeout: Duration,
    ) -> Result<String, ScraperError> {
        if let Some(bytes) = self.cache.get(url, ttl_secs) {
            return Ok(decode_lossy(&bytes));
        }

        debug!("Fetching {}", url);
        let bytes = self.fetcher.fetch(url, timeout)?;
        self.cache.put(url, &bytes);
        Ok(decode_lossy(&bytes))
    }

    /// Search movies or TV series
    ///
    /// The autocomplete endpoint is tried first. A failure or an empty
    /// result falls back to the HTML search page. Never fails: the worst
    /// case is an empty list.
    pub fn search(&self, query: &str, kind: SearchKind) -> Vec<SearchResultItem> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        match self.search_autocomplete(query, kind) {
            Ok(results) if !results.is_empty() => {
                info!("Search '{}' ({}): {} results", query, kind.as_str(), results.len());
                return results;
            }
            Ok(_) => debug!("Autocomplete had no {} results for '{}'", kind.as_str(), query),
            Err(e) => warn!("Autocomplete failed for '{}': {}", query, e),
        }

        let results = self.search_fallback(query, kind);
        info!(
            "Search fallback '{}' ({}): {} results",
            query,
            kind.as_str(),
            results.len()
        );
        results
    }

    fn search_autocomplete(
        &self,
        query: &str,
        kind: SearchKind,
    ) -> Result<Vec<SearchResultItem>, ScraperError> {
        let url = endpoints::autocomplete(&self.base_url, query);
        let bytes = self.fetcher.fetch(&url, self.search_timeout)?;
        parse_autocomplete(&decode_lossy(&bytes), kind, &self.base_url)
            .map_err(|e| ScraperError::ResponseError(e.to_string()))
    }

    fn search_fallback(&self, query: &str, kind: SearchKind) -> Vec<SearchResultItem> {
        let url = endpoints::search_page(&self.base_url, query);
        match self.fetcher.fetch(&url, self.search_timeout) {
            Ok(bytes) => parse_search_page(&decode_lossy(&bytes), kind, &self.base_url),
            Err(e) => {
                warn!("Search page failed for '{}': {}", query, e);
                Vec::new()
            }
        }
    }

    /// Items of a browse/category page
    pub fn browse(&self, url: &str) -> Result<Vec<BrowseItem>, ScraperError> {
        let html = self.fetch_page(url, self.page_ttl_secs, self.http_timeout)?;
        let items = parse_browse_list(&html, &self.base_url);
        info!("Browse {}: {} items", url, items.len());
        Ok(items)
    }

    /// Detail record for a movie or series page
    pub fn detail(&self, url: &str) -> Result<DetailRecord, ScraperError> {
        let html = self.fetch_page(url, self.detail_ttl_secs, self.search_timeout)?;
        Ok(parse_detail(&html))
    }

    /// Celebrity record for a profile page
    pub fn celebrity(&self, url: &str) -> Result<CelebrityRecord, ScraperError> {
        let html = self.fetch_page(url, self.page_ttl_secs, self.search_timeout)?;
        Ok(parse_celebrity(&html))
    }

    /// Celebrity record for a display name, via its slugged profile URL
    pub fn celebrity_by_name(&self, name: &str) -> Result<CelebrityRecord, ScraperError> {
        self.celebrity(&endpoints::celebrity(&self.base_url, name))
    }

    /// Image bytes, from the image cache when present
    ///
    /// Images never expire.
    pub fn image(&self, url: &str, kind: ImageKind) -> Result<Vec<u8>, ScraperError> {
        if let Some(bytes) = self.cache.get_image(url, kind) {
            return Ok(bytes);
        }

        let timeout = match kind {
            ImageKind::Poster => self.http_timeout,
            ImageKind::Backdrop | ImageKind::Celebrity => LARGE_IMAGE_TIMEOUT,
        };
        let bytes = self.fetcher.fetch(url, timeout)?;
        self.cache.put_image(url, kind, &bytes);
        Ok(bytes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use tempfile::TempDir;

    use crate::config::Toggles;

    /// Canned responses keyed by URL; unknown URLs answer 404
    #[derive(Default)]
    pub(crate) struct StubFetcher {
        responses: HashMap<String, Result<Vec<u8>, u16>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub(crate) fn with(mut self, url: impl Into<String>, body: &str) -> Self {
            self.responses.insert(url.into(), Ok(body.as_bytes().to_vec()));
            self
        }

        pub(crate) fn failing(mut self, url: impl Into<String>, status: u16) -> Self {
            self.responses.insert(url.into(), Err(status));
            self
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Fetch for StubFetcher {
        fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>, ScraperError> {
            self.calls.lock().unwrap().push(url.to_string());
            match self.responses.get(url) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(status)) => Err(ScraperError::HttpError(*status)),
                None => Err(ScraperError::HttpError(404)),
            }
        }
    }

    pub(crate) const BASE: &str = "https://www.rottentomatoes.com";

    pub(crate) fn client_with(stub: Arc<StubFetcher>, dir: &TempDir, toggles: Arc<Toggles>) -> SiteClient {
        let cache = DiskCache::new(dir.path(), toggles);
        SiteClient::new(stub, cache, &Config::default())
    }

    const BROWSE_HTML: &str = r#"<html><head><script type="application/ld+json">
        {"@type":"ItemList","itemListElement":[{"name":"X","url":"/m/x","image":"i.jpg"}]}
        </script></head></html>"#;

    #[test]
    fn test_browse_via_stubbed_fetch() {
        let dir = TempDir::new().unwrap();
        let url = format!("{}/browse/movies_in_theaters/", BASE);
        let stub = Arc::new(StubFetcher::default().with(url.clone(), BROWSE_HTML));
        let client = client_with(stub, &dir, Arc::new(Toggles::default()));

        let items = client.browse(&url).unwrap();
        assert_eq!(
            items,
            vec![BrowseItem {
                name: "X".to_string(),
                url: format!("{}/m/x", BASE),
                image: "i.jpg".to_string(),
            }]
        );
    }

    #[test]
    fn test_browse_is_cache_first() {
        let dir = TempDir::new().unwrap();
        let url = format!("{}/browse/tv_series_browse/", BASE);
        let stub = Arc::new(StubFetcher::default().with(url.clone(), BROWSE_HTML));
        let client = client_with(stub.clone(), &dir, Arc::new(Toggles::default()));

        let first = client.browse(&url).unwrap();
        let second = client.browse(&url).unwrap();
        assert_eq!(first, second);
        assert_eq!(stub.calls(), vec![url]);
    }

    #[test]
    fn test_cache_disabled_fetches_every_time() {
        let dir = TempDir::new().unwrap();
        let url = format!("{}/browse/movies_at_home/", BASE);
        let stub = Arc::new(StubFetcher::default().with(url.clone(), BROWSE_HTML));
        let client = client_with(stub.clone(), &dir, Arc::new(Toggles::new(false, true)));

        client.browse(&url).unwrap();
        client.browse(&url).unwrap();
        assert_eq!(stub.calls().len(), 2);
    }

    #[test]
    fn test_browse_network_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let url = format!("{}/browse/broken/", BASE);
        let stub = Arc::new(StubFetcher::default().failing(url.clone(), 503));
        let client = client_with(stub, &dir, Arc::new(Toggles::default()));

        assert!(matches!(client.browse(&url), Err(ScraperError::HttpError(503))));
    }

    #[test]
    fn test_search_falls_back_when_autocomplete_is_empty() {
        let dir = TempDir::new().unwrap();
        let search_page = r#"
            <search-results-item>
                <a href="/m/heat"><img src="https://img/heat.jpg"></a>
                <span slot="title">Heat</span> 1995
            </search-results-item>
        "#;
        let stub = Arc::new(
            StubFetcher::default()
                .with(endpoints::autocomplete(BASE, "heat"), r#"{"movies": []}"#)
                .with(endpoints::search_page(BASE, "heat"), search_page),
        );
        let client = client_with(stub.clone(), &dir, Arc::new(Toggles::default()));

        let results = client.search("heat", SearchKind::Movie);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Heat (1995)");
        assert_eq!(results[0].url, format!("{}/m/heat", BASE));
        assert_eq!(stub.calls().len(), 2);
    }

    #[test]
    fn test_search_uses_autocomplete_when_it_has_results() {
        let dir = TempDir::new().unwrap();
        let stub = Arc::new(StubFetcher::default().with(
            endpoints::autocomplete(BASE, "severance"),
            r#"{"tvSeries": [{"name": "Severance", "startYear": 2022, "url": "/tv/severance"}]}"#,
        ));
        let client = client_with(stub.clone(), &dir, Arc::new(Toggles::default()));

        let results = client.search("  severance ", SearchKind::Tv);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "Severance (2022)");
        assert_eq!(stub.calls(), vec![endpoints::autocomplete(BASE, "severance")]);
    }

    #[test]
    fn test_search_never_fails() {
        let dir = TempDir::new().unwrap();
        let stub = Arc::new(StubFetcher::default());
        let client = client_with(stub.clone(), &dir, Arc::new(Toggles::default()));

        assert!(client.search("anything", SearchKind::Movie).is_empty());
        assert_eq!(stub.calls().len(), 2);

        assert!(client.search("   ", SearchKind::Movie).is_empty());
        assert_eq!(stub.calls().len(), 2);
    }

    #[test]
    fn test_search_bypasses_cache() {
        let dir = TempDir::new().unwrap();
        let stub = Arc::new(StubFetcher::default().with(
            endpoints::autocomplete(BASE, "alien"),
            r#"{"movies": [{"name": "Alien", "url": "/m/alien"}]}"#,
        ));
        let client = client_with(stub.clone(), &dir, Arc::new(Toggles::default()));

        client.search("alien", SearchKind::Movie);
        client.search("alien", SearchKind::Movie);
        assert_eq!(stub.calls().len(), 2);
    }

    #[test]
    fn test_detail_parses_fetched_page() {
        let dir = TempDir::new().unwrap();
        let url = format!("{}/m/x", BASE);
        let html = r#"<script id="media-scorecard-json" type="application/json">
            {"criticsScore": {"scorePercent": 85}}</script>"#;
        let stub = Arc::new(StubFetcher::default().with(url.clone(), html));
        let client = client_with(stub.clone(), &dir, Arc::new(Toggles::default()));

        assert_eq!(client.detail(&url).unwrap().tomatometer_score, "85");
        assert_eq!(client.detail(&url).unwrap().tomatometer_score, "85");
        assert_eq!(stub.calls().len(), 1);
    }

    #[test]
    fn test_celebrity_by_name_uses_slug_url() {
        let dir = TempDir::new().unwrap();
        let url = format!("{}/celebrity/jane_doe", BASE);
        let stub = Arc::new(StubFetcher::default().with(
            url.clone(),
            r#"<meta property="og:title" content="Jane Doe | Rotten Tomatoes">"#,
        ));
        let client = client_with(stub.clone(), &dir, Arc::new(Toggles::default()));

        let celeb = client.celebrity_by_name("Jane Doe").unwrap();
        assert_eq!(celeb.name, "Jane Doe");
        assert_eq!(stub.calls(), vec![url]);
    }

    #[test]
    fn test_image_is_fetched_once() {
        let dir = TempDir::new().unwrap();
        let url = "https://img.example.com/poster.jpg";
        let stub = Arc::new(StubFetcher::default().with(url, "JPEGDATA"));
        let client = client_with(stub.clone(), &dir, Arc::new(Toggles::default()));

        assert_eq!(client.image(url, ImageKind::Poster).unwrap(), b"JPEGDATA");
        assert_eq!(client.image(url, ImageKind::Poster).unwrap(), b"JPEGDATA");
        assert_eq!(stub.calls().len(), 1);
        assert!(client.cache().image_path(url, ImageKind::Poster).exists());
    }
}
