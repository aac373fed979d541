//! Search result extraction
//!
//! Two sources: the JSON autocomplete endpoint (primary) and the HTML
//! search page (fallback). Both produce the same `SearchResultItem`.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{collapsed_text, json_text};
use crate::constants::endpoints::normalize_url;

/// Upper bound on results from either source
pub const MAX_RESULTS: usize = 20;

static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());

/// Which catalogue a search targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    #[default]
    Movie,
    Tv,
}

impl SearchKind {
    /// Array in the autocomplete payload holding this kind
    fn autocomplete_key(self) -> &'static str {
        match self {
            SearchKind::Movie => "movies",
            SearchKind::Tv => "tvSeries",
        }
    }

    fn year_key(self) -> &'static str {
        match self {
            SearchKind::Movie => "year",
            SearchKind::Tv => "startYear",
        }
    }

    /// Link path prefix identifying this kind on the search page
    pub fn path_prefix(self) -> &'static str {
        match self {
            SearchKind::Movie => "/m/",
            SearchKind::Tv => "/tv/",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SearchKind::Movie => "movie",
            SearchKind::Tv => "tv",
        }
    }
}

/// One search hit
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    /// Title, with " (year)" appended when the year is known
    pub name: String,
    /// Absolute detail page URL
    pub url: String,
    /// Poster URL, empty when unknown
    pub image: String,
    /// Release or start year, empty when unknown
    pub year: String,
}

impl SearchResultItem {
    fn new(title: &str, url: String, image: String, year: String) -> Self {
        let name = if year.is_empty() {
            title.to_string()
        } else {
            format!("{} ({})", title, year)
        };
        Self {
            name,
            url,
            image,
            year,
        }
    }
}

/// Parse the autocomplete JSON payload
///
/// Malformed JSON is an error so the caller can fall back to the HTML
/// page. Entries without a name or URL are dropped.
pub fn parse_autocomplete(
    json: &str,
    kind: SearchKind,
    base_url: &str,
) -> Result<Vec<SearchResultItem>, serde_json::Error> {
    let data: Value = serde_json::from_str(json)?;

    let entries = data
        .get(kind.autocomplete_key())
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let results = entries
        .iter()
        .filter_map(|entry| {
            let name = json_text(entry.get("name"));
            let url = normalize_url(base_url, &json_text(entry.get("url")))?;
            if name.is_empty() {
                return None;
            }
            Some(SearchResultItem::new(
                &name,
                url,
                json_text(entry.get("image")),
                json_text(entry.get(kind.year_key())),
            ))
        })
        .take(MAX_RESULTS)
        .collect();

    Ok(results)
}

/// Parse the HTML search page
///
/// Each `<search-results-item>` block is kept only when its link points at
/// the requested kind and a title can be found.
pub fn parse_search_page(html: &str, kind: SearchKind, base_url: &str) -> Vec<SearchResultItem> {
    let document = Html::parse_document(html);

    let block_selector = Selector::parse("search-results-item").unwrap();
    let link_selector = Selector::parse("[href]").unwrap();
    let title_selector = Selector::parse(r#"[slot="title"]"#).unwrap();
    let image_selector = Selector::parse("img[src]").unwrap();

    let mut results = Vec::new();

    for block in document.select(&block_selector) {
        let href = block
            .select(&link_selector)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::trim)
            .unwrap_or_default();

        if href.is_empty() || !link_path(href).starts_with(kind.path_prefix()) {
            continue;
        }

        let title = block
            .select(&title_selector)
            .map(collapsed_text)
            .find(|t| !t.is_empty())
            .unwrap_or_default();
        if title.is_empty() {
            continue;
        }

        // Attribute first, then any plausible year anywhere in the block
        let year = ["releaseyear", "startyear"]
            .iter()
            .filter_map(|attr| block.value().attr(attr))
            .map(str::trim)
            .find(|y| YEAR_RE.is_match(y))
            .map(str::to_string)
            .or_else(|| {
                YEAR_RE
                    .captures(&block.html())
                    .map(|caps| caps[1].to_string())
            })
            .unwrap_or_default();

        let image = block
            .select(&image_selector)
            .next()
            .and_then(|el| el.value().attr("src"))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        let Some(url) = normalize_url(base_url, href) else {
            continue;
        };

        results.push(SearchResultItem::new(&title, url, image, year));

        if results.len() == MAX_RESULTS {
            break;
        }
    }

    results
}

/// Path component of a link, whether absolute or site-relative
fn link_path(href: &str) -> &str {
    match href.find("://") {
        Some(scheme_end) => {
            let rest = &href[scheme_end + 3..];
            rest.find('/').map(|i| &rest[i..]).unwrap_or("/")
        }
        None => href,
    }
}
