//! Auto-search from the currently airing program's EPG title

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::client::SiteClient;
use crate::config::Toggles;
use crate::parser::{SearchKind, SearchResultItem};

/// " (2023)" style year groups
static YEAR_GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(\d{4}\)").unwrap());

/// " - Part 1" style suffixes; a bare hyphen inside a word is kept
static DASH_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+[-\u{2013}\u{2014}]\s*.*$").unwrap());

/// Outcome of an EPG-triggered search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EpgMatch {
    /// Cleaned title that was searched
    pub query: String,
    /// Catalogue the results came from
    pub kind: SearchKind,
    /// First entry is the auto-selected item
    pub results: Vec<SearchResultItem>,
}

/// Strip year groups and episode/part suffixes from an EPG event name
pub fn clean_title(event_name: &str) -> String {
    let without_year = YEAR_GROUP_RE.replace_all(event_name, "");
    DASH_SUFFIX_RE
        .replace(&without_year, "")
        .trim()
        .to_string()
}

/// Search the site for an EPG event, movies first, then TV
///
/// `None` when auto-search is switched off or nothing searchable remains
/// after cleaning.
pub fn auto_search(client: &SiteClient, toggles: &Toggles, event_title: &str) -> Option<EpgMatch> {
    if !toggles.auto_epg() {
        tracing::debug!("Auto EPG search disabled, ignoring '{}'", event_title);
        return None;
    }

    let query = clean_title(event_title);
    if query.is_empty() {
        return None;
    }

    tracing::info!("EPG search: {}", query);

    let movies = client.search(&query, SearchKind::Movie);
    if !movies.is_empty() {
        return Some(EpgMatch {
            query,
            kind: SearchKind::Movie,
            results: movies,
        });
    }

    let shows = client.search(&query, SearchKind::Tv);
    Some(EpgMatch {
        query,
        kind: SearchKind::Tv,
        results: shows,
    })
}
