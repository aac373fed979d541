//! Parser module for extracting structured data from the review site
//!
//! Every parser here is a pure function over page text: no network, no
//! filesystem, no panics on malformed input. Missing markup yields empty
//! strings and empty vectors, never an error.

pub mod browse;
pub mod celebrity;
pub mod detail;
pub mod search;

pub use browse::{parse_browse_list, BrowseItem};
pub use celebrity::{parse_celebrity, CelebrityRecord};
pub use detail::{parse_detail, DetailRecord};
pub use search::{parse_autocomplete, parse_search_page, SearchKind, SearchResultItem};

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;

/// Collect every JSON object embedded in `application/ld+json` blocks
///
/// Top-level arrays and `@graph` containers are flattened. Blocks that do
/// not parse are skipped.
fn json_ld_objects(document: &Html) -> Vec<Value> {
    let script_selector = Selector::parse(r#"script[type="application/ld+json"]"#).unwrap();

    let mut objects = Vec::new();
    for script in document.select(&script_selector) {
        let raw = script.text().collect::<String>();
        let data: Value = match serde_json::from_str(raw.trim()) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!("Skipping malformed JSON-LD block: {}", e);
                continue;
            }
        };

        let candidates = match data {
            Value::Array(items) => items,
            other => vec![other],
        };

        for candidate in candidates {
            if let Some(Value::Array(graph)) = candidate.get("@graph") {
                objects.extend(graph.iter().filter(|v| v.is_object()).cloned());
            }
            if candidate.is_object() {
                objects.push(candidate);
            }
        }
    }
    objects
}

/// First JSON-LD object whose `@type` is one of `types`
fn find_json_ld(document: &Html, types: &[&str]) -> Option<Value> {
    json_ld_objects(document)
        .into_iter()
        .find(|obj| has_type(obj, types))
}

/// `@type` may be a string or an array of strings
fn has_type(obj: &Value, types: &[&str]) -> bool {
    match obj.get("@type") {
        Some(Value::String(t)) => types.contains(&t.as_str()),
        Some(Value::Array(ts)) => ts
            .iter()
            .filter_map(Value::as_str)
            .any(|t| types.contains(&t)),
        _ => false,
    }
}

/// Render a scalar JSON value as text: strings trimmed, numbers as written
fn json_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// `content` of the first `<meta>` matching a CSS selector
fn meta_content(document: &Html, selector: &str) -> String {
    Selector::parse(selector)
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .filter_map(|el| el.value().attr("content"))
                .map(str::trim)
                .find(|c| !c.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

/// Text content of an element with whitespace runs collapsed
fn collapsed_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First candidate that produces a non-empty value
///
/// Candidates run lazily, in priority order.
fn first_non_empty(candidates: &[&dyn Fn() -> String]) -> String {
    candidates
        .iter()
        .map(|candidate| candidate())
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}
