//! Celebrity profile extraction
//!
//! Each field walks its own fallback chain, highest priority first. The
//! JSON-LD `Person` object, `data-qa` tagged blocks and Open Graph tags are
//! all optional.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{collapse_whitespace, collapsed_text, find_json_ld, first_non_empty, json_text, meta_content};

static PERCENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d{1,3})\s*%").unwrap());

/// Everything shown on a celebrity screen
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CelebrityRecord {
    pub name: String,
    /// Portrait URL
    pub image: String,
    /// "96% Toy Story"
    pub highest_rated_credit: String,
    pub lowest_rated_credit: String,
    pub birthday: String,
    pub birthplace: String,
    pub bio: String,
}

/// Parse a celebrity page
///
/// Total: any input yields a fully shaped record.
pub fn parse_celebrity(html: &str) -> CelebrityRecord {
    let document = Html::parse_document(html);
    let person = find_json_ld(&document, &["Person"]).unwrap_or(Value::Null);
    let doc = &document;

    let name = first_non_empty(&[
        &|| json_text(person.get("name")),
        &|| first_text(doc, r#"h1[data-qa="celebrity-bio-header"]"#),
        &|| og_title_name(doc),
    ]);

    let image = first_non_empty(&[
        &|| person_image(person.get("image")),
        &|| first_attr(doc, "rt-img.celebrity-bio__hero-img[src]", "src"),
        &|| first_attr(doc, "rt-img.celebrity-bio__hero-mobile[src]", "src"),
        &|| first_attr(doc, ".celebrity-bio__hero-img img[src]", "src"),
        &|| first_attr(doc, ".celebrity-bio__hero-mobile img[src]", "src"),
        &|| meta_content(doc, r#"meta[property="og:image"]"#),
    ]);

    let birthday = first_non_empty(&[
        &|| labelled_item(doc, "celebrity-bio-bday"),
        &|| json_text(person.get("birthDate")),
    ]);

    let birthplace = first_non_empty(&[
        &|| labelled_item(doc, "celebrity-bio-birthplace"),
        &|| place_name(person.get("birthPlace")),
    ]);

    let bio = first_non_empty(&[
        &|| first_text(doc, r#"p[data-qa="celebrity-bio-summary"]"#),
        &|| meta_content(doc, r#"meta[property="og:description"]"#),
        &|| meta_content(doc, r#"meta[name="description"]"#),
        &|| json_text(person.get("description")),
    ]);

    CelebrityRecord {
        name,
        image,
        highest_rated_credit: rated_credit(doc, "celebrity-bio-highest-rated"),
        lowest_rated_credit: rated_credit(doc, "celebrity-bio-lowest-rated"),
        birthday,
        birthplace,
        bio,
    }
}

/// Collapsed text of the first element matching `selector`
fn first_text(document: &Html, selector: &str) -> String {
    Selector::parse(selector)
        .ok()
        .and_then(|sel| document.select(&sel).map(collapsed_text).find(|t| !t.is_empty()))
        .unwrap_or_default()
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> String {
    Selector::parse(selector)
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .filter_map(|el| el.value().attr(attr))
                .map(str::trim)
                .find(|v| !v.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_default()
}

/// `og:title` minus the " | Site Name" suffix
fn og_title_name(document: &Html) -> String {
    let title = meta_content(document, r#"meta[property="og:title"]"#);
    title.split('|').next().unwrap_or_default().trim().to_string()
}

/// Person `image`: a URL string, a list of strings/objects, or an object
fn person_image(value: Option<&Value>) -> String {
    fn object_url(obj: &Value) -> String {
        first_non_empty(&[&|| json_text(obj.get("url")), &|| json_text(obj.get("@id"))])
    }

    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.trim().to_string(),
                Value::Object(_) => object_url(item),
                _ => String::new(),
            })
            .find(|url| !url.is_empty())
            .unwrap_or_default(),
        Some(obj) if obj.is_object() => object_url(obj),
        _ => String::new(),
    }
}

/// `birthPlace` as a plain string or an object with a `name`
fn place_name(value: Option<&Value>) -> String {
    match value {
        Some(Value::Object(_)) => json_text(value.and_then(|v| v.get("name"))),
        other => json_text(other),
    }
}

/// `data-qa` paragraph selector
fn qa_paragraph<'a>(document: &'a Html, qa: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(&format!(r#"p[data-qa="{}"]"#, qa)).ok()?;
    document.select(&selector).next()
}

/// "NN% Title" from a highest/lowest rated block
///
/// Either half alone is returned when the other is missing.
fn rated_credit(document: &Html, qa: &str) -> String {
    let Some(block) = qa_paragraph(document, qa) else {
        return String::new();
    };

    let percent = PERCENT_RE
        .captures(&collapsed_text(block))
        .map(|caps| format!("{}%", &caps[1]))
        .unwrap_or_default();

    let link_selector = Selector::parse("rt-link").unwrap();
    let title = block
        .select(&link_selector)
        .next()
        .map(collapsed_text)
        .unwrap_or_default();

    match (percent.is_empty(), title.is_empty()) {
        (false, false) => format!("{} {}", percent, title),
        (true, _) => title,
        (false, true) => percent,
    }
}

/// Value of a "Label: value" block with the `rt-text` label removed
fn labelled_item(document: &Html, qa: &str) -> String {
    qa_paragraph(document, qa)
        .map(|block| {
            let mut text = String::new();
            push_text_skipping(block, "rt-text", &mut text);
            collapse_whitespace(&text)
        })
        .unwrap_or_default()
}

fn push_text_skipping(element: ElementRef, skip_tag: &str, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if el.name() == skip_tag => out.push(' '),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    out.push(' ');
                    push_text_skipping(child_el, skip_tag, out);
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}
