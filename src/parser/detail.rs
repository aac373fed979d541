//! Detail page extraction for movies and TV series
//!
//! The record is assembled from independent passes over the same document.
//! Each pass fills the fields it knows about and leaves the rest empty; the
//! patches are merged with "first non-empty wins". A pass that finds nothing
//! (or finds malformed JSON) simply contributes nothing.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{collapsed_text, find_json_ld, json_text, meta_content};

/// Names shown in the director display string
const DIRECTOR_DISPLAY_LIMIT: usize = 2;
/// Names shown in the cast display string
const CAST_DISPLAY_LIMIT: usize = 8;

static RATING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9\-]{0,6}$").unwrap());
static RUNTIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+\s*h(\s*\d+\s*m)?|\d+\s*m)$").unwrap());

/// Everything shown on a detail screen
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    /// "PG-13", "TV-MA", ...
    pub mpaa_rating: String,
    /// "Now Playing", "Streaming", ...
    pub status: String,
    /// "1h 44m", "44m"
    pub runtime: String,
    /// Genres joined with "/"
    pub genres: String,
    pub synopsis: String,
    /// First two directors, comma separated
    pub director: String,
    /// First eight cast members, comma separated
    pub cast: String,
    pub director_list: Vec<String>,
    pub cast_list: Vec<String>,
    pub poster_url: String,
    pub backdrop_url: String,
    /// Critic score, "0".."100" or empty
    pub tomatometer_score: String,
    pub critic_review_count: String,
    /// Audience score, "0".."100" or empty
    pub audience_score: String,
    pub audience_rating_count: String,
}

impl DetailRecord {
    /// Fill every empty field of `self` from `patch`
    fn merge(mut self, patch: DetailRecord) -> Self {
        fn take(field: &mut String, value: String) {
            if field.is_empty() {
                *field = value;
            }
        }
        fn take_list(field: &mut Vec<String>, value: Vec<String>) {
            if field.is_empty() {
                *field = value;
            }
        }

        take(&mut self.mpaa_rating, patch.mpaa_rating);
        take(&mut self.status, patch.status);
        take(&mut self.runtime, patch.runtime);
        take(&mut self.genres, patch.genres);
        take(&mut self.synopsis, patch.synopsis);
        take(&mut self.director, patch.director);
        take(&mut self.cast, patch.cast);
        take_list(&mut self.director_list, patch.director_list);
        take_list(&mut self.cast_list, patch.cast_list);
        take(&mut self.poster_url, patch.poster_url);
        take(&mut self.backdrop_url, patch.backdrop_url);
        take(&mut self.tomatometer_score, patch.tomatometer_score);
        take(&mut self.critic_review_count, patch.critic_review_count);
        take(&mut self.audience_score, patch.audience_score);
        take(&mut self.audience_rating_count, patch.audience_rating_count);
        self
    }
}

/// Parse a movie or TV detail page
///
/// Total: any input, including the empty string, yields a record.
pub fn parse_detail(html: &str) -> DetailRecord {
    let document = Html::parse_document(html);

    let passes: [fn(&Html) -> DetailRecord; 6] = [
        og_image_pass,
        backdrop_pass,
        scorecard_pass,
        metadata_props_pass,
        genres_pass,
        credits_pass,
    ];

    passes
        .iter()
        .fold(DetailRecord::default(), |record, pass| record.merge(pass(&document)))
}

/// Poster fallback from `og:image`
fn og_image_pass(document: &Html) -> DetailRecord {
    DetailRecord {
        poster_url: meta_content(document, r#"meta[property="og:image"]"#),
        ..Default::default()
    }
}

/// Hero image; `src` may list several URLs, the last is the largest
fn backdrop_pass(document: &Html) -> DetailRecord {
    let selector = Selector::parse(r#"rt-img[slot="iconic"][src]"#).unwrap();

    let backdrop_url = document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("src"))
        .and_then(|src| {
            src.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .last()
        })
        .map(str::to_string)
        .unwrap_or_default();

    DetailRecord {
        backdrop_url,
        ..Default::default()
    }
}

/// Scores and description from the embedded scorecard JSON
fn scorecard_pass(document: &Html) -> DetailRecord {
    let selector = Selector::parse("script#media-scorecard-json").unwrap();

    let Some(script) = document.select(&selector).next() else {
        return DetailRecord::default();
    };

    let raw = script.text().collect::<String>();
    let data: Value = match serde_json::from_str(raw.trim()) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("Ignoring malformed scorecard JSON: {}", e);
            return DetailRecord::default();
        }
    };

    let critics = data.get("criticsScore");
    let audience = data.get("audienceScore");
    let field = |obj: Option<&Value>, key: &str| json_text(obj.and_then(|o| o.get(key)));

    // "2,500+ Verified Ratings" is nicer to show than a raw count
    let mut audience_rating_count = field(audience, "bandedRatingCount");
    if audience_rating_count.is_empty() {
        audience_rating_count = field(audience, "ratingCount");
    }

    DetailRecord {
        tomatometer_score: field(critics, "scorePercent"),
        critic_review_count: field(critics, "reviewCount"),
        audience_score: field(audience, "scorePercent"),
        audience_rating_count,
        synopsis: json_text(data.get("description")),
        ..Default::default()
    }
}

/// What a short metadata fragment describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PropKind {
    Rating,
    Runtime,
    Status,
}

fn classify_prop(prop: &str) -> Option<PropKind> {
    if RATING_RE.is_match(prop) {
        return Some(PropKind::Rating);
    }
    if RUNTIME_RE.is_match(prop) {
        return Some(PropKind::Runtime);
    }
    let lower = prop.to_lowercase();
    if ["playing", "stream", "premiere"]
        .iter()
        .any(|keyword| lower.contains(keyword))
    {
        return Some(PropKind::Status);
    }
    None
}

/// Rating, runtime and status from the `metadata-prop` fragments
///
/// The first fragment of each kind wins.
fn metadata_props_pass(document: &Html) -> DetailRecord {
    let selector = Selector::parse(r#"rt-text[slot="metadata-prop"]"#).unwrap();
    let mut record = DetailRecord::default();

    for prop in document.select(&selector).map(collapsed_text) {
        let slot = match classify_prop(&prop) {
            Some(PropKind::Rating) => &mut record.mpaa_rating,
            Some(PropKind::Runtime) => &mut record.runtime,
            Some(PropKind::Status) => &mut record.status,
            None => continue,
        };
        if slot.is_empty() {
            *slot = prop;
        }
    }

    record
}

fn genres_pass(document: &Html) -> DetailRecord {
    let selector = Selector::parse(r#"rt-text[slot="metadata-genre"]"#).unwrap();

    let genres: Vec<String> = document
        .select(&selector)
        .map(collapsed_text)
        .filter(|g| !g.is_empty())
        .collect();

    DetailRecord {
        genres: genres.join("/"),
        ..Default::default()
    }
}

/// Directors and cast from the Movie/TV JSON-LD object
fn credits_pass(document: &Html) -> DetailRecord {
    let Some(media) = find_json_ld(document, &["Movie", "TVSeries", "TVSeason", "TVEpisode"])
    else {
        return DetailRecord::default();
    };

    let director_list = person_names(media.get("director"));

    let actors = media
        .get("actor")
        .filter(|v| !is_blank(v))
        .or_else(|| media.get("actors"));
    let cast_list = person_names(actors);

    DetailRecord {
        director: display_names(&director_list, DIRECTOR_DISPLAY_LIMIT),
        cast: display_names(&cast_list, CAST_DISPLAY_LIMIT),
        director_list,
        cast_list,
        ..Default::default()
    }
}

/// Names from a person object or an array of person objects
fn person_names(value: Option<&Value>) -> Vec<String> {
    let people: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) if value.is_object() => vec![value],
        _ => Vec::new(),
    };

    people
        .into_iter()
        .map(|person| json_text(person.get("name")))
        .filter(|name| !name.is_empty())
        .collect()
}

fn display_names(names: &[String], limit: usize) -> String {
    names
        .iter()
        .take(limit)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAGE: &str = r#"
    <html>
    <head>
        <meta property="og:image" content="https://resizing.flixster.com/poster.jpg">
        <script type="application/ld+json">
        {"@context":"http://schema.org","@type":"Movie","name":"Dune: Part Two",
         "director":[{"@type":"Person","name":"Denis Villeneuve"}],
         "actor":[{"@type":"Person","name":"Timothée Chalamet"},{"@type":"Person","name":"Zendaya"},
                  {"@type":"Person","name":""}]}
        </script>
    </head>
    <body>
        <rt-img slot="iconic" src="https://img/small.jpg, https://img/large.jpg"></rt-img>
        <script id="media-scorecard-json" data-json="mediaScorecard" type="application/json">
        {"criticsScore":{"scorePercent":92,"reviewCount":"449"},
         "audienceScore":{"scorePercent":"95","bandedRatingCount":"10,000+ Verified Ratings","ratingCount":12345},
         "description":"  Paul Atreides unites with Chani.  "}
        </script>
        <rt-text slot="metadata-prop">PG-13</rt-text>
        <rt-text slot="metadata-prop">Now Playing</rt-text>
        <rt-text slot="metadata-prop">2h 46m</rt-text>
        <rt-text slot="metadata-genre">Sci-Fi</rt-text>
        <rt-text slot="metadata-genre">Adventure</rt-text>
    </body>
    </html>
    "#;

    #[test]
    fn test_parse_detail_empty_html() {
        assert_eq!(parse_detail(""), DetailRecord::default());
    }

    #[test]
    fn test_parse_detail_full() {
        let detail = parse_detail(FULL_PAGE);

        assert_eq!(detail.mpaa_rating, "PG-13");
        assert_eq!(detail.status, "Now Playing");
        assert_eq!(detail.runtime, "2h 46m");
        assert_eq!(detail.genres, "Sci-Fi/Adventure");
        assert_eq!(detail.synopsis, "Paul Atreides unites with Chani.");
        assert_eq!(detail.poster_url, "https://resizing.flixster.com/poster.jpg");
        assert_eq!(detail.backdrop_url, "https://img/large.jpg");
        assert_eq!(detail.tomatometer_score, "92");
        assert_eq!(detail.critic_review_count, "449");
        assert_eq!(detail.audience_score, "95");
        assert_eq!(detail.audience_rating_count, "10,000+ Verified Ratings");
        assert_eq!(detail.director, "Denis Villeneuve");
        assert_eq!(detail.director_list, vec!["Denis Villeneuve"]);
        assert_eq!(detail.cast, "Timothée Chalamet, Zendaya");
        assert_eq!(detail.cast_list, vec!["Timothée Chalamet", "Zendaya"]);
    }

    #[test]
    fn test_scorecard_without_metadata_props() {
        let html = r#"
        <script id="media-scorecard-json" type="application/json">
            {"criticsScore":{"scorePercent":85}}
        </script>
        "#;
        let detail = parse_detail(html);
        assert_eq!(detail.tomatometer_score, "85");
        assert_eq!(detail.mpaa_rating, "");
        assert_eq!(detail.audience_score, "");
    }

    #[test]
    fn test_metadata_prop_rating_alone() {
        let html = r#"<rt-text slot="metadata-prop"> PG-13 </rt-text>"#;
        let detail = parse_detail(html);
        assert_eq!(detail.mpaa_rating, "PG-13");
        assert_eq!(detail.runtime, "");
        assert_eq!(detail.status, "");
    }

    #[test]
    fn test_audience_count_falls_back_to_rating_count() {
        let html = r#"
        <script id="media-scorecard-json">
            {"audienceScore":{"scorePercent":0,"ratingCount":321}}
        </script>
        "#;
        let detail = parse_detail(html);
        assert_eq!(detail.audience_score, "0");
        assert_eq!(detail.audience_rating_count, "321");
    }

    #[test]
    fn test_malformed_scorecard_does_not_abort_other_passes() {
        let html = r#"
        <meta property="og:image" content="https://img/poster.jpg">
        <script id="media-scorecard-json">{"criticsScore": </script>
        <rt-text slot="metadata-prop">R</rt-text>
        <rt-text slot="metadata-genre">Horror</rt-text>
        "#;
        let detail = parse_detail(html);
        assert_eq!(detail.tomatometer_score, "");
        assert_eq!(detail.synopsis, "");
        assert_eq!(detail.poster_url, "https://img/poster.jpg");
        assert_eq!(detail.mpaa_rating, "R");
        assert_eq!(detail.genres, "Horror");
    }

    #[test]
    fn test_first_match_wins_per_category() {
        let html = r#"
        <rt-text slot="metadata-prop">TV-MA</rt-text>
        <rt-text slot="metadata-prop">44m</rt-text>
        <rt-text slot="metadata-prop">Streaming</rt-text>
        <rt-text slot="metadata-prop">TV-14</rt-text>
        <rt-text slot="metadata-prop">1h 2m</rt-text>
        <rt-text slot="metadata-prop">Premieres Friday</rt-text>
        <rt-text slot="metadata-prop">Drama series about nothing</rt-text>
        "#;
        let detail = parse_detail(html);
        assert_eq!(detail.mpaa_rating, "TV-MA");
        assert_eq!(detail.runtime, "44m");
        assert_eq!(detail.status, "Streaming");
    }

    #[test]
    fn test_classify_prop() {
        assert_eq!(classify_prop("PG"), Some(PropKind::Rating));
        assert_eq!(classify_prop("NC-17"), Some(PropKind::Rating));
        assert_eq!(classify_prop("2024"), Some(PropKind::Rating));
        assert_eq!(classify_prop("1h 44m"), Some(PropKind::Runtime));
        assert_eq!(classify_prop("2h"), Some(PropKind::Runtime));
        assert_eq!(classify_prop("95 m"), Some(PropKind::Runtime));
        assert_eq!(classify_prop("Now Playing"), Some(PropKind::Status));
        assert_eq!(classify_prop("STREAMING NOW"), Some(PropKind::Status));
        assert_eq!(classify_prop("Premiere Jun 5"), Some(PropKind::Status));
        assert_eq!(classify_prop("Released Mar 1, 2024"), None);
        assert_eq!(classify_prop("TOOLONGCODE"), None);
    }

    #[test]
    fn test_backdrop_single_url() {
        let html = r#"<rt-img slot="iconic" src="https://img/only.jpg"></rt-img>"#;
        assert_eq!(parse_detail(html).backdrop_url, "https://img/only.jpg");
    }

    #[test]
    fn test_backdrop_trailing_comma() {
        let html = r#"<rt-img slot="iconic" src="https://img/a.jpg, https://img/b.jpg, "></rt-img>"#;
        assert_eq!(parse_detail(html).backdrop_url, "https://img/b.jpg");
    }

    #[test]
    fn test_credits_single_objects_and_actors_key() {
        let html = r#"
        <script type="application/ld+json">
        {"@type":"TVSeries","director":{"@type":"Person","name":"Ben Stiller"},
         "actor":[],
         "actors":[{"name":"Adam Scott"},{"name":"Britt Lower"}]}
        </script>
        "#;
        let detail = parse_detail(html);
        assert_eq!(detail.director, "Ben Stiller");
        assert_eq!(detail.director_list, vec!["Ben Stiller"]);
        assert_eq!(detail.cast, "Adam Scott, Britt Lower");
    }

    #[test]
    fn test_credits_display_limits() {
        let directors: Vec<String> = (1..=3)
            .map(|i| format!(r#"{{"name":"Director {i}"}}"#))
            .collect();
        let actors: Vec<String> = (1..=10)
            .map(|i| format!(r#"{{"name":"Actor {i}"}}"#))
            .collect();
        let html = format!(
            r#"<script type="application/ld+json">{{"@type":"Movie","director":[{}],"actor":[{}]}}</script>"#,
            directors.join(","),
            actors.join(",")
        );

        let detail = parse_detail(&html);
        assert_eq!(detail.director, "Director 1, Director 2");
        assert_eq!(detail.director_list.len(), 3);
        assert_eq!(detail.cast.split(", ").count(), 8);
        assert!(detail.cast.ends_with("Actor 8"));
        assert_eq!(detail.cast_list.len(), 10);
    }

    #[test]
    fn test_non_media_json_ld_is_ignored() {
        let html = r#"
        <script type="application/ld+json">{"@type":"Person","director":{"name":"Nope"}}</script>
        "#;
        let detail = parse_detail(html);
        assert!(detail.director_list.is_empty());
        assert_eq!(detail.director, "");
    }

    #[test]
    fn test_detail_serialization() {
        let detail = DetailRecord {
            mpaa_rating: "R".to_string(),
            tomatometer_score: "90".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_string(&detail).unwrap();
        assert!(json.contains("\"mpaaRating\":\"R\""));
        assert!(json.contains("\"tomatometerScore\":\"90\""));
        assert!(json.contains("\"castList\":[]"));
    }
}
