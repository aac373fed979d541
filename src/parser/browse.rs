//! Browse list extraction from the JSON-LD `ItemList` block

use scraper::Html;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::{has_type, json_ld_objects, json_text};
use crate::constants::endpoints::normalize_url;

/// One entry of a browse/category page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BrowseItem {
    pub name: String,
    /// Absolute detail page URL
    pub url: String,
    /// Poster URL, empty when the list entry has none
    pub image: String,
}

/// Parse a browse page into its item list
///
/// A page without an `ItemList` block is an empty list, not an error.
pub fn parse_browse_list(html: &str, base_url: &str) -> Vec<BrowseItem> {
    let document = Html::parse_document(html);

    item_list_elements(json_ld_objects(&document))
        .iter()
        .filter_map(|item| {
            let name = json_text(item.get("name"));
            if name.is_empty() {
                return None;
            }
            let url = normalize_url(base_url, &json_text(item.get("url")))?;
            Some(BrowseItem {
                name,
                url,
                image: json_text(item.get("image")),
            })
        })
        .collect()
}

/// Elements of the first `ItemList`
///
/// `itemListElement` is either the array itself or an object wrapping it
/// one level deeper.
fn item_list_elements(objects: Vec<Value>) -> Vec<Value> {
    for obj in objects {
        if !has_type(&obj, &["ItemList"]) {
            continue;
        }
        match obj.get("itemListElement") {
            Some(Value::Array(items)) => return items.clone(),
            Some(Value::Object(inner)) => {
                if let Some(Value::Array(items)) = inner.get("itemListElement") {
                    return items.clone();
                }
            }
            _ => {}
        }
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://www.rottentomatoes.com";

    #[test]
    fn test_parse_browse_list_direct_array() {
        let html = r#"
        <html><head>
        <script type="application/ld+json">
            {"@type":"ItemList","itemListElement":[{"name":"X","url":"/m/x","image":"i.jpg"}]}
        </script>
        </head><body></body></html>
        "#;

        let items = parse_browse_list(html, BASE);
        assert_eq!(
            items,
            vec![BrowseItem {
                name: "X".to_string(),
                url: "https://www.rottentomatoes.com/m/x".to_string(),
                image: "i.jpg".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_browse_list_nested_shape() {
        let html = r#"
        <script type="application/ld+json">
        {"@context":"http://schema.org","@type":"ItemList",
         "itemListElement":{"@type":"ItemList","itemListElement":[
            {"@type":"Movie","name":"Dune: Part Two","url":"https://www.rottentomatoes.com/m/dune_part_two"},
            {"@type":"Movie","name":"Civil War","url":"/m/civil_war_2024","image":"https://img/cw.jpg"}
         ]}}
        </script>
        "#;

        let items = parse_browse_list(html, BASE);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Dune: Part Two");
        assert_eq!(items[0].url, "https://www.rottentomatoes.com/m/dune_part_two");
        assert_eq!(items[0].image, "");
        assert_eq!(items[1].image, "https://img/cw.jpg");
    }

    #[test]
    fn test_parse_browse_list_skips_incomplete_entries() {
        let html = r#"
        <script type="application/ld+json">
        {"@type":"ItemList","itemListElement":[
            {"name":"  ","url":"/m/blank"},
            {"name":"No Link"},
            "not an object",
            {"name":"Kept","url":"m/kept"}
        ]}
        </script>
        "#;

        let items = parse_browse_list(html, BASE);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Kept");
        assert_eq!(items[0].url, "https://www.rottentomatoes.com/m/kept");
    }

    #[test]
    fn test_parse_browse_list_picks_item_list_among_blocks() {
        let html = r#"
        <script type="application/ld+json">{"@type":"WebSite","name":"Site"}</script>
        <script type="application/ld+json">{broken</script>
        <script type="application/ld+json">[{"@type":"ItemList","itemListElement":[{"name":"A","url":"/tv/a"}]}]</script>
        "#;

        let items = parse_browse_list(html, BASE);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://www.rottentomatoes.com/tv/a");
    }

    #[test]
    fn test_parse_browse_list_without_item_list() {
        assert!(parse_browse_list("<html><body>nothing</body></html>", BASE).is_empty());
        assert!(parse_browse_list("", BASE).is_empty());
    }
}
