//! Constants module for the Tomato Scraper service
//!
//! Contains endpoint URL builders and the browse category menus, all
//! relative to the base URL from configuration.

/// URL builder functions for all endpoints
pub mod endpoints {
    /// JSON autocomplete search endpoint
    pub fn autocomplete(base_url: &str, query: &str) -> String {
        format!(
            "{}/api/autocomplete?v=1&query={}",
            base_url,
            urlencoding::encode(query)
        )
    }

    /// HTML search results page
    pub fn search_page(base_url: &str, query: &str) -> String {
        format!("{}/search?search={}", base_url, urlencoding::encode(query))
    }

    /// Celebrity profile page for a display name
    pub fn celebrity(base_url: &str, name: &str) -> String {
        format!("{}/celebrity/{}", base_url, celebrity_slug(name))
    }

    /// Turn a display name into the site's celebrity slug
    ///
    /// "Tom Hanks" becomes "tom_hanks"; punctuation is dropped.
    pub fn celebrity_slug(name: &str) -> String {
        let kept: String = name
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || *c == '_')
            .collect();

        kept.split_whitespace().collect::<Vec<_>>().join("_")
    }

    /// Resolve a site-relative link against the base URL
    ///
    /// Returns `None` for empty input.
    pub fn normalize_url(base_url: &str, url: &str) -> Option<String> {
        let url = url.trim();
        if url.is_empty() {
            None
        } else if url.starts_with("http") {
            Some(url.to_string())
        } else if url.starts_with('/') {
            Some(format!("{}{}", base_url, url))
        } else {
            Some(format!("{}/{}", base_url, url))
        }
    }

    /// Lowercased host of an absolute `http`/`https` URL
    pub fn host_of(url: &str) -> Option<String> {
        let url = url.trim();
        let lower = url.to_ascii_lowercase();
        let scheme_len = if lower.starts_with("https://") {
            8
        } else if lower.starts_with("http://") {
            7
        } else {
            return None;
        };

        let authority = url[scheme_len..]
            .split(|c| matches!(c, '/' | '?' | '#'))
            .next()
            .unwrap_or_default();
        let host_port = authority.rsplit('@').next().unwrap_or_default();
        let host = host_port.split(':').next().unwrap_or_default();

        if host.is_empty() {
            None
        } else {
            Some(host.to_ascii_lowercase())
        }
    }

    /// Whether `url` is on the same host as `base_url`
    pub fn is_site_url(base_url: &str, url: &str) -> bool {
        matches!((host_of(base_url), host_of(url)), (Some(base), Some(host)) if base == host)
    }
}

/// Browse category menus
pub mod categories {
    use serde::Serialize;
    use utoipa::ToSchema;

    /// One entry of a browse menu
    #[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
    #[serde(rename_all = "camelCase")]
    pub struct Category {
        pub label: String,
        pub url: String,
    }

    const MOVIE_PATHS: &[(&str, &str)] = &[
        ("In theaters (Popular)", "/browse/movies_in_theaters/sort:popular"),
        ("In theaters (Newest)", "/browse/movies_in_theaters/sort:newest"),
        ("In theaters (A-Z)", "/browse/movies_in_theaters/sort:a_z"),
        ("In theaters (Top box office)", "/browse/movies_in_theaters/sort:top_box_office"),
        ("In theaters (Critic highest)", "/browse/movies_in_theaters/sort:critic_highest"),
        ("In theaters (Critic lowest)", "/browse/movies_in_theaters/sort:critic_lowest"),
        ("In theaters (Audience highest)", "/browse/movies_in_theaters/sort:audience_highest"),
        ("In theaters (Audience lowest)", "/browse/movies_in_theaters/sort:audience_lowest"),
        ("At home", "/browse/movies_at_home/"),
        ("Coming soon", "/browse/movies_coming_soon/"),
    ];

    const TV_AFFILIATES: &[(&str, &str)] = &[
        ("Netflix", "netflix"),
        ("Apple TV+", "apple-tv-plus"),
        ("Prime Video", "prime-video"),
        ("Max", "max"),
        ("Paramount+", "paramount-plus"),
        ("Hulu", "hulu"),
        ("AMC+", "amc-plus"),
        ("Peacock", "peacock"),
        ("Acorn TV", "acorn-tv"),
        ("Fandango at Home", "fandango-at-home"),
    ];

    /// Movie browse menu
    pub fn movies(base_url: &str) -> Vec<Category> {
        MOVIE_PATHS
            .iter()
            .map(|(label, path)| Category {
                label: label.to_string(),
                url: format!("{}{}", base_url, path),
            })
            .collect()
    }

    /// TV series browse menu
    pub fn tv(base_url: &str) -> Vec<Category> {
        let mut menu = vec![
            Category {
                label: "TV browse (All)".to_string(),
                url: format!("{}/browse/tv_series_browse/", base_url),
            },
            Category {
                label: "TV (Popular)".to_string(),
                url: format!("{}/browse/tv_series_browse/sort:popular", base_url),
            },
            Category {
                label: "TV (Newest)".to_string(),
                url: format!("{}/browse/tv_series_browse/sort:newest", base_url),
            },
        ];

        menu.extend(TV_AFFILIATES.iter().map(|(label, affiliate)| Category {
            label: format!("{} (Popular)", label),
            url: format!(
                "{}/browse/tv_series_browse/affiliates:{}~sort:popular",
                base_url, affiliate
            ),
        }));

        menu
    }
}
