//! API Routes module for the scraper API
//!
//! Handlers validate the query, hand the blocking work to actix's blocking
//! pool and wrap the result in the JSON envelope.

use std::str::FromStr;
use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;
use utoipa::{IntoParams, OpenApi, ToSchema};

use crate::cache::{DiskCache, ImageKind};
use crate::client::SiteClient;
use crate::config::{Config, Toggles};
use crate::constants::{categories, endpoints};
use crate::epg;
use crate::error::{AppError, AppResult};
use crate::logging;
use crate::models::{
    ApiError, ApiResponse, BrowseItem, CacheStats, Category, CelebrityRecord, DebugLogTail,
    DetailRecord, EpgMatch, SearchKind, SearchResultItem, Settings, SettingsUpdate,
};
use crate::scraper::Fetch;

/// Application state shared across handlers
pub struct AppState {
    pub client: Arc<SiteClient>,
    pub toggles: Arc<Toggles>,
    pub config: Config,
}

impl AppState {
    /// Wire the cache, toggles and client around a fetcher
    pub fn new(config: Config, fetcher: Arc<dyn Fetch>) -> Self {
        let toggles = Arc::new(Toggles::from_config(&config));
        let cache = DiskCache::new(config.cache_dir.clone(), toggles.clone());
        let client = Arc::new(SiteClient::new(fetcher, cache, &config));
        Self {
            client,
            toggles,
            config,
        }
    }

    fn settings(&self) -> Settings {
        Settings {
            cache_enabled: self.toggles.cache_enabled(),
            auto_epg: self.toggles.auto_epg(),
        }
    }

    /// Accept absolute URLs and site-relative paths alike
    ///
    /// Absolute URLs must stay on the configured site.
    fn site_url(&self, raw: Option<&str>) -> AppResult<String> {
        let base = &self.config.base_url;
        let url = raw
            .and_then(|u| endpoints::normalize_url(base, u.trim()))
            .ok_or_else(|| AppError::validation("Query parameter 'url' is required"))?;

        if !endpoints::is_site_url(base, &url) {
            return Err(AppError::validation(format!("URL must be on {}", base)));
        }
        Ok(url)
    }
}

/// Non-empty, trimmed query value
fn required(value: &Option<String>, name: &str) -> AppResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(AppError::validation(format!(
            "Query parameter '{}' is required",
            name
        ))),
    }
}

/// Query parameters for search endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct SearchQuery {
    /// Search keyword
    pub q: Option<String>,
    /// `movie` (default) or `tv`
    pub kind: Option<SearchKind>,
}

/// GET /api/search - Search movies or TV series
#[utoipa::path(
    get,
    path = "/api/search",
    tag = "catalogue",
    params(SearchQuery),
    responses(
        (status = 200, description = "Search results, possibly empty", body = Vec<SearchResultItem>),
        (status = 400, description = "Bad request - search query is required", body = ApiError)
    )
)]
pub async fn search(
    data: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
    let keyword = required(&query.q, "q")?;
    let kind = query.kind.unwrap_or_default();

    let client = data.client.clone();
    let results = web::block(move || client.search(&keyword, kind)).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(results)))
}

/// Query parameters for endpoints addressed by page URL
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct UrlQuery {
    /// Absolute URL or site-relative path
    pub url: Option<String>,
}

/// GET /api/browse - Items of a browse/category page
#[utoipa::path(
    get,
    path = "/api/browse",
    tag = "catalogue",
    params(UrlQuery),
    responses(
        (status = 200, description = "Browse items, empty when the page has no item list", body = Vec<BrowseItem>),
        (status = 400, description = "Bad request - url is required", body = ApiError),
        (status = 502, description = "Upstream fetch failed", body = ApiError)
    )
)]
pub async fn browse(data: web::Data<AppState>, query: web::Query<UrlQuery>) -> AppResult<HttpResponse> {
    let url = data.site_url(query.url.as_deref())?;

    let client = data.client.clone();
    let items = web::block(move || client.browse(&url)).await??;

    Ok(HttpResponse::Ok().json(ApiResponse::new(items)))
}

/// Query parameters for the category menu
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct CategoryQuery {
    /// `movie` (default) or `tv`
    pub kind: Option<SearchKind>,
}

/// GET /api/browse/categories - Browse menu for movies or TV
#[utoipa::path(
    get,
    path = "/api/browse/categories",
    tag = "catalogue",
    params(CategoryQuery),
    responses(
        (status = 200, description = "Ordered category menu", body = Vec<Category>)
    )
)]
pub async fn browse_categories(
    data: web::Data<AppState>,
    query: web::Query<CategoryQuery>,
) -> HttpResponse {
    let base = &data.config.base_url;
    let menu = match query.kind.unwrap_or_default() {
        SearchKind::Movie => categories::movies(base),
        SearchKind::Tv => categories::tv(base),
    };
    HttpResponse::Ok().json(ApiResponse::new(menu))
}

/// GET /api/detail - Detail record for a movie or series page
#[utoipa::path(
    get,
    path = "/api/detail",
    tag = "catalogue",
    params(UrlQuery),
    responses(
        (status = 200, description = "Detail record, unknown fields empty", body = DetailRecord),
        (status = 400, description = "Bad request - url is required", body = ApiError),
        (status = 502, description = "Upstream fetch failed", body = ApiError)
    )
)]
pub async fn detail(data: web::Data<AppState>, query: web::Query<UrlQuery>) -> AppResult<HttpResponse> {
    let url = data.site_url(query.url.as_deref())?;
    info!("Loading detail: {}", url);

    let client = data.client.clone();
    let record = web::block(move || client.detail(&url)).await??;

    Ok(HttpResponse::Ok().json(ApiResponse::new(record)))
}

/// Query parameters for the celebrity endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct CelebrityQuery {
    /// Profile URL; takes priority over `name`
    pub url: Option<String>,
    /// Display name, turned into a profile slug
    pub name: Option<String>,
}

/// GET /api/celebrity - Celebrity record by profile URL or name
#[utoipa::path(
    get,
    path = "/api/celebrity",
    tag = "catalogue",
    params(CelebrityQuery),
    responses(
        (status = 200, description = "Celebrity record, unknown fields empty", body = CelebrityRecord),
        (status = 400, description = "Bad request - url or name is required", body = ApiError),
        (status = 502, description = "Upstream fetch failed", body = ApiError)
    )
)]
pub async fn celebrity(
    data: web::Data<AppState>,
    query: web::Query<CelebrityQuery>,
) -> AppResult<HttpResponse> {
    let client = data.client.clone();

    let has_url = query.url.as_deref().is_some_and(|u| !u.trim().is_empty());

    let record = if has_url {
        let url = data.site_url(query.url.as_deref())?;
        web::block(move || client.celebrity(&url)).await??
    } else {
        let name = required(&query.name, "name")
            .map_err(|_| AppError::validation("Query parameter 'url' or 'name' is required"))?;
        web::block(move || client.celebrity_by_name(&name)).await??
    };

    Ok(HttpResponse::Ok().json(ApiResponse::new(record)))
}

/// Query parameters for the image endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ImageQuery {
    /// Image URL
    pub url: Option<String>,
    /// `poster` (default), `backdrop` or `celebrity`
    pub kind: Option<String>,
}

/// GET /api/image - Image bytes through the image cache
#[utoipa::path(
    get,
    path = "/api/image",
    tag = "catalogue",
    params(ImageQuery),
    responses(
        (status = 200, description = "Raw image bytes"),
        (status = 400, description = "Bad request - url missing or unknown kind", body = ApiError),
        (status = 502, description = "Upstream fetch failed", body = ApiError)
    )
)]
pub async fn image(data: web::Data<AppState>, query: web::Query<ImageQuery>) -> AppResult<HttpResponse> {
    let url = required(&query.url, "url")?;
    if endpoints::host_of(&url).is_none() {
        return Err(AppError::validation("Image URL must be absolute http(s)"));
    }
    let kind = ImageKind::from_str(query.kind.as_deref().unwrap_or_default())
        .map_err(AppError::validation)?;

    let client = data.client.clone();
    let bytes = web::block(move || client.image(&url, kind)).await??;

    Ok(HttpResponse::Ok()
        .content_type(image_content_type(&bytes))
        .body(bytes))
}

/// Sniff the few formats the site serves
fn image_content_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(b"\x89PNG") {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Query parameters for the EPG endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EpgQuery {
    /// Raw EPG event title, e.g. "The Matrix (1999) - Part 1"
    pub title: Option<String>,
}

/// GET /api/epg - Auto-search for the airing program
#[utoipa::path(
    get,
    path = "/api/epg",
    tag = "catalogue",
    params(EpgQuery),
    responses(
        (status = 200, description = "Match with possibly empty results", body = EpgMatch),
        (status = 400, description = "Bad request - nothing searchable in title", body = ApiError),
        (status = 409, description = "Auto EPG search is disabled", body = ApiError)
    )
)]
pub async fn epg_search(data: web::Data<AppState>, query: web::Query<EpgQuery>) -> AppResult<HttpResponse> {
    if !data.toggles.auto_epg() {
        return Err(AppError::disabled("Auto EPG search is disabled"));
    }
    let title = required(&query.title, "title")?;

    let client = data.client.clone();
    let toggles = data.toggles.clone();
    let found = web::block(move || epg::auto_search(&client, &toggles, &title)).await?;

    match found {
        Some(found) => Ok(HttpResponse::Ok().json(ApiResponse::new(found))),
        None => Err(AppError::validation("Nothing left to search after cleaning the title")),
    }
}

/// GET /api/settings - Current toggles
#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "settings",
    responses(
        (status = 200, description = "Current toggles", body = Settings)
    )
)]
pub async fn get_settings(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::new(data.settings()))
}

/// PUT /api/settings - Flip toggles at runtime
#[utoipa::path(
    put,
    path = "/api/settings",
    tag = "settings",
    request_body = SettingsUpdate,
    responses(
        (status = 200, description = "Toggles after the update", body = Settings)
    )
)]
pub async fn update_settings(
    data: web::Data<AppState>,
    body: web::Json<SettingsUpdate>,
) -> HttpResponse {
    if let Some(enabled) = body.cache_enabled {
        data.toggles.set_cache_enabled(enabled);
    }
    if let Some(enabled) = body.auto_epg {
        data.toggles.set_auto_epg(enabled);
    }

    let settings = data.settings();
    info!(
        "Settings updated: cache={} auto_epg={}",
        settings.cache_enabled, settings.auto_epg
    );
    HttpResponse::Ok().json(ApiResponse::new(settings))
}

/// GET /api/cache - Cache disk usage
#[utoipa::path(
    get,
    path = "/api/cache",
    tag = "cache",
    responses(
        (status = 200, description = "Cache size", body = CacheStats)
    )
)]
pub async fn cache_stats(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let client = data.client.clone();
    let size = web::block(move || client.cache().size_bytes()).await?;
    let stats = CacheStats::new(size, data.toggles.cache_enabled());

    Ok(HttpResponse::Ok().json(ApiResponse::new(stats)))
}

/// DELETE /api/cache - Remove all cached pages and images
#[utoipa::path(
    delete,
    path = "/api/cache",
    tag = "cache",
    responses(
        (status = 200, description = "Cache size after clearing", body = CacheStats)
    )
)]
pub async fn clear_cache(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let client = data.client.clone();
    let size = web::block(move || {
        client.cache().clear();
        client.cache().size_bytes()
    })
    .await?;
    info!("Cache cleared");

    Ok(HttpResponse::Ok().json(ApiResponse::new(CacheStats::new(
        size,
        data.toggles.cache_enabled(),
    ))))
}

/// Query parameters for the debug log endpoint
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct LogQuery {
    /// Number of trailing lines, default 80
    pub lines: Option<usize>,
}

/// GET /api/debug-log - Tail of the debug log
#[utoipa::path(
    get,
    path = "/api/debug-log",
    tag = "diagnostics",
    params(LogQuery),
    responses(
        (status = 200, description = "Trailing log lines", body = DebugLogTail)
    )
)]
pub async fn debug_log(data: web::Data<AppState>, query: web::Query<LogQuery>) -> AppResult<HttpResponse> {
    let lines = query.lines.unwrap_or(logging::DEFAULT_TAIL_LINES);
    let path = data.config.debug_log_path();
    let content = web::block(move || logging::tail(&path, lines)).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new(DebugLogTail { lines, content })))
}

/// DELETE /api/debug-log - Truncate the debug log
#[utoipa::path(
    delete,
    path = "/api/debug-log",
    tag = "diagnostics",
    responses(
        (status = 200, description = "Log truncated")
    )
)]
pub async fn clear_debug_log(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let path = data.config.debug_log_path();
    web::block(move || logging::clear(&path)).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::new("Debug log cleared")))
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tomato Scraper API",
        version = "0.1.0",
        description = "Search, browse and detail data scraped from Rotten Tomatoes",
        license(
            name = "MIT"
        )
    ),
    paths(
        search,
        browse,
        browse_categories,
        detail,
        celebrity,
        image,
        epg_search,
        get_settings,
        update_settings,
        cache_stats,
        clear_cache,
        debug_log,
        clear_debug_log
    ),
    components(
        schemas(
            SearchKind,
            SearchResultItem,
            BrowseItem,
            Category,
            DetailRecord,
            CelebrityRecord,
            EpgMatch,
            Settings,
            SettingsUpdate,
            CacheStats,
            DebugLogTail,
            ApiError,
            SearchQuery,
            UrlQuery,
            CategoryQuery,
            CelebrityQuery,
            ImageQuery,
            EpgQuery,
            LogQuery
        )
    ),
    tags(
        (name = "catalogue", description = "Search, browse and detail endpoints"),
        (name = "settings", description = "Runtime toggles"),
        (name = "cache", description = "Disk cache maintenance"),
        (name = "diagnostics", description = "Debug log access")
    )
)]
pub struct ApiDoc;

/// Configure API routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/search", web::get().to(search))
            .route("/browse", web::get().to(browse))
            .route("/browse/categories", web::get().to(browse_categories))
            .route("/detail", web::get().to(detail))
            .route("/celebrity", web::get().to(celebrity))
            .route("/image", web::get().to(image))
            .route("/epg", web::get().to(epg_search))
            .route("/settings", web::get().to(get_settings))
            .route("/settings", web::put().to(update_settings))
            .route("/cache", web::get().to(cache_stats))
            .route("/cache", web::delete().to(clear_cache))
            .route("/debug-log", web::get().to(debug_log))
            .route("/debug-log", web::delete().to(clear_debug_log)),
    );
}
