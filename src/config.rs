//! Configuration module for the Tomato Scraper service
//!
//! Handles loading environment variables and the runtime feature toggles
//! that the cache and EPG search consult before every operation.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::warn;

/// Default review site root
pub const DEFAULT_BASE_URL: &str = "https://www.rottentomatoes.com";

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    ///
    /// Defaults to loopback. `/api/image` fetches any absolute http(s) URL
    /// with certificate checks off, so binding a public address exposes a
    /// fetch proxy.
    pub host: String,
    /// Server port
    pub port: u16,
    /// Root of the review site, without trailing slash
    pub base_url: String,
    /// Root directory of the page/image cache and the debug log
    pub cache_dir: PathBuf,
    /// Initial value of the cache toggle
    pub cache_enabled: bool,
    /// Initial value of the auto-EPG toggle
    pub auto_epg: bool,
    /// TTL for browse and celebrity pages
    pub page_ttl_secs: u64,
    /// TTL for detail pages
    pub detail_ttl_secs: u64,
    /// Timeout for page and poster fetches
    pub http_timeout_secs: u64,
    /// Timeout for search requests, backdrops and portraits
    pub search_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_dir: env::temp_dir().join("tomato-scraper"),
            cache_enabled: true,
            auto_epg: true,
            page_ttl_secs: 300,
            detail_ttl_secs: 900,
            http_timeout_secs: 8,
            search_timeout_secs: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Every variable is optional; unparseable values keep their default.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT", defaults.port),
            base_url: env::var("BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            cache_dir: env::var("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            cache_enabled: parse_bool_var("CACHE_ENABLED", defaults.cache_enabled),
            auto_epg: parse_bool_var("AUTO_EPG", defaults.auto_epg),
            page_ttl_secs: parse_var("PAGE_TTL_SECS", defaults.page_ttl_secs),
            detail_ttl_secs: parse_var("DETAIL_TTL_SECS", defaults.detail_ttl_secs),
            http_timeout_secs: parse_var("HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
            search_timeout_secs: parse_var("SEARCH_TIMEOUT_SECS", defaults.search_timeout_secs),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Path of the append-only debug log inside the cache root
    pub fn debug_log_path(&self) -> PathBuf {
        self.cache_dir.join(crate::cache::DEBUG_LOG_NAME)
    }
}

fn parse_var<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("Invalid value {:?} for {}, using {}", raw, name, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_bool_var(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => parse_bool(&raw).unwrap_or_else(|| {
            warn!("Invalid boolean {:?} for {}, using {}", raw, name, default);
            default
        }),
        Err(_) => default,
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// The two user-facing switches
///
/// Shared behind an `Arc`; reads happen before every cache access and
/// every EPG-triggered search, so a flip takes effect immediately.
#[derive(Debug)]
pub struct Toggles {
    cache_enabled: AtomicBool,
    auto_epg: AtomicBool,
}

impl Toggles {
    pub fn new(cache_enabled: bool, auto_epg: bool) -> Self {
        Self {
            cache_enabled: AtomicBool::new(cache_enabled),
            auto_epg: AtomicBool::new(auto_epg),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_enabled, config.auto_epg)
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::SeqCst)
    }

    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn auto_epg(&self) -> bool {
        self.auto_epg.load(Ordering::SeqCst)
    }

    pub fn set_auto_epg(&self, enabled: bool) {
        self.auto_epg.store(enabled, Ordering::SeqCst);
    }
}

impl Default for Toggles {
    fn default() -> Self {
        Self::new(true, true)
    }
}
