//! Scraper module for fetching raw bytes from the review site
//!
//! This module provides the blocking HTTP fetcher with a fixed desktop
//! browser identity, plus the `Fetch` trait the rest of the crate talks to
//! so tests can substitute canned responses.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{self, HeaderMap, HeaderValue};
use thiserror::Error;

/// Errors that can occur during a fetch
///
/// Every variant means the same thing to callers: the request failed.
/// The split only exists so the debug log says why.
#[derive(Error, Debug)]
pub enum ScraperError {
    /// Network-related errors (connection timeout, DNS failure, TLS, etc.)
    #[error("Failed to connect to server: {0}")]
    NetworkError(String),

    /// HTTP non-2xx status code errors
    #[error("Server returned status {0}")]
    HttpError(u16),

    /// Error reading response body
    #[error("Failed to read response body: {0}")]
    ResponseError(String),

    /// The HTTP client itself could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    ClientError(String),
}

/// Desktop browser identity sent with every request
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Single-attempt GET returning the response body
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, ScraperError>;
}

/// Blocking HTTP client for the review site
///
/// Certificate validation is disabled: the set-top boxes this serves often
/// carry stale CA bundles, and pinning is not implemented. Retries are left
/// to the caller (there are none today).
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher whose Referer/Origin point at `base_url`
    pub fn new(base_url: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .default_headers(identity_headers(base_url))
            .danger_accept_invalid_certs(true)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ScraperError::ClientError(e.to_string()))?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, ScraperError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|e| {
                let error = if e.is_timeout() {
                    ScraperError::NetworkError("Connection timeout".to_string())
                } else if e.is_connect() {
                    ScraperError::NetworkError("Failed to connect to server".to_string())
                } else {
                    ScraperError::NetworkError(e.to_string())
                };
                tracing::warn!("HTTP GET failed for {}: {}", url, error);
                error
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("HTTP GET {} returned {}", url, status);
            return Err(ScraperError::HttpError(status.as_u16()));
        }

        let body = response
            .bytes()
            .map_err(|e| ScraperError::ResponseError(e.to_string()))?;

        tracing::debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body.to_vec())
    }
}

fn identity_headers(base_url: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
    headers.insert(header::ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("en-US,en;q=0.9"),
    );

    // A base URL with control characters cannot become a header; the
    // request still goes out, just without Referer/Origin.
    if let Ok(referer) = HeaderValue::from_str(&format!("{}/", base_url)) {
        headers.insert(header::REFERER, referer);
    }
    if let Ok(origin) = HeaderValue::from_str(base_url) {
        headers.insert(header::ORIGIN, origin);
    }

    headers
}

/// Decode a response body, replacing invalid UTF-8
pub fn decode_lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
