//! Data models for the scraper API
//!
//! This module contains the response envelopes and the request/response
//! payloads that are not extractor records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Re-export extractor records for convenience
pub use crate::constants::categories::Category;
pub use crate::epg::EpgMatch;
pub use crate::parser::{BrowseItem, CelebrityRecord, DetailRecord, SearchKind, SearchResultItem};

/// Generic API response wrapper for successful responses
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the operation was successful (always true for this type)
    pub success: bool,
    /// The response payload
    pub data: T,
    /// ISO timestamp of when data was fetched
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    /// Create a new successful API response with the current timestamp
    pub fn new(data: T) -> Self {
        Self::with_timestamp(data, Utc::now())
    }

    /// Create a new successful API response with a custom timestamp
    pub fn with_timestamp(data: T, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: true,
            data,
            timestamp: timestamp.to_rfc3339(),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Whether the operation was successful (always false for errors)
    pub success: bool,
    /// Error message describing what went wrong
    pub error: String,
    /// ISO timestamp of when the error occurred
    pub timestamp: String,
}

impl ApiError {
    /// Create a new API error response with the current timestamp
    pub fn new(error: impl Into<String>) -> Self {
        Self::with_timestamp(error, Utc::now())
    }

    /// Create a new API error response with a custom timestamp
    pub fn with_timestamp(error: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            success: false,
            error: error.into(),
            timestamp: timestamp.to_rfc3339(),
        }
    }
}

/// Current value of the runtime toggles
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub cache_enabled: bool,
    pub auto_epg: bool,
}

/// Partial toggle update; absent fields are left alone
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub cache_enabled: Option<bool>,
    pub auto_epg: Option<bool>,
}

/// Disk usage of the cache root
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size_bytes: u64,
    /// Size rendered as "12.3 MB"
    pub size_human: String,
    pub enabled: bool,
}

impl CacheStats {
    pub fn new(size_bytes: u64, enabled: bool) -> Self {
        Self {
            size_bytes,
            size_human: human_size(size_bytes),
            enabled,
        }
    }
}

/// Tail of the debug log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DebugLogTail {
    pub lines: usize,
    pub content: String,
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
