//! Global error handling module for the scraper API
//!
//! This module provides a unified error type that handles all application errors
//! and converts them to appropriate HTTP responses with consistent JSON structure.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ApiError;
use crate::scraper::ScraperError;

/// Application-wide error type that unifies all error sources
#[derive(Debug, Error)]
pub enum AppError {
    /// Upstream fetch failures (network, HTTP status, body read)
    #[error("Scraping error: {0}")]
    Scraping(#[from] ScraperError),

    /// Validation errors (bad request)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation refused because a runtime toggle is off
    #[error("Disabled: {0}")]
    Disabled(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// A blocking task was cancelled or panicked
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl AppError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Create a disabled-feature error
    pub fn disabled(msg: impl Into<String>) -> Self {
        AppError::Disabled(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request - Validation errors
            AppError::Validation(_) => StatusCode::BAD_REQUEST,

            // 409 Conflict - toggled off
            AppError::Disabled(_) => StatusCode::CONFLICT,

            // 502 Bad Gateway - the site failed us
            AppError::Scraping(_) => StatusCode::BAD_GATEWAY,

            AppError::Internal(_) | AppError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Disabled(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
            AppError::Blocking(_) => "Request processing was interrupted".to_string(),

            AppError::Scraping(scraper_err) => match scraper_err {
                ScraperError::NetworkError(msg) => format!("Failed to connect to server: {}", msg),
                ScraperError::HttpError(status) => {
                    format!("Server returned error status: {}", status)
                }
                ScraperError::ResponseError(msg) => format!("Failed to read response: {}", msg),
                ScraperError::ClientError(_) => "HTTP client is unavailable".to_string(),
            },
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.status_code()
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        let error_response = ApiError::new(self.user_message());

        HttpResponse::build(status).json(error_response)
    }
}

/// Result type alias for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;
