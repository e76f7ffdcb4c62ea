// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Permission denied")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Malformed or empty track upload.
    #[error("Could not read track: {0}")]
    Parse(String),

    /// Elevation provider call failed or timed out.
    #[error("Elevation lookup failed: {0}")]
    ElevationLookup(String),

    #[error("Geocoding failed: {0}")]
    Geocode(String),

    /// Writing or reading a file artifact failed.
    #[error("File storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Pipeline stage reported to the uploader, if the error belongs to one.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            AppError::Parse(_) => Some("parse"),
            AppError::ElevationLookup(_) => Some("elevation"),
            AppError::Geocode(_) => Some("geocode"),
            AppError::Storage(_) => Some("storage"),
            _ => None,
        }
    }

    /// Report a database failure while writing artifacts as a storage failure.
    pub fn into_storage(self) -> Self {
        match self {
            AppError::Database(msg) => AppError::Storage(msg),
            other => other,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ElevationLookup(_) | AppError::Geocode(_))
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Parse(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "parse_error",
                Some(msg.clone()),
            ),
            AppError::ElevationLookup(msg) => {
                tracing::warn!(error = %msg, "Elevation lookup failed");
                (StatusCode::BAD_GATEWAY, "elevation_error", Some(msg.clone()))
            }
            AppError::Geocode(msg) => {
                (StatusCode::BAD_GATEWAY, "geocode_error", Some(msg.clone()))
            }
            AppError::Storage(msg) => {
                tracing::error!(error = %msg, "File storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            stage: self.stage(),
            details,
            retryable: self.is_retryable(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
