// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use runningroutes::error::AppError;

async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_pipeline_stages() {
    assert_eq!(AppError::Parse("x".into()).stage(), Some("parse"));
    assert_eq!(AppError::ElevationLookup("x".into()).stage(), Some("elevation"));
    assert_eq!(AppError::Geocode("x".into()).stage(), Some("geocode"));
    assert_eq!(AppError::Storage("x".into()).stage(), Some("storage"));
    assert_eq!(AppError::BadRequest("x".into()).stage(), None);
    assert_eq!(AppError::Forbidden.stage(), None);
}

#[test]
fn test_retryable() {
    assert!(AppError::ElevationLookup("timed out".into()).is_retryable());
    assert!(AppError::Geocode("over query limit".into()).is_retryable());

    assert!(!AppError::Parse("no points".into()).is_retryable());
    assert!(!AppError::Storage("disk full".into()).is_retryable());
    assert!(!AppError::NotFound("Route 1".into()).is_retryable());
}

#[tokio::test]
async fn test_parse_error_response() {
    let (status, body) = body_json(AppError::Parse("Track has no points".into())).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "parse_error");
    assert_eq!(body["stage"], "parse");
    assert_eq!(body["details"], "Track has no points");
    assert_eq!(body["retryable"], false);
}

#[tokio::test]
async fn test_elevation_error_response() {
    let (status, body) = body_json(AppError::ElevationLookup("timed out".into())).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["stage"], "elevation");
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_internal_errors_hide_details() {
    let (status, body) = body_json(AppError::Database("no such table: routes".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("details").is_none());
    assert!(body.get("stage").is_none());

    let (status, body) = body_json(AppError::Storage("/srv/files/fsrc: EACCES".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["stage"], "storage");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_auth_error_responses() {
    let (status, body) = body_json(AppError::Unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = body_json(AppError::Forbidden).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
