// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only API tests.
//!
//! These tests verify:
//! 1. Public interests can be browsed anonymously
//! 2. Non-public interests need interest-admin
//! 3. Deactivated routes are hidden
//! 4. Turns, path rows and file downloads

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{
    create_test_app, create_test_jwt, gpx_track, json_body, three_point_track, ElevationMode,
    FakeGeoProvider, TestApp,
};
use runningroutes::models::{Interest, Route, RouteForm, Surface};
use runningroutes::permissions::Role;
use runningroutes::services::TrackUpload;
use tower::ServiceExt;

/// Upload the three point track and save it as a route.
async fn seed_route(app: &TestApp, interest: &Interest, name: &str) -> Route {
    let contents = gpx_track(&three_point_track());
    let upload = app
        .state
        .pipeline
        .ingest_upload(
            app.state.ingest_context(),
            interest,
            TrackUpload {
                filename: "loop.gpx",
                contents: &contents,
                route_id: None,
            },
        )
        .await
        .unwrap();

    let form = RouteForm {
        name: name.to_string(),
        description: Some("Flat and fast".to_string()),
        surface: Surface::Road,
        map: None,
        turns: Some("Start at the fountain\nL on 2nd St".to_string()),
        location: upload.start_location.clone(),
        distance: upload.distance.parse().unwrap(),
        elevation_gain: upload.elevation_gain,
        gpx_file_id: upload.gpx_file_id,
        path_file_id: Some(upload.path_file_id),
        active: true,
    };
    app.state
        .db
        .insert_route(interest.id, &form, "39.000000,-77.000000")
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
}

fn get_with_token(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = create_test_app(FakeGeoProvider::new(ElevationMode::Slope));

    let response = app.router.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_public_interest_anonymous() {
    let app = create_test_app(FakeGeoProvider::new(ElevationMode::Slope));
    let kept = seed_route(&app, &app.public, "Baker Park Loop").await;
    let hidden = seed_route(&app, &app.public, "Old Loop").await;
    app.state
        .db
        .set_route_active(app.public.id, hidden.id, false)
        .unwrap();

    let response = app.router.oneshot(get("/api/fsrc/routes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let routes = json_body(response).await;
    let routes = routes.as_array().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0]["id"], kept.id);
    assert_eq!(routes[0]["name"], "Baker Park Loop");
    assert_eq!(routes[0]["latlng"], "39.000000,-77.000000");
}

#[tokio::test]
async fn test_private_interest_requires_interest_admin() {
    let app = create_test_app(FakeGeoProvider::new(ElevationMode::Slope));
    seed_route(&app, &app.private, "Secret Loop").await;

    let response = app
        .router
        .clone()
        .oneshot(get("/api/hidden/routes"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Wrong interest
    let outsider = create_test_jwt(&[Role::InterestAdmin], &["fsrc"]);
    let response = app
        .router
        .clone()
        .oneshot(get_with_token("/api/hidden/routes", &outsider))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let member = create_test_jwt(&[Role::InterestAdmin], &["hidden"]);
    let response = app
        .router
        .oneshot(get_with_token("/api/hidden/routes", &member))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_invalid_token_rejected_on_public_interest() {
    let app = create_test_app(FakeGeoProvider::new(ElevationMode::Slope));

    let response = app
        .router
        .oneshot(get_with_token("/api/fsrc/routes", "garbage"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_turns() {
    let app = create_test_app(FakeGeoProvider::new(ElevationMode::Slope));
    let route = seed_route(&app, &app.public, "Baker Park Loop").await;

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/api/fsrc/routes/{}/turns", route.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["turns"],
        "Start at the fountain\nL on 2nd St"
    );

    // Deactivated routes are not served
    app.state
        .db
        .set_route_active(app.public.id, route.id, false)
        .unwrap();
    let response = app
        .router
        .oneshot(get(&format!("/api/fsrc/routes/{}/turns", route.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_path_rows() {
    let app = create_test_app(FakeGeoProvider::new(ElevationMode::Slope));
    let route = seed_route(&app, &app.public, "Baker Park Loop").await;

    let response = app
        .router
        .oneshot(get(&format!("/api/fsrc/routes/{}/path", route.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rows = json_body(response).await;
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["lat"], 39.0);
    assert_eq!(rows[0]["cumdist_km"], 0.0);
    // same column values as the stored artifact
    assert_eq!(rows[2]["inserted"], "inserted");
    assert_eq!(rows[3]["inserted"], "");
}

#[tokio::test]
async fn test_file_download() {
    let app = create_test_app(FakeGeoProvider::new(ElevationMode::Slope));
    let route = seed_route(&app, &app.public, "Baker Park Loop").await;

    let response = app
        .router
        .clone()
        .oneshot(get(&format!("/api/fsrc/files/{}", route.gpx_file_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/gpx+xml"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
        "attachment; filename=\"loop.gpx\"; filename*=UTF-8''loop.gpx"
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), gpx_track(&three_point_track()).as_slice());

    // Files of one interest are not reachable through another
    let response = app
        .router
        .oneshot(
            get_with_token(
                &format!("/api/hidden/files/{}", route.gpx_file_id),
                &create_test_jwt(&[Role::SuperAdmin], &[]),
            ),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
