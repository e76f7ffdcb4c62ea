// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use futures_util::future::BoxFuture;
use runningroutes::config::Config;
use runningroutes::db::SqliteDb;
use runningroutes::geo_utils::{GeoDistance, LatLng};
use runningroutes::middleware::auth::create_jwt;
use runningroutes::models::{ElevationResult, Interest};
use runningroutes::permissions::Role;
use runningroutes::routes::create_router;
use runningroutes::services::{GeoProvider, ProviderError};
use runningroutes::AppState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// How the fake provider answers elevation requests.
#[allow(dead_code)]
#[derive(Clone, Copy)]
pub enum ElevationMode {
    /// 1m per 0.0001 degrees of latitude above 39N
    Slope,
    /// Never answers
    Hang,
    /// Returns a provider error
    Fail,
}

/// Offline geocoding/elevation provider.
pub struct FakeGeoProvider {
    pub mode: ElevationMode,
    pub places: HashMap<String, LatLng>,
    pub elevation_calls: AtomicUsize,
    pub geocode_calls: AtomicUsize,
}

#[allow(dead_code)]
impl FakeGeoProvider {
    pub fn new(mode: ElevationMode) -> Self {
        Self {
            mode,
            places: HashMap::new(),
            elevation_calls: AtomicUsize::new(0),
            geocode_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_place(mut self, address: &str, point: LatLng) -> Self {
        self.places.insert(address.to_string(), point);
        self
    }

    pub fn elevation_calls(&self) -> usize {
        self.elevation_calls.load(Ordering::SeqCst)
    }
}

impl GeoProvider for FakeGeoProvider {
    fn geocode<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Vec<LatLng>, ProviderError>> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        let found: Vec<LatLng> = self.places.get(address).copied().into_iter().collect();
        Box::pin(async move { Ok(found) })
    }

    fn elevation<'a>(
        &'a self,
        points: &'a [LatLng],
    ) -> BoxFuture<'a, Result<Vec<ElevationResult>, ProviderError>> {
        self.elevation_calls.fetch_add(1, Ordering::SeqCst);
        let mode = self.mode;
        Box::pin(async move {
            match mode {
                ElevationMode::Slope => Ok(points
                    .iter()
                    .map(|p| ElevationResult {
                        location: *p,
                        elevation: (p.lat - 39.0) * 10_000.0,
                        resolution: 9.5,
                    })
                    .collect()),
                ElevationMode::Hang => std::future::pending().await,
                ElevationMode::Fail => Err(ProviderError::Api {
                    status: "UNKNOWN_ERROR".to_string(),
                    message: "try again".to_string(),
                }),
            }
        })
    }
}

/// Test application with its state and scratch file folder.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub provider: Arc<FakeGeoProvider>,
    pub public: Interest,
    pub private: Interest,
    _files: tempfile::TempDir,
}

/// Config with a scratch file folder and a short provider timeout.
#[allow(dead_code)]
pub fn test_config(files: &tempfile::TempDir) -> Config {
    let mut config = Config::test_default();
    config.file_folder = files.path().to_path_buf();
    config.pipeline.max_dist_interval_m = 50.0;
    config.pipeline.provider_timeout_secs = 1;
    config
}

/// Create a test app with an in-memory database and a fake provider.
/// Interests "fsrc" (public) and "hidden" (private) exist.
#[allow(dead_code)]
pub fn create_test_app(provider: FakeGeoProvider) -> TestApp {
    let files = tempfile::tempdir().expect("tempdir");
    let config = test_config(&files);
    let db = SqliteDb::open_in_memory().expect("in-memory db");
    let public = db.upsert_interest("fsrc", "Frederick Steeplechasers", true).unwrap();
    let private = db.upsert_interest("hidden", "Private club", false).unwrap();

    let provider = Arc::new(provider);
    let state = Arc::new(AppState::new(config, db, provider.clone()));

    TestApp {
        router: create_router(state.clone()),
        state,
        provider,
        public,
        private,
        _files: files,
    }
}

/// Create a session token signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(roles: &[Role], interests: &[&str]) -> String {
    let interests: Vec<String> = interests.iter().map(|s| s.to_string()).collect();
    create_jwt("1001", roles, &interests, &Config::test_default().jwt_signing_key)
        .expect("Failed to create JWT")
}

/// GPX document with one track segment through `points`.
#[allow(dead_code)]
pub fn gpx_track(points: &[LatLng]) -> Vec<u8> {
    let mut s = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="runningroutes-tests" xmlns="http://www.topografix.com/GPX/1/1">
<trk><name>test</name><trkseg>
"#,
    );
    for p in points {
        s.push_str(&format!("<trkpt lat=\"{}\" lon=\"{}\"></trkpt>\n", p.lat, p.lng));
    }
    s.push_str("</trkseg></trk></gpx>\n");
    s.into_bytes()
}

/// Three points due north: 30m then 70m apart (100m total).
///
/// With a 50m max interval only the second segment gets a point inserted.
#[allow(dead_code)]
pub fn three_point_track() -> Vec<LatLng> {
    let geo = GeoDistance::new(6371.0);
    let a = LatLng::new(39.0, -77.0);
    let b = geo.destination(a, 0.0, 30.0);
    let c = geo.destination(b, 0.0, 70.0);
    vec![a, b, c]
}

pub const BOUNDARY: &str = "runningroutes-test-boundary";

/// multipart/form-data body with a single file field.
#[allow(dead_code)]
pub fn multipart_body(field: &str, filename: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/gpx+xml\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("JSON body")
}
