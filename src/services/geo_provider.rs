// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geocoding and elevation provider.
//!
//! Handles:
//! - Geocoding free-text start locations
//! - Elevation lookups for encoded point paths
//! - Client-side QPS throttling
//! - Provider status mapping (quota, zero results)

use crate::geo_utils::LatLng;
use crate::models::ElevationResult;
use futures_util::future::BoxFuture;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// External geocoding/elevation service.
pub trait GeoProvider: Send + Sync {
    /// Candidate coordinates for an address, most relevant first.
    fn geocode<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Vec<LatLng>, ProviderError>>;

    /// Elevation for each point, in input order.
    fn elevation<'a>(
        &'a self,
        points: &'a [LatLng],
    ) -> BoxFuture<'a, Result<Vec<ElevationResult>, ProviderError>>;
}

/// Errors from provider calls.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider quota exceeded")]
    RateLimited,

    #[error("Provider returned {status}: {message}")]
    Api { status: String, message: String },

    #[error("Provider call timed out after {0:?}")]
    Timeout(Duration),
}

// ─── Rate limiting ───────────────────────────────────────────────

/// Spaces calls at least `1 / qps` apart.
struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(qps: u32) -> Self {
        Self {
            min_interval: Duration::from_secs(1) / qps.max(1),
            last_call: Mutex::new(None),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let next = prev + self.min_interval;
            let now = Instant::now();
            if next > now {
                tracing::debug!(wait = ?(next - now), "Rate limit: waiting");
                tokio::time::sleep(next - now).await;
            }
        }
        *last = Some(Instant::now());
    }
}

// ─── Google Maps web services ────────────────────────────────────

/// Google Maps geocoding + elevation client.
pub struct GoogleMapsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: RateLimiter,
}

impl GoogleMapsClient {
    pub fn new(base_url: String, api_key: String, qps: u32, timeout: Duration) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            limiter: RateLimiter::new(qps),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        self.limiter.wait().await;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            tracing::warn!("Google Maps rate limit hit (429)");
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: format!("HTTP {}", status),
                message: body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ProviderError::Request(format!("Failed to parse response: {}", e)))
    }

    async fn geocode_impl(&self, address: &str) -> Result<Vec<LatLng>, ProviderError> {
        let body: GeocodeResponse = self
            .get_json("/maps/api/geocode/json", &[("address", address)])
            .await?;
        check_status(&body.status, body.error_message.as_deref())?;

        let results: Vec<LatLng> = body
            .results
            .into_iter()
            .map(|r| LatLng::new(r.geometry.location.lat, r.geometry.location.lng))
            .collect();
        tracing::debug!(address, results = results.len(), "Geocoded address");
        Ok(results)
    }

    async fn elevation_impl(&self, points: &[LatLng]) -> Result<Vec<ElevationResult>, ProviderError> {
        if points.is_empty() {
            return Ok(Vec::new());
        }

        let locations = encode_locations(points)?;
        let body: ElevationResponse = self
            .get_json("/maps/api/elevation/json", &[("locations", locations.as_str())])
            .await?;
        check_status(&body.status, body.error_message.as_deref())?;

        Ok(body
            .results
            .into_iter()
            .map(|r| ElevationResult {
                location: LatLng::new(r.location.lat, r.location.lng),
                elevation: r.elevation,
                resolution: r.resolution.unwrap_or(0.0),
            })
            .collect())
    }
}

impl GeoProvider for GoogleMapsClient {
    fn geocode<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Vec<LatLng>, ProviderError>> {
        Box::pin(self.geocode_impl(address))
    }

    fn elevation<'a>(
        &'a self,
        points: &'a [LatLng],
    ) -> BoxFuture<'a, Result<Vec<ElevationResult>, ProviderError>> {
        Box::pin(self.elevation_impl(points))
    }
}

/// Encoded polyline form of a point list, `enc:<polyline>`.
fn encode_locations(points: &[LatLng]) -> Result<String, ProviderError> {
    let coords = points.iter().map(|p| geo::Coord { x: p.lng, y: p.lat });
    let encoded = polyline::encode_coordinates(coords, 5)
        .map_err(|e| ProviderError::Request(format!("Failed to encode locations: {}", e)))?;
    Ok(format!("enc:{}", encoded))
}

/// Map a Google web service `status` to success or an error.
///
/// `ZERO_RESULTS` is a success with an empty result list.
fn check_status(status: &str, message: Option<&str>) -> Result<(), ProviderError> {
    match status {
        "OK" | "ZERO_RESULTS" => Ok(()),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => {
            tracing::warn!(status, "Google Maps quota exceeded");
            Err(ProviderError::RateLimited)
        }
        other => Err(ProviderError::Api {
            status: other.to_string(),
            message: message.unwrap_or_default().to_string(),
        }),
    }
}

// ─── Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiLocation {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: ApiLocation,
}

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    #[serde(default)]
    results: Vec<ElevationApiResult>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ElevationApiResult {
    elevation: f64,
    location: ApiLocation,
    resolution: Option<f64>,
}
