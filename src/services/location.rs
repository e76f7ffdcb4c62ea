// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Start location resolution and snapping.
//!
//! Free-text locations are geocoded through a per-interest cache; the
//! resulting point is snapped to an existing route start when one is
//! within the configured epsilon.

use crate::db::SqliteDb;
use crate::error::AppError;
use crate::geo_utils::{GeoDistance, LatLng};
use crate::services::geo_provider::{GeoProvider, ProviderError};
use chrono::Utc;
use std::time::Duration;

/// Resolves location text to a point and snaps it to nearby known starts.
#[derive(Debug, Clone, Copy)]
pub struct LocationSnapper {
    geo: GeoDistance,
    epsilon_km: f64,
    cache_days: i64,
    timeout: Duration,
}

impl LocationSnapper {
    pub fn new(geo: GeoDistance, epsilon_m: f64, cache_days: i64, timeout: Duration) -> Self {
        Self {
            geo,
            epsilon_km: epsilon_m / 1000.0,
            cache_days,
            timeout,
        }
    }

    /// First stored start within epsilon of `point`, else `point` itself,
    /// as `"lat,lng"` with 6 decimals.
    pub fn snap(&self, point: LatLng, existing: &[String]) -> String {
        let nearby = existing.iter().find(|stored| {
            LatLng::parse_pair(stored)
                .map(|p| self.geo.haversine_km(point, p) <= self.epsilon_km)
                .unwrap_or(false)
        });

        match nearby.and_then(|s| LatLng::parse_pair(s)) {
            Some(p) => {
                tracing::debug!(point = %point.to_fixed6(), snapped = %p.to_fixed6(), "Snapped start location");
                p.to_fixed6()
            }
            None => point.to_fixed6(),
        }
    }

    /// Snap `point` against the interest's route starts.
    ///
    /// If the stored starts cannot be read, the point is used as is.
    pub fn snap_for_interest(&self, db: &SqliteDb, interest_id: i64, point: LatLng) -> String {
        match db.route_start_points(interest_id) {
            Ok(existing) => self.snap(point, &existing),
            Err(e) => {
                tracing::warn!(interest_id, error = %e, "Could not load route starts, not snapping");
                point.to_fixed6()
            }
        }
    }

    /// Resolve location text (`"lat,lng"` or free text) to a point.
    ///
    /// Free text uses the location cache when fresh, otherwise the
    /// geocoder's first result. Cache failures are logged and ignored.
    pub async fn resolve(
        &self,
        db: &SqliteDb,
        provider: &dyn GeoProvider,
        interest_id: i64,
        location: &str,
    ) -> Result<LatLng, AppError> {
        let location = location.trim();

        if let Some(point) = LatLng::parse_pair(location) {
            if let Err(e) =
                db.upsert_location(interest_id, location, point.lat, point.lng, None, false)
            {
                tracing::warn!(location, error = %e, "Failed to cache location");
            }
            return Ok(point);
        }

        let cached = db.get_location(interest_id, location).unwrap_or_else(|e| {
            tracing::warn!(location, error = %e, "Location cache read failed");
            None
        });
        if let Some(entry) = &cached {
            if entry.is_fresh(Utc::now(), self.cache_days) {
                if let (Some(lat), Some(lng)) = (entry.lat, entry.lng) {
                    return Ok(LatLng::new(lat, lng));
                }
            }
        }

        let point = self
            .geocode_first(provider, location)
            .await?
            .ok_or_else(|| AppError::Geocode(format!("No results for {:?}", location)))?;

        if let Err(e) =
            db.upsert_location(interest_id, location, point.lat, point.lng, Some(Utc::now()), true)
        {
            tracing::warn!(location, error = %e, "Failed to cache location");
        }
        tracing::info!(interest_id, location, point = %point.to_fixed6(), "Geocoded location");
        Ok(point)
    }

    /// Resolve and snap, producing the value stored in a route's `latlng`.
    pub async fn snap_location(
        &self,
        db: &SqliteDb,
        provider: &dyn GeoProvider,
        interest_id: i64,
        location: &str,
    ) -> Result<String, AppError> {
        let point = self.resolve(db, provider, interest_id, location).await?;
        Ok(self.snap_for_interest(db, interest_id, point))
    }

    /// Whether `location` can be resolved to a point.
    pub async fn check_location(&self, provider: &dyn GeoProvider, location: &str) -> bool {
        if LatLng::parse_pair(location.trim()).is_some() {
            return true;
        }
        match self.geocode_first(provider, location.trim()).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!(location, error = %e, "Location check failed");
                false
            }
        }
    }

    /// The geocoder's first (most relevant) result.
    async fn geocode_first(
        &self,
        provider: &dyn GeoProvider,
        address: &str,
    ) -> Result<Option<LatLng>, AppError> {
        let results = tokio::time::timeout(self.timeout, provider.geocode(address))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))
            .and_then(|r| r)
            .map_err(|e| AppError::Geocode(e.to_string()))?;

        if results.len() > 1 {
            tracing::debug!(address, candidates = results.len(), "Ambiguous geocode, using first result");
        }
        Ok(results.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ElevationResult;
    use futures_util::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingGeocoder {
        results: Vec<LatLng>,
        calls: AtomicUsize,
    }

    impl CountingGeocoder {
        fn new(results: Vec<LatLng>) -> Self {
            Self {
                results,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl GeoProvider for CountingGeocoder {
        fn geocode<'a>(
            &'a self,
            _address: &'a str,
        ) -> BoxFuture<'a, Result<Vec<LatLng>, ProviderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let results = self.results.clone();
            Box::pin(async move { Ok(results) })
        }

        fn elevation<'a>(
            &'a self,
            _points: &'a [LatLng],
        ) -> BoxFuture<'a, Result<Vec<ElevationResult>, ProviderError>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    fn snapper() -> LocationSnapper {
        LocationSnapper::new(GeoDistance::new(6371.0), 100.0, 30, Duration::from_secs(5))
    }

    fn db() -> (SqliteDb, i64) {
        let db = SqliteDb::open_in_memory().unwrap();
        let interest = db.upsert_interest("fsrc", "", true).unwrap();
        (db, interest.id)
    }

    #[test]
    fn test_snap_within_epsilon_returns_stored_point() {
        let stored = vec!["39.414000,-77.418000".to_string()];
        // ~55m north
        let near = LatLng::new(39.4145, -77.418);
        assert_eq!(snapper().snap(near, &stored), "39.414000,-77.418000");
    }

    #[test]
    fn test_snap_outside_epsilon_keeps_point() {
        let stored = vec!["39.414000,-77.418000".to_string()];
        // ~1.1km north
        let far = LatLng::new(39.424, -77.418);
        assert_eq!(snapper().snap(far, &stored), "39.424000,-77.418000");
    }

    #[test]
    fn test_snap_takes_first_match_and_skips_garbage() {
        let stored = vec![
            "not a point".to_string(),
            "39.414100,-77.418000".to_string(),
            "39.414000,-77.418000".to_string(),
        ];
        let p = LatLng::new(39.414, -77.418);
        assert_eq!(snapper().snap(p, &stored), "39.414100,-77.418000");
    }

    #[tokio::test]
    async fn test_resolve_latlng_without_geocoding() {
        let (db, interest_id) = db();
        let geocoder = CountingGeocoder::new(vec![]);

        let p = snapper()
            .resolve(&db, &geocoder, interest_id, "39.4, -77.4")
            .await
            .unwrap();

        assert_eq!(p, LatLng::new(39.4, -77.4));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
        let entry = db.get_location(interest_id, "39.4, -77.4").unwrap().unwrap();
        assert!(!entry.geoloc_required);
    }

    #[tokio::test]
    async fn test_resolve_uses_first_result_and_caches() {
        let (db, interest_id) = db();
        let geocoder = CountingGeocoder::new(vec![LatLng::new(39.41, -77.42), LatLng::new(1.0, 1.0)]);
        let s = snapper();

        let first = s.resolve(&db, &geocoder, interest_id, "Baker Park").await.unwrap();
        let second = s.resolve(&db, &geocoder, interest_id, "Baker Park").await.unwrap();

        assert_eq!(first, LatLng::new(39.41, -77.42));
        assert_eq!(second, first);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_is_refreshed() {
        let (db, interest_id) = db();
        let old = Utc::now() - chrono::Duration::days(45);
        db.upsert_location(interest_id, "Baker Park", 1.0, 1.0, Some(old), true)
            .unwrap();
        let geocoder = CountingGeocoder::new(vec![LatLng::new(39.41, -77.42)]);

        let p = snapper()
            .resolve(&db, &geocoder, interest_id, "Baker Park")
            .await
            .unwrap();

        assert_eq!(p, LatLng::new(39.41, -77.42));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_geocode_results_is_error() {
        let (db, interest_id) = db();
        let geocoder = CountingGeocoder::new(vec![]);
        let err = snapper()
            .resolve(&db, &geocoder, interest_id, "Nowhere at all")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Geocode(_)));
    }

    #[tokio::test]
    async fn test_check_location() {
        let s = snapper();
        assert!(s.check_location(&CountingGeocoder::new(vec![]), "1.5,2.5").await);
        assert!(!s.check_location(&CountingGeocoder::new(vec![]), "Nowhere").await);
        assert!(
            s.check_location(&CountingGeocoder::new(vec![LatLng::new(1.0, 2.0)]), "Somewhere")
                .await
        );
    }
}
