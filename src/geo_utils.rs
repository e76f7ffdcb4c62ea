// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Spherical geometry helpers used by the ingestion pipeline.
//!
//! All distances use a configurable earth radius so the values match the
//! ones used when existing routes were processed.

use serde::{Deserialize, Serialize};

/// Kilometers per statute mile.
pub const KM_PER_MILE: f64 = 1.609344;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Parse `"lat,lng"` (or `"lat, lng"`): exactly two comma separated floats.
    pub fn parse_pair(text: &str) -> Option<Self> {
        let mut parts = text.split(',');
        let lat = parts.next()?.trim().parse::<f64>().ok()?;
        let lng = parts.next()?.trim().parse::<f64>().ok()?;
        if parts.next().is_some() || !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        Some(Self { lat, lng })
    }

    /// Normalized storage form, `"lat,lng"` with 6 decimals.
    pub fn to_fixed6(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lng)
    }

    /// Display form used for upload start locations, `"lat, lng"`.
    pub fn to_display(&self) -> String {
        format!("{:.6}, {:.6}", self.lat, self.lng)
    }

    /// True if both coordinates are finite and within WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle calculations on a sphere of the given radius.
#[derive(Debug, Clone, Copy)]
pub struct GeoDistance {
    earth_radius_km: f64,
}

impl GeoDistance {
    pub fn new(earth_radius_km: f64) -> Self {
        Self { earth_radius_km }
    }

    /// Haversine distance in kilometers.
    pub fn haversine_km(&self, a: LatLng, b: LatLng) -> f64 {
        let lat1 = a.lat.to_radians();
        let lat2 = b.lat.to_radians();
        let dlat = (b.lat - a.lat).to_radians();
        let dlng = (b.lng - a.lng).to_radians();

        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
        self.earth_radius_km * c
    }

    /// Point reached travelling `meters` from `origin` along `bearing_deg`.
    pub fn destination(&self, origin: LatLng, bearing_deg: f64, meters: f64) -> LatLng {
        let delta = meters / 1000.0 / self.earth_radius_km;
        let theta = bearing_deg.to_radians();
        let lat1 = origin.lat.to_radians();
        let lng1 = origin.lng.to_radians();

        let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
        let lng2 = lng1
            + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

        // normalise to -180..180
        let lng2 = (lng2.to_degrees() + 540.0) % 360.0 - 180.0;
        LatLng::new(lat2.to_degrees(), lng2)
    }
}

/// Initial great-circle bearing from `a` to `b`, degrees in [0, 360).
pub fn bearing_deg(a: LatLng, b: LatLng) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let y = dlng.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlng.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const RADIUS: f64 = 6371.0;

    #[test]
    fn test_haversine_london_paris() {
        let geo = GeoDistance::new(RADIUS);
        let london = LatLng::new(51.5074, -0.1278);
        let paris = LatLng::new(48.8566, 2.3522);
        let km = geo.haversine_km(london, paris);
        assert!((km - 343.5).abs() < 1.0, "got {}", km);
    }

    #[test]
    fn test_haversine_same_point_is_zero() {
        let geo = GeoDistance::new(RADIUS);
        let p = LatLng::new(39.4, -77.4);
        assert_eq!(geo.haversine_km(p, p), 0.0);
    }

    #[test]
    fn test_bearing_cardinal_directions() {
        let origin = LatLng::new(0.0, 0.0);
        assert!((bearing_deg(origin, LatLng::new(1.0, 0.0)) - 0.0).abs() < 1e-9);
        assert!((bearing_deg(origin, LatLng::new(0.0, 1.0)) - 90.0).abs() < 1e-9);
        assert!((bearing_deg(origin, LatLng::new(-1.0, 0.0)) - 180.0).abs() < 1e-9);
        assert!((bearing_deg(origin, LatLng::new(0.0, -1.0)) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_destination_matches_distance_and_bearing() {
        let geo = GeoDistance::new(RADIUS);
        let start = LatLng::new(39.41, -77.41);
        let end = geo.destination(start, 45.0, 1500.0);

        let km = geo.haversine_km(start, end);
        assert!((km - 1.5).abs() < 1e-6, "got {}", km);
        assert!((bearing_deg(start, end) - 45.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            LatLng::parse_pair("39.1, -77.2"),
            Some(LatLng::new(39.1, -77.2))
        );
        assert_eq!(
            LatLng::parse_pair("39.1,-77.2"),
            Some(LatLng::new(39.1, -77.2))
        );
        assert_eq!(LatLng::parse_pair("1600 Pennsylvania Ave"), None);
        assert_eq!(LatLng::parse_pair("1,2,3"), None);
        assert_eq!(LatLng::parse_pair("Frederick, MD"), None);
    }

    #[test]
    fn test_formatting() {
        let p = LatLng::new(39.4, -77.45);
        assert_eq!(p.to_fixed6(), "39.400000,-77.450000");
        assert_eq!(p.to_display(), "39.400000, -77.450000");
    }
}
