// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Track file parsing (GPX and GeoJSON).

use crate::geo_utils::LatLng;
use geo::{LineString, MultiLineString};
use geojson::GeoJson;

/// Track formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackFormat {
    Gpx,
    GeoJson,
}

impl TrackFormat {
    /// Declared format from an upload filename extension.
    pub fn from_filename(filename: &str) -> Result<Self, TrackError> {
        let ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "gpx" => Ok(TrackFormat::Gpx),
            "geojson" | "json" => Ok(TrackFormat::GeoJson),
            _ => Err(TrackError::UnsupportedType(filename.to_string())),
        }
    }

    /// Mimetype recorded for the stored track artifact.
    pub fn mimetype(&self) -> &'static str {
        match self {
            TrackFormat::Gpx => "application/gpx+xml",
            TrackFormat::GeoJson => "application/geo+json",
        }
    }
}

/// Parse a track file into an ordered, non-empty list of points.
pub fn read_track(contents: &[u8], format: TrackFormat) -> Result<Vec<LatLng>, TrackError> {
    let points = match format {
        TrackFormat::Gpx => read_gpx(contents)?,
        TrackFormat::GeoJson => read_geojson(contents)?,
    };

    if points.is_empty() {
        return Err(TrackError::Empty);
    }
    if let Some((idx, bad)) = points.iter().enumerate().find(|(_, p)| !p.is_valid()) {
        return Err(TrackError::BadCoordinate(format!(
            "point {} has invalid coordinates ({}, {})",
            idx, bad.lat, bad.lng
        )));
    }

    tracing::debug!(points = points.len(), ?format, "Read track");
    Ok(points)
}

fn read_gpx(contents: &[u8]) -> Result<Vec<LatLng>, TrackError> {
    let data: gpx::Gpx =
        gpx::read(contents).map_err(|e| TrackError::Malformed(format!("GPX: {}", e)))?;

    let to_latlng = |wp: &gpx::Waypoint| {
        let p = wp.point();
        LatLng::new(p.y(), p.x())
    };

    // Track points of every segment, then route points, then waypoints
    let mut points: Vec<LatLng> = data
        .tracks
        .iter()
        .flat_map(|t| t.segments.iter())
        .flat_map(|s| s.points.iter())
        .map(to_latlng)
        .collect();

    if points.is_empty() {
        points = data
            .routes
            .iter()
            .flat_map(|r| r.points.iter())
            .map(to_latlng)
            .collect();
    }

    if points.is_empty() {
        points = data.waypoints.iter().map(to_latlng).collect();
    }

    Ok(points)
}

fn read_geojson(contents: &[u8]) -> Result<Vec<LatLng>, TrackError> {
    let text = std::str::from_utf8(contents)
        .map_err(|e| TrackError::Malformed(format!("invalid UTF-8: {}", e)))?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e: geojson::Error| TrackError::Malformed(format!("GeoJSON: {}", e)))?;

    let geometries: Vec<geojson::Value> = match geojson {
        GeoJson::Geometry(g) => vec![g.value],
        GeoJson::Feature(f) => f.geometry.into_iter().map(|g| g.value).collect(),
        GeoJson::FeatureCollection(fc) => fc
            .features
            .into_iter()
            .filter_map(|f| f.geometry)
            .map(|g| g.value)
            .collect(),
    };

    let mut points = Vec::new();
    for value in geometries {
        points.extend(line_points(value)?);
    }
    Ok(points)
}

fn line_points(value: geojson::Value) -> Result<Vec<LatLng>, TrackError> {
    use std::convert::TryInto;

    let to_latlng = |c: geo::Coord<f64>| LatLng::new(c.y, c.x);

    let line: Result<LineString<f64>, _> = value.clone().try_into();
    if let Ok(line) = line {
        return Ok(line.0.into_iter().map(to_latlng).collect());
    }

    let multi: Result<MultiLineString<f64>, _> = value.try_into();
    if let Ok(multi) = multi {
        return Ok(multi
            .0
            .into_iter()
            .flat_map(|l| l.0.into_iter())
            .map(to_latlng)
            .collect());
    }

    Err(TrackError::UnsupportedGeometry)
}

/// Errors from reading a track file.
#[derive(Debug, thiserror::Error)]
pub enum TrackError {
    #[error("Unsupported track file type: {0}")]
    UnsupportedType(String),

    #[error("Malformed track file: {0}")]
    Malformed(String),

    #[error("Track geometry must be a LineString or MultiLineString")]
    UnsupportedGeometry,

    #[error("Bad coordinate: {0}")]
    BadCoordinate(String),

    #[error("Track contains no points")]
    Empty,
}

impl From<TrackError> for crate::error::AppError {
    fn from(err: TrackError) -> Self {
        crate::error::AppError::Parse(err.to_string())
    }
}
