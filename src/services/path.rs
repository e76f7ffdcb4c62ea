// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Path artifact assembly and (de)serialization.
//!
//! Column order: lat, lng, orig_ele, res, ele, cumdist_km, inserted.

use crate::error::AppError;
use crate::models::{AnnotatedPoint, ElevationResult, ElevationSample};

/// Merge annotations, raw elevations and smoothed elevations into rows.
///
/// Coordinates are the ones the elevation provider reported. The three
/// inputs should have the same length. If they don't, a warning is logged
/// and rows are produced for the shortest common length.
pub fn combine(
    points: &[AnnotatedPoint],
    raw: &[ElevationResult],
    smoothed: &[f64],
) -> Vec<ElevationSample> {
    if points.len() != raw.len() || points.len() != smoothed.len() {
        tracing::warn!(
            points = points.len(),
            elevations = raw.len(),
            smoothed = smoothed.len(),
            "Path length mismatch, truncating to shortest"
        );
    }

    points
        .iter()
        .zip(raw)
        .zip(smoothed)
        .map(|((p, r), &ele)| ElevationSample {
            lat: r.location.lat,
            lng: r.location.lng,
            orig_ele: r.elevation,
            res: r.resolution,
            ele,
            cumdist_km: p.cumdist_km,
            inserted: p.inserted,
        })
        .collect()
}

/// Serialize rows as CSV with a header line.
pub fn to_csv(samples: &[ElevationSample]) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for sample in samples {
        writer
            .serialize(sample)
            .map_err(|e| AppError::Storage(format!("Failed to write path row: {}", e)))?;
    }
    writer
        .into_inner()
        .map_err(|e| AppError::Storage(format!("Failed to finish path artifact: {}", e)))
}

/// Parse a stored path artifact.
pub fn from_csv(bytes: &[u8]) -> Result<Vec<ElevationSample>, AppError> {
    let mut reader = csv::Reader::from_reader(bytes);
    reader
        .deserialize()
        .collect::<Result<Vec<ElevationSample>, _>>()
        .map_err(|e| AppError::Storage(format!("Corrupt path artifact: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::LatLng;

    fn point(lat: f64, cumdist_km: f64, inserted: bool) -> AnnotatedPoint {
        AnnotatedPoint {
            point: LatLng::new(lat, -77.0),
            cumdist_km,
            inserted,
        }
    }

    fn raw(lat: f64, elevation: f64) -> ElevationResult {
        ElevationResult {
            location: LatLng::new(lat, -77.0),
            elevation,
            resolution: 4.5,
        }
    }

    #[test]
    fn test_combine_aligned() {
        let rows = combine(
            &[point(39.0, 0.0, false), point(39.001, 0.1, true)],
            &[raw(39.0, 100.0), raw(39.001, 101.0)],
            &[100.5, 100.7],
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].orig_ele, 101.0);
        assert_eq!(rows[1].ele, 100.7);
        assert!(rows[1].inserted);
    }

    #[test]
    fn test_combine_truncates_on_mismatch() {
        let rows = combine(
            &[point(39.0, 0.0, false), point(39.001, 0.1, false), point(39.002, 0.2, false)],
            &[raw(39.0, 100.0), raw(39.001, 101.0)],
            &[100.0, 101.0, 102.0],
        );
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_csv_layout() {
        let rows = combine(
            &[point(39.5, 0.0, false), point(39.25, 0.05, true)],
            &[raw(39.5, 100.0), raw(39.25, 101.0)],
            &[100.25, 100.75],
        );
        let text = String::from_utf8(to_csv(&rows).unwrap()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "lat,lng,orig_ele,res,ele,cumdist_km,inserted");
        assert_eq!(lines[1], "39.5,-77.0,100.0,4.5,100.25,0.0,");
        assert_eq!(lines[2], "39.25,-77.0,101.0,4.5,100.75,0.05,inserted");

        let parsed = from_csv(text.as_bytes()).unwrap();
        assert_eq!(parsed, rows);
    }

    #[test]
    fn test_corrupt_artifact() {
        assert!(matches!(
            from_csv(b"lat,lng\nx,y\n"),
            Err(AppError::Storage(_))
        ));
    }
}
