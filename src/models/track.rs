// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Point types flowing through the ingestion pipeline.

use crate::geo_utils::LatLng;
use serde::{Deserialize, Serialize};

/// A path point with its distance along the track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotatedPoint {
    pub point: LatLng,
    /// Cumulative distance from the track start (km)
    pub cumdist_km: f64,
    /// True if the resampler synthesized this point
    pub inserted: bool,
}

/// One elevation lookup result as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationResult {
    pub location: LatLng,
    /// Elevation (m)
    pub elevation: f64,
    /// Provider sampling resolution (m)
    pub resolution: f64,
}

/// A fully processed path row, persisted in the path artifact.
///
/// Field names are the artifact's column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationSample {
    pub lat: f64,
    pub lng: f64,
    /// Raw provider elevation (m)
    pub orig_ele: f64,
    /// Provider resolution (m)
    pub res: f64,
    /// Smoothed elevation (m)
    pub ele: f64,
    pub cumdist_km: f64,
    #[serde(with = "inserted_flag")]
    pub inserted: bool,
}

/// Path artifacts mark synthesized rows with the literal `inserted`.
mod inserted_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "inserted" } else { "" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(raw == "inserted")
    }
}
