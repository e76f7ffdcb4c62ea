// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Running route model and admin form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Running surface of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    #[default]
    Road,
    Trail,
    Mixed,
}

impl Surface {
    pub fn as_str(&self) -> &'static str {
        match self {
            Surface::Road => "road",
            Surface::Trail => "trail",
            Surface::Mixed => "mixed",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Surface {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "road" => Ok(Surface::Road),
            "trail" => Ok(Surface::Trail),
            "mixed" => Ok(Surface::Mixed),
            other => Err(format!("unknown surface {:?}", other)),
        }
    }
}

/// Stored route record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: i64,
    pub interest_id: i64,
    pub name: String,
    /// Distance in miles
    pub distance: f64,
    /// Start location as entered (address or "lat, lng")
    pub start_location: String,
    /// Snapped start point, "lat,lng" with 6 decimals
    pub latlng: String,
    pub surface: Surface,
    /// Elevation gain (ft)
    pub elevation_gain: i64,
    /// URL of the route on mapmyrun, strava, etc.
    pub map: Option<String>,
    /// Turn-by-turn directions, one turn per line
    pub turns: Option<String>,
    pub gpx_file_id: String,
    pub path_file_id: Option<String>,
    pub description: Option<String>,
    /// False once the route has been deleted from the admin UI
    pub active: bool,
}

/// Create/update form submitted by route admins.
///
/// `distance`, `elevation_gain` and `location` are prefilled from the upload
/// response and may be overridden.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RouteForm {
    #[validate(length(min = 1, max = 256, message = "route name is required"))]
    pub name: String,
    #[validate(length(max = 512))]
    pub description: Option<String>,
    #[serde(default)]
    pub surface: Surface,
    #[validate(url)]
    pub map: Option<String>,
    pub turns: Option<String>,
    #[validate(length(min = 1, max = 512, message = "location is required"))]
    pub location: String,
    #[validate(range(min = 0.0))]
    pub distance: f64,
    #[validate(range(min = 0))]
    pub elevation_gain: i64,
    #[validate(length(min = 1, message = "gpx file is required"))]
    pub gpx_file_id: String,
    pub path_file_id: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RouteForm {
    /// File ids that should point at the route once it is saved.
    pub fn file_ids(&self) -> Vec<String> {
        std::iter::once(self.gpx_file_id.clone())
            .chain(self.path_file_id.clone())
            .collect()
    }
}
