// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Cached geocoding results for free-text locations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A location string and its last known coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationEntry {
    pub id: i64,
    pub interest_id: i64,
    /// Location exactly as entered
    pub location: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Last time the geocoder was consulted
    pub cached: Option<DateTime<Utc>>,
    /// False when the location was already "lat,lng"
    pub geoloc_required: bool,
}

impl LocationEntry {
    /// True if the cached coordinates are usable at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, cache_days: i64) -> bool {
        if self.lat.is_none() || self.lng.is_none() {
            return false;
        }
        if !self.geoloc_required {
            return true;
        }
        match self.cached {
            Some(cached) => now.signed_duration_since(cached) <= chrono::Duration::days(cache_days),
            None => false,
        }
    }
}
