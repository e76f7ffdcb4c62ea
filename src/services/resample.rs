// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Track resampling.
//!
//! Inserts synthetic points along long segments so that elevation lookups
//! are spaced no further apart than the configured interval.

use crate::geo_utils::{bearing_deg, GeoDistance, LatLng};
use crate::models::AnnotatedPoint;

/// Resamples tracks to a maximum point spacing.
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    geo: GeoDistance,
    max_interval_m: f64,
}

impl Resampler {
    pub fn new(geo: GeoDistance, max_interval_m: f64) -> Self {
        Self {
            geo,
            max_interval_m,
        }
    }

    /// Points inserted into a segment of `seg_m` meters.
    fn insertions(&self, seg_m: f64) -> usize {
        if seg_m > self.max_interval_m {
            (seg_m / self.max_interval_m).floor() as usize
        } else {
            0
        }
    }

    /// Number of points [`Resampler::resample`] would return, without building them.
    pub fn resampled_len(&self, points: &[LatLng]) -> usize {
        points.windows(2).fold(points.len(), |n, pair| {
            let seg_m = self.geo.haversine_km(pair[0], pair[1]) * 1000.0;
            n.saturating_add(self.insertions(seg_m))
        })
    }

    /// Annotate `points` with cumulative distance, inserting points on long segments.
    ///
    /// A segment of length `d > max` gets `floor(d / max)` evenly spaced
    /// inserted points. The original points are kept, in order, with `inserted = false`.
    pub fn resample(&self, points: &[LatLng]) -> Vec<AnnotatedPoint> {
        let Some(&first) = points.first() else {
            return Vec::new();
        };

        let mut out = Vec::with_capacity(points.len());
        out.push(AnnotatedPoint {
            point: first,
            cumdist_km: 0.0,
            inserted: false,
        });

        let mut total_km = 0.0;
        for pair in points.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            let seg_km = self.geo.haversine_km(start, end);
            let seg_m = seg_km * 1000.0;

            let numnew = self.insertions(seg_m);
            if numnew > 0 {
                let each_m = seg_m / (numnew + 1) as f64;
                let bearing = bearing_deg(start, end);
                let mut prev = start;
                for _ in 0..numnew {
                    let next = self.geo.destination(prev, bearing, each_m);
                    total_km += each_m / 1000.0;
                    out.push(AnnotatedPoint {
                        point: next,
                        cumdist_km: total_km,
                        inserted: true,
                    });
                    prev = next;
                }
                total_km += each_m / 1000.0;
            } else {
                total_km += seg_km;
            }

            out.push(AnnotatedPoint {
                point: end,
                cumdist_km: total_km,
                inserted: false,
            });
        }

        out
    }
}

/// Total distance (km) of an annotated track.
pub fn total_km(points: &[AnnotatedPoint]) -> f64 {
    points.last().map(|p| p.cumdist_km).unwrap_or(0.0)
}
