// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Batched elevation lookups.

use crate::error::AppError;
use crate::geo_utils::LatLng;
use crate::models::{AnnotatedPoint, ElevationResult};
use crate::services::geo_provider::{GeoProvider, ProviderError};
use std::time::Duration;

/// Splits a track into provider-sized chunks and looks them up one at a time.
#[derive(Debug, Clone, Copy)]
pub struct ElevationClient {
    max_samples: usize,
    timeout: Duration,
}

impl ElevationClient {
    pub fn new(max_samples: usize, timeout: Duration) -> Self {
        Self {
            max_samples: max_samples.max(1),
            timeout,
        }
    }

    /// Look up elevations for every point, preserving order.
    ///
    /// Chunks are requested serially. Any failed or timed-out chunk aborts
    /// the whole lookup.
    pub async fn lookup(
        &self,
        provider: &dyn GeoProvider,
        points: &[AnnotatedPoint],
    ) -> Result<Vec<ElevationResult>, AppError> {
        let locations: Vec<LatLng> = points.iter().map(|p| p.point).collect();
        let mut results = Vec::with_capacity(locations.len());

        for (idx, chunk) in locations.chunks(self.max_samples).enumerate() {
            let chunk_results = tokio::time::timeout(self.timeout, provider.elevation(chunk))
                .await
                .map_err(|_| ProviderError::Timeout(self.timeout))
                .and_then(|r| r)
                .map_err(|e| {
                    tracing::warn!(chunk = idx, points = chunk.len(), error = %e, "Elevation chunk failed");
                    AppError::ElevationLookup(e.to_string())
                })?;

            if chunk_results.len() != chunk.len() {
                tracing::warn!(
                    chunk = idx,
                    requested = chunk.len(),
                    returned = chunk_results.len(),
                    "Elevation result count mismatch"
                );
            }
            results.extend(chunk_results);
        }

        tracing::debug!(
            points = points.len(),
            chunks = points.len().div_ceil(self.max_samples),
            "Elevation lookup complete"
        );
        Ok(results)
    }
}
