// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route ingestion pipeline.
//!
//! Handles the upload workflow:
//! 1. Parse the track file
//! 2. Resample so points are at most the max interval apart
//! 3. Look up elevations in provider-sized chunks
//! 4. Smooth elevations and compute gain
//! 5. Store the track and path artifacts (and update the route on re-upload)
//!
//! Steps 1-4 finish before anything is written. If a write fails, whatever
//! this upload already wrote is removed again.

use crate::config::PipelineSettings;
use crate::db::{NewFile, SqliteDb, TrackSummary};
use crate::error::{AppError, Result};
use crate::geo_utils::{GeoDistance, LatLng, KM_PER_MILE};
use crate::models::file::{PATH_MIMETYPE, PATH_SUFFIX};
use crate::models::{ElevationSample, Interest, Route};
use crate::services::elevation::ElevationProcessor;
use crate::services::elevation_client::ElevationClient;
use crate::services::files::FileStore;
use crate::services::geo_provider::GeoProvider;
use crate::services::location::LocationSnapper;
use crate::services::path;
use crate::services::resample::{self, Resampler};
use crate::services::track::{self, TrackFormat};
use serde::Serialize;
use std::time::Duration;

/// Collaborators the pipeline reads from and writes to.
#[derive(Clone, Copy)]
pub struct IngestContext<'a> {
    pub db: &'a SqliteDb,
    pub files: &'a FileStore,
    pub provider: &'a dyn GeoProvider,
}

/// An uploaded track file.
#[derive(Debug, Clone, Copy)]
pub struct TrackUpload<'a> {
    pub filename: &'a str,
    pub contents: &'a [u8],
    /// Existing route to replace the track of
    pub route_id: Option<i64>,
}

/// Computed track data, before anything is stored.
#[derive(Debug, Clone)]
pub struct ProcessedTrack {
    /// First point of the uploaded track
    pub start: LatLng,
    pub samples: Vec<ElevationSample>,
    pub distance_mi: f64,
    pub elevation_gain: i64,
}

/// Upload response, used to prefill the route form.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub gpx_file_id: String,
    pub path_file_id: String,
    /// Miles, one decimal
    pub distance: String,
    pub elevation_gain: i64,
    /// `"lat, lng"` of the first track point
    pub start_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<Route>,
}

/// The full ingestion pipeline, configured once at startup.
#[derive(Debug, Clone, Copy)]
pub struct IngestPipeline {
    resampler: Resampler,
    max_path_points: usize,
    elevations: ElevationClient,
    processor: ElevationProcessor,
    snapper: LocationSnapper,
}

impl IngestPipeline {
    pub fn new(settings: &PipelineSettings) -> Self {
        let geo = GeoDistance::new(settings.earth_radius_km);
        let timeout = Duration::from_secs(settings.provider_timeout_secs);
        Self {
            resampler: Resampler::new(geo, settings.max_dist_interval_m),
            max_path_points: settings.max_path_points,
            elevations: ElevationClient::new(settings.elevation_max_samples, timeout),
            processor: ElevationProcessor::new(
                settings.smoothing_window,
                settings.elev_up_threshold,
                settings.elev_down_threshold,
            ),
            snapper: LocationSnapper::new(
                geo,
                settings.route_loc_epsilon_m,
                settings.location_cache_days,
                timeout,
            ),
        }
    }

    pub fn snapper(&self) -> &LocationSnapper {
        &self.snapper
    }

    /// Parse, resample, look up and smooth a track. Writes nothing.
    pub async fn process_track(
        &self,
        provider: &dyn GeoProvider,
        format: TrackFormat,
        contents: &[u8],
    ) -> Result<ProcessedTrack> {
        let points = track::read_track(contents, format)?;
        let planned = self.resampler.resampled_len(&points);
        if planned > self.max_path_points {
            tracing::warn!(
                points = points.len(),
                planned,
                max = self.max_path_points,
                "Resampled track too long"
            );
            return Err(AppError::Parse(format!(
                "track would need {} points after resampling, limit is {}",
                planned, self.max_path_points
            )));
        }
        let annotated = self.resampler.resample(&points);
        let inserted = annotated.iter().filter(|p| p.inserted).count();

        let raw = self.elevations.lookup(provider, &annotated).await?;
        let raw_elevations: Vec<f64> = raw.iter().map(|r| r.elevation).collect();
        let smoothed = self.processor.smooth(&raw_elevations);
        let elevation_gain = self.processor.gain(&smoothed);

        let samples = path::combine(&annotated, &raw, &smoothed);
        let distance_mi = resample::total_km(&annotated) / KM_PER_MILE;

        tracing::info!(
            points = points.len(),
            inserted,
            samples = samples.len(),
            distance_mi,
            elevation_gain,
            "Processed track"
        );

        Ok(ProcessedTrack {
            start: points[0],
            samples,
            distance_mi,
            elevation_gain,
        })
    }

    /// Run the pipeline on an upload and store its artifacts.
    pub async fn ingest_upload(
        &self,
        ctx: IngestContext<'_>,
        interest: &Interest,
        upload: TrackUpload<'_>,
    ) -> Result<UploadResult> {
        tracing::info!(
            interest = %interest.slug,
            filename = upload.filename,
            bytes = upload.contents.len(),
            route_id = ?upload.route_id,
            "Ingesting upload"
        );

        let existing = match upload.route_id {
            Some(id) => Some(
                ctx.db
                    .get_route(interest.id, id)?
                    .ok_or_else(|| AppError::NotFound(format!("Route {}", id)))?,
            ),
            None => None,
        };

        let format = TrackFormat::from_filename(upload.filename)?;
        let processed = self
            .process_track(ctx.provider, format, upload.contents)
            .await?;
        let path_bytes = path::to_csv(&processed.samples)?;

        let mut writes = UploadWrites::new(ctx, &interest.slug);
        match self
            .store(ctx, interest, upload, format, existing.as_ref(), &processed, &path_bytes, &mut writes)
            .await
        {
            Ok(result) => {
                writes.finish(existing.as_ref()).await;
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(interest = %interest.slug, error = %e, "Upload failed while storing, cleaning up");
                writes.rollback().await;
                Err(e.into_storage())
            }
        }
    }

    /// Remove the artifacts of a fresh upload that never became a route.
    ///
    /// Re-uploads are left alone: their path artifact belongs to the route.
    pub async fn discard_upload(
        &self,
        ctx: IngestContext<'_>,
        interest: &Interest,
        upload: &UploadResult,
    ) {
        if upload.route.is_some() {
            tracing::warn!(interest = %interest.slug, gpx_file_id = %upload.gpx_file_id, "Not discarding a route's track");
            return;
        }
        let fileids = vec![upload.gpx_file_id.clone(), upload.path_file_id.clone()];
        let writes = UploadWrites {
            ctx,
            interest: &interest.slug,
            new_blobs: fileids.clone(),
            new_records: fileids,
            overwritten: None,
        };
        writes.rollback().await;
        tracing::info!(interest = %interest.slug, gpx_file_id = %upload.gpx_file_id, "Discarded upload");
    }

    #[allow(clippy::too_many_arguments)]
    async fn store(
        &self,
        ctx: IngestContext<'_>,
        interest: &Interest,
        upload: TrackUpload<'_>,
        format: TrackFormat,
        existing: Option<&Route>,
        processed: &ProcessedTrack,
        path_bytes: &[u8],
        writes: &mut UploadWrites<'_>,
    ) -> Result<UploadResult> {
        let route_id = existing.map(|r| r.id);

        // Track artifact is always new
        let gpx_file_id = FileStore::new_file_id();
        ctx.files
            .write(&interest.slug, &gpx_file_id, upload.contents)
            .await?;
        writes.new_blobs.push(gpx_file_id.clone());
        ctx.db.insert_file(&NewFile {
            fileid: &gpx_file_id,
            filename: upload.filename,
            mimetype: format.mimetype(),
            interest_id: interest.id,
            route_id,
        })?;
        writes.new_records.push(gpx_file_id.clone());

        // Path artifact is overwritten in place when the route already has one
        let reusable_path = match existing.and_then(|r| r.path_file_id.as_deref()) {
            Some(fid) => ctx.db.get_file(fid)?.map(|_| fid.to_string()),
            None => None,
        };
        let path_file_id = match reusable_path {
            Some(fid) => {
                let previous = ctx.files.read(&interest.slug, &fid).await.ok();
                ctx.files.write(&interest.slug, &fid, path_bytes).await?;
                writes.overwritten = Some((fid.clone(), previous));
                fid
            }
            None => {
                let fid = FileStore::new_file_id();
                let filename = format!("{}{}", upload.filename, PATH_SUFFIX);
                ctx.files.write(&interest.slug, &fid, path_bytes).await?;
                writes.new_blobs.push(fid.clone());
                ctx.db.insert_file(&NewFile {
                    fileid: &fid,
                    filename: &filename,
                    mimetype: PATH_MIMETYPE,
                    interest_id: interest.id,
                    route_id,
                })?;
                writes.new_records.push(fid.clone());
                fid
            }
        };

        let distance = format!("{:.1}", processed.distance_mi);
        let start_location = processed.start.to_display();

        let route = match existing {
            Some(route) => {
                let summary = TrackSummary {
                    distance: distance.parse().unwrap_or(processed.distance_mi),
                    elevation_gain: processed.elevation_gain,
                    start_location: start_location.clone(),
                    latlng: self
                        .snapper
                        .snap_for_interest(ctx.db, interest.id, processed.start),
                    gpx_file_id: gpx_file_id.clone(),
                    path_file_id: path_file_id.clone(),
                };
                let updated = ctx.db.update_route_track(interest.id, route.id, &summary)?;
                tracing::info!(interest = %interest.slug, route_id = route.id, "Replaced route track");
                Some(updated)
            }
            None => None,
        };

        Ok(UploadResult {
            gpx_file_id,
            path_file_id,
            distance,
            elevation_gain: processed.elevation_gain,
            start_location,
            route,
        })
    }
}

/// Writes made by one upload, so they can be undone.
struct UploadWrites<'a> {
    ctx: IngestContext<'a>,
    interest: &'a str,
    new_blobs: Vec<String>,
    new_records: Vec<String>,
    /// Path artifact overwritten in place, with its previous contents
    overwritten: Option<(String, Option<Vec<u8>>)>,
}

impl<'a> UploadWrites<'a> {
    fn new(ctx: IngestContext<'a>, interest: &'a str) -> Self {
        Self {
            ctx,
            interest,
            new_blobs: Vec::new(),
            new_records: Vec::new(),
            overwritten: None,
        }
    }

    /// Remove the replaced track artifact once the route points at the new one.
    async fn finish(&self, replaced: Option<&Route>) {
        let Some(route) = replaced else {
            return;
        };
        if let Err(e) = self.ctx.db.delete_file(&route.gpx_file_id) {
            tracing::warn!(fileid = %route.gpx_file_id, error = %e, "Failed to delete replaced track record");
        }
        if let Err(e) = self.ctx.files.delete(self.interest, &route.gpx_file_id).await {
            tracing::warn!(fileid = %route.gpx_file_id, error = %e, "Failed to delete replaced track blob");
        }
    }

    /// Undo everything this upload wrote. Best effort; failures are logged.
    async fn rollback(&self) {
        for fileid in &self.new_records {
            if let Err(e) = self.ctx.db.delete_file(fileid) {
                tracing::error!(fileid, error = %e, "Rollback: failed to delete file record");
            }
        }
        for fileid in &self.new_blobs {
            if let Err(e) = self.ctx.files.delete(self.interest, fileid).await {
                tracing::error!(fileid, error = %e, "Rollback: failed to delete blob");
            }
        }
        if let Some((fileid, Some(previous))) = &self.overwritten {
            if let Err(e) = self.ctx.files.write(self.interest, fileid, previous).await {
                tracing::error!(fileid, error = %e, "Rollback: failed to restore path artifact");
            }
        }
    }
}
