// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod elevation;
pub mod elevation_client;
pub mod files;
pub mod geo_provider;
pub mod ingest;
pub mod location;
pub mod path;
pub mod resample;
pub mod track;

pub use elevation::ElevationProcessor;
pub use elevation_client::ElevationClient;
pub use files::FileStore;
pub use geo_provider::{GeoProvider, GoogleMapsClient, ProviderError};
pub use ingest::{IngestContext, IngestPipeline, ProcessedTrack, TrackUpload, UploadResult};
pub use location::LocationSnapper;
pub use resample::Resampler;
pub use track::{TrackError, TrackFormat};
