// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Runningroutes: running route administration for running clubs
//!
//! This crate provides the backend API for publishing club running routes,
//! including the upload pipeline that turns a GPX track into distance,
//! elevation gain and an elevation profile.

pub mod config;
pub mod db;
pub mod error;
pub mod geo_utils;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::SqliteDb;
use services::{FileStore, GeoProvider, IngestContext, IngestPipeline};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: SqliteDb,
    pub files: FileStore,
    pub geo: Arc<dyn GeoProvider>,
    pub pipeline: IngestPipeline,
}

impl AppState {
    pub fn new(config: Config, db: SqliteDb, geo: Arc<dyn GeoProvider>) -> Self {
        let files = FileStore::new(config.file_folder.clone());
        let pipeline = IngestPipeline::new(&config.pipeline);
        Self {
            config,
            db,
            files,
            geo,
            pipeline,
        }
    }

    /// Pipeline collaborators borrowed from this state.
    pub fn ingest_context(&self) -> IngestContext<'_> {
        IngestContext {
            db: &self.db,
            files: &self.files,
            provider: self.geo.as_ref(),
        }
    }
}
