// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Bulk route loader.
//!
//! Replays a CSV manifest of routes through the same upload pipeline and
//! route creation the admin API uses. Manifest columns:
//!
//! `interest,name,track,location,surface,description,turns`
//!
//! `track` and `turns` are paths relative to the manifest. An empty
//! `location` uses the track's start point.

use anyhow::{bail, Context, Result};
use clap::Parser;
use runningroutes::{
    config::Config,
    db::SqliteDb,
    models::{Route, RouteForm, Surface},
    services::{GoogleMapsClient, TrackFormat, TrackUpload, UploadResult},
    AppState,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use validator::Validate;

#[derive(Parser, Debug)]
#[command(author, version, about = "Load running routes from a CSV manifest", long_about = None)]
struct Cli {
    /// CSV manifest of routes to load
    manifest: PathBuf,

    /// Create interests named in the manifest that don't exist yet
    #[arg(long)]
    create_interests: bool,

    /// Process tracks and report results without storing anything
    #[arg(long)]
    dry_run: bool,
}

/// One manifest row.
#[derive(Debug, Deserialize)]
struct ManifestRow {
    interest: String,
    name: String,
    track: PathBuf,
    #[serde(default)]
    location: String,
    #[serde(default)]
    surface: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    turns: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("runningroutes=info,load_routes=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("loading configuration")?;
    let db = SqliteDb::open(&config.database_path).context("opening database")?;
    let geo = GoogleMapsClient::new(
        config.gmaps_base_url.clone(),
        config.gmaps_api_key.clone(),
        config.pipeline.provider_qps,
        Duration::from_secs(config.pipeline.provider_timeout_secs),
    )?;
    let state = AppState::new(config, db, Arc::new(geo));

    let base = cli
        .manifest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let mut reader = csv::Reader::from_path(&cli.manifest)
        .with_context(|| format!("opening {}", cli.manifest.display()))?;

    let mut loaded = 0usize;
    let mut failed = 0usize;
    for (idx, row) in reader.deserialize::<ManifestRow>().enumerate() {
        let line = idx + 2; // header is line 1
        let row = row.with_context(|| format!("manifest line {}", line))?;
        match load_row(&state, &base, &row, &cli).await {
            Ok(()) => loaded += 1,
            Err(e) => {
                failed += 1;
                tracing::error!(line, name = %row.name, error = %format!("{:#}", e), "Failed to load route");
            }
        }
    }

    tracing::info!(loaded, failed, "Manifest processed");
    if failed > 0 {
        bail!("{} route(s) failed to load", failed);
    }
    Ok(())
}

async fn load_row(state: &AppState, base: &Path, row: &ManifestRow, cli: &Cli) -> Result<()> {
    let track_path = base.join(&row.track);
    let contents = tokio::fs::read(&track_path)
        .await
        .with_context(|| format!("reading {}", track_path.display()))?;
    let filename = track_path
        .file_name()
        .and_then(|f| f.to_str())
        .context("track path has no file name")?
        .to_string();

    if cli.dry_run {
        let format = TrackFormat::from_filename(&filename)?;
        let processed = state
            .pipeline
            .process_track(state.geo.as_ref(), format, &contents)
            .await?;
        tracing::info!(
            name = %row.name,
            distance_mi = %format!("{:.1}", processed.distance_mi),
            elevation_gain = processed.elevation_gain,
            samples = processed.samples.len(),
            "Dry run"
        );
        return Ok(());
    }

    let interest = match state.db.get_interest(&row.interest)? {
        Some(interest) => interest,
        None if cli.create_interests => {
            tracing::info!(interest = %row.interest, "Creating interest");
            state.db.upsert_interest(&row.interest, &row.interest, false)?
        }
        None => bail!("unknown interest {:?}", row.interest),
    };

    let upload = state
        .pipeline
        .ingest_upload(
            state.ingest_context(),
            &interest,
            TrackUpload {
                filename: &filename,
                contents: &contents,
                route_id: None,
            },
        )
        .await?;

    let route = match save_route(state, base, row, interest.id, &upload).await {
        Ok(route) => route,
        Err(e) => {
            state
                .pipeline
                .discard_upload(state.ingest_context(), &interest, &upload)
                .await;
            return Err(e);
        }
    };

    tracing::info!(
        interest = %interest.slug,
        route_id = route.id,
        name = %route.name,
        distance = route.distance,
        elevation_gain = route.elevation_gain,
        "Loaded route"
    );
    Ok(())
}

/// Create the route for an ingested track.
async fn save_route(
    state: &AppState,
    base: &Path,
    row: &ManifestRow,
    interest_id: i64,
    upload: &UploadResult,
) -> Result<Route> {
    let turns = if row.turns.is_empty() {
        None
    } else {
        let turns_path = base.join(&row.turns);
        Some(
            tokio::fs::read_to_string(&turns_path)
                .await
                .with_context(|| format!("reading {}", turns_path.display()))?,
        )
    };

    let surface = if row.surface.is_empty() {
        Surface::default()
    } else {
        row.surface.parse::<Surface>().map_err(anyhow::Error::msg)?
    };

    let form = RouteForm {
        name: row.name.clone(),
        description: (!row.description.is_empty()).then(|| row.description.clone()),
        surface,
        map: None,
        turns,
        location: if row.location.is_empty() {
            upload.start_location.clone()
        } else {
            row.location.clone()
        },
        distance: upload.distance.parse().context("upload distance")?,
        elevation_gain: upload.elevation_gain,
        gpx_file_id: upload.gpx_file_id.clone(),
        path_file_id: Some(upload.path_file_id.clone()),
        active: true,
    };
    form.validate()?;

    let latlng = state
        .pipeline
        .snapper()
        .snap_location(&state.db, state.geo.as_ref(), interest_id, &form.location)
        .await?;
    Ok(state.db.insert_route(interest_id, &form, &latlng)?)
}
