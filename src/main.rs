// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Runningroutes API Server
//!
//! Serves running club routes and the admin API that ingests uploaded
//! GPX tracks into routes with distance and elevation data.

use runningroutes::{
    config::Config, db::SqliteDb, services::GoogleMapsClient, AppState,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting runningroutes API");

    let db = SqliteDb::open(&config.database_path)?;

    tokio::fs::create_dir_all(&config.file_folder).await?;
    tracing::info!(folder = %config.file_folder.display(), "File folder ready");

    let geo = GoogleMapsClient::new(
        config.gmaps_base_url.clone(),
        config.gmaps_api_key.clone(),
        config.pipeline.provider_qps,
        Duration::from_secs(config.pipeline.provider_timeout_secs),
    )?;
    tracing::info!(
        base_url = %config.gmaps_base_url,
        qps = config.pipeline.provider_qps,
        "Google Maps client initialized"
    );

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), db, Arc::new(geo)));

    // Build router
    let app = runningroutes::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("runningroutes=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
