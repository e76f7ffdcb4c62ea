// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Default Google Maps web services endpoint.
pub const DEFAULT_GMAPS_BASE_URL: &str = "https://maps.googleapis.com";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Root folder for uploaded and generated file artifacts
    pub file_folder: PathBuf,
    /// Google Maps API key (geocoding + elevation)
    pub gmaps_api_key: String,
    /// Google Maps base URL (overridable for testing)
    pub gmaps_base_url: String,
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Tunables for the route ingestion pipeline
    pub pipeline: PipelineSettings,
}

/// Route ingestion tunables.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Earth radius used for all great-circle math (km)
    pub earth_radius_km: f64,
    /// Longest allowed gap between consecutive path points (m)
    pub max_dist_interval_m: f64,
    /// Most points a resampled track may have
    pub max_path_points: usize,
    /// Maximum points per elevation request
    pub elevation_max_samples: usize,
    /// Moving-average window (points, odd)
    pub smoothing_window: usize,
    /// Rise needed before an ascent counts (m)
    pub elev_up_threshold: f64,
    /// Drop needed to confirm a peak (m)
    pub elev_down_threshold: f64,
    /// Start locations closer than this snap together (m)
    pub route_loc_epsilon_m: f64,
    /// Provider queries per second
    pub provider_qps: u32,
    /// Per-call provider timeout (seconds)
    pub provider_timeout_secs: u64,
    /// Days before a cached geocode result is refreshed
    pub location_cache_days: i64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            earth_radius_km: 6371.0,
            max_dist_interval_m: 30.0,
            max_path_points: 50_000,
            elevation_max_samples: 512,
            smoothing_window: 5,
            elev_up_threshold: 8.0,
            elev_down_threshold: 8.0,
            route_loc_epsilon_m: 100.0,
            provider_qps: 50,
            provider_timeout_secs: 30,
            location_cache_days: 30,
        }
    }
}

impl PipelineSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = Self {
            earth_radius_km: parse_or("APP_EARTH_RADIUS_KM", defaults.earth_radius_km)?,
            max_dist_interval_m: parse_or("APP_MAX_DIST_INTERVAL", defaults.max_dist_interval_m)?,
            max_path_points: parse_or("APP_MAX_PATH_POINTS", defaults.max_path_points)?,
            elevation_max_samples: parse_or(
                "APP_ELEV_MAX_SAMPLES",
                defaults.elevation_max_samples,
            )?,
            smoothing_window: parse_or("APP_SMOOTHING_WINDOW", defaults.smoothing_window)?,
            elev_up_threshold: parse_or("APP_ELEV_UPTHRESHOLD", defaults.elev_up_threshold)?,
            elev_down_threshold: parse_or("APP_ELEV_DOWNTHRESHOLD", defaults.elev_down_threshold)?,
            route_loc_epsilon_m: parse_or("APP_ROUTE_LOC_EPSILON", defaults.route_loc_epsilon_m)?,
            provider_qps: parse_or("GMAPS_QPS", defaults.provider_qps)?,
            provider_timeout_secs: parse_or("GMAPS_TIMEOUT_SECS", defaults.provider_timeout_secs)?,
            location_cache_days: parse_or(
                "APP_LOCATION_CACHE_DAYS",
                defaults.location_cache_days,
            )?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smoothing_window == 0 || self.smoothing_window % 2 == 0 {
            return Err(ConfigError::Invalid(
                "APP_SMOOTHING_WINDOW",
                "must be an odd number of points".to_string(),
            ));
        }
        if self.max_dist_interval_m <= 0.0 {
            return Err(ConfigError::Invalid(
                "APP_MAX_DIST_INTERVAL",
                "must be positive".to_string(),
            ));
        }
        if self.max_path_points < 2 {
            return Err(ConfigError::Invalid(
                "APP_MAX_PATH_POINTS",
                "must be at least 2".to_string(),
            ));
        }
        if self.elevation_max_samples == 0 {
            return Err(ConfigError::Invalid(
                "APP_ELEV_MAX_SAMPLES",
                "must be positive".to_string(),
            ));
        }
        if self.provider_qps == 0 {
            return Err(ConfigError::Invalid("GMAPS_QPS", "must be positive".to_string()));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "runningroutes.db".to_string())
                .into(),
            file_folder: env::var("APP_FILE_FOLDER")
                .unwrap_or_else(|_| "files".to_string())
                .into(),
            gmaps_api_key: env::var("GMAPS_ELEV_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GMAPS_ELEV_API_KEY"))?,
            gmaps_base_url: env::var("GMAPS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GMAPS_BASE_URL.to_string()),
            jwt_signing_key: env::var("JWT_SIGNING_KEY")
                .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
                .into_bytes(),
            pipeline: PipelineSettings::from_env()?,
        })
    }

    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            database_path: ":memory:".into(),
            file_folder: std::env::temp_dir().join("runningroutes-test-files"),
            gmaps_api_key: "test_api_key".to_string(),
            gmaps_base_url: DEFAULT_GMAPS_BASE_URL.to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            pipeline: PipelineSettings::default(),
        }
    }
}

/// Read an optional variable, falling back to `default` when unset.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, format!("cannot parse {:?}", raw))),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
