// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route administration: track upload, route editing, file management.
//!
//! Every handler requires `routes-admin` on the interest (or `super-admin`).

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{FileRecord, Interest, Route, RouteForm};
use crate::permissions::{require_capability, Role};
use crate::routes::load_interest;
use crate::services::{TrackUpload, UploadResult};
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

/// Largest accepted track upload.
const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Multipart field carrying the track file.
const UPLOAD_FIELD: &str = "upload";

/// Admin routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/admin/{interest}/upload",
            post(upload_track).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/admin/{interest}/routes", get(list_routes).post(create_route))
        .route(
            "/admin/{interest}/routes/{id}",
            put(update_route).delete(delete_route),
        )
        .route("/admin/{interest}/files", get(list_files))
        .route("/admin/{interest}/files/{file_id}", delete(delete_file))
        .route("/admin/{interest}/locations/check", get(check_location))
}

/// Look up the interest and check the caller may administer its routes.
fn authorize(state: &AppState, user: &AuthUser, slug: &str) -> Result<Interest> {
    require_capability(user, slug, Role::RoutesAdmin)?;
    load_interest(state, slug)
}

// ─── Upload ──────────────────────────────────────────────────

#[derive(Deserialize)]
struct UploadQuery {
    /// Replace the track of this route instead of starting a new one
    route_id: Option<i64>,
}

/// Accept a track file and run the ingestion pipeline on it.
async fn upload_track(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<Json<UploadResult>> {
    let interest = authorize(&state, &user, &slug)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Upload has no filename".to_string()))?;
        let contents = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {}", e)))?;
        upload = Some((filename, contents));
        break;
    }
    let (filename, contents) = upload
        .ok_or_else(|| AppError::BadRequest(format!("Missing '{}' file field", UPLOAD_FIELD)))?;

    let result = state
        .pipeline
        .ingest_upload(
            state.ingest_context(),
            &interest,
            TrackUpload {
                filename: &filename,
                contents: &contents,
                route_id: query.route_id,
            },
        )
        .await?;

    tracing::info!(
        user = %user.user_id,
        interest = %slug,
        gpx_file_id = %result.gpx_file_id,
        distance = %result.distance,
        elevation_gain = result.elevation_gain,
        "Track uploaded"
    );
    Ok(Json(result))
}

// ─── Routes ──────────────────────────────────────────────────

/// All routes of the interest, including deactivated ones.
async fn list_routes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Route>>> {
    let interest = authorize(&state, &user, &slug)?;
    Ok(Json(state.db.list_routes(interest.id, false)?))
}

async fn validated_latlng(state: &AppState, interest: &Interest, form: &RouteForm) -> Result<String> {
    form.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    state
        .pipeline
        .snapper()
        .snap_location(&state.db, state.geo.as_ref(), interest.id, &form.location)
        .await
}

/// Create a route from an admin form.
async fn create_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
    Json(form): Json<RouteForm>,
) -> Result<(StatusCode, Json<Route>)> {
    let interest = authorize(&state, &user, &slug)?;
    let latlng = validated_latlng(&state, &interest, &form).await?;

    let route = state.db.insert_route(interest.id, &form, &latlng)?;
    tracing::info!(user = %user.user_id, interest = %slug, route_id = route.id, name = %route.name, "Created route");
    Ok((StatusCode::CREATED, Json(route)))
}

/// Update a route from an admin form.
async fn update_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((slug, route_id)): Path<(String, i64)>,
    Json(form): Json<RouteForm>,
) -> Result<Json<Route>> {
    let interest = authorize(&state, &user, &slug)?;
    let latlng = validated_latlng(&state, &interest, &form).await?;

    let route = state.db.update_route(interest.id, route_id, &form, &latlng)?;
    tracing::info!(user = %user.user_id, interest = %slug, route_id, "Updated route");
    Ok(Json(route))
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Deactivate a route. Routes are never hard deleted.
async fn delete_route(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((slug, route_id)): Path<(String, i64)>,
) -> Result<Json<SuccessResponse>> {
    let interest = authorize(&state, &user, &slug)?;
    state.db.set_route_active(interest.id, route_id, false)?;
    tracing::info!(user = %user.user_id, interest = %slug, route_id, "Deactivated route");
    Ok(Json(SuccessResponse { success: true }))
}

// ─── Files ───────────────────────────────────────────────────

async fn list_files(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<FileRecord>>> {
    let interest = authorize(&state, &user, &slug)?;
    Ok(Json(state.db.list_files(interest.id)?))
}

/// Delete a file record together with its blob.
async fn delete_file(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((slug, file_id)): Path<(String, String)>,
) -> Result<Json<SuccessResponse>> {
    let interest = authorize(&state, &user, &slug)?;

    let record = state
        .db
        .get_file(&file_id)?
        .filter(|f| f.interest_id == interest.id)
        .ok_or_else(|| AppError::NotFound(format!("File {}", file_id)))?;

    // Blob first: a failed blob delete keeps the record so the delete can be retried
    state.files.delete(&slug, &record.fileid).await?;
    state.db.delete_file(&record.fileid)?;

    tracing::info!(user = %user.user_id, interest = %slug, file_id = %record.fileid, "Deleted file");
    Ok(Json(SuccessResponse { success: true }))
}

// ─── Locations ───────────────────────────────────────────────

#[derive(Deserialize)]
struct CheckLocationQuery {
    location: String,
}

#[derive(Serialize)]
pub struct CheckLocationResponse {
    pub valid: bool,
}

/// Whether a route form's location text can be resolved.
async fn check_location(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
    Query(query): Query<CheckLocationQuery>,
) -> Result<Json<CheckLocationResponse>> {
    authorize(&state, &user, &slug)?;
    let valid = state
        .pipeline
        .snapper()
        .check_location(state.geo.as_ref(), &query.location)
        .await;
    Ok(Json(CheckLocationResponse { valid }))
}
