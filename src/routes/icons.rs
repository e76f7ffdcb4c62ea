// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Icon administration: SVG uploads, icons, subtypes and icon locations.
//!
//! Every handler requires `icon-admin` on the interest (or `super-admin`).

use crate::db::NewFile;
use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::icon::SVG_MIMETYPE;
use crate::models::{
    Icon, IconForm, IconLocation, IconLocationForm, IconSubtype, IconSubtypeForm, Interest,
};
use crate::permissions::{require_capability, Role};
use crate::routes::admin::SuccessResponse;
use crate::routes::load_interest;
use crate::services::FileStore;
use crate::AppState;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

/// Largest accepted icon upload.
const MAX_SVG_BYTES: usize = 1024 * 1024;

/// Icon admin routes (require authentication via JWT).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/admin/{interest}/icons/upload",
            post(upload_svg).layer(DefaultBodyLimit::max(MAX_SVG_BYTES)),
        )
        .route("/admin/{interest}/icons", get(list_icons).post(create_icon))
        .route(
            "/admin/{interest}/icons/{id}",
            put(update_icon).delete(delete_icon),
        )
        .route(
            "/admin/{interest}/icons/subtypes",
            get(list_subtypes).post(create_subtype),
        )
        .route(
            "/admin/{interest}/icons/subtypes/{id}",
            put(update_subtype).delete(delete_subtype),
        )
        .route(
            "/admin/{interest}/icons/locations",
            get(list_locations).post(create_location),
        )
        .route(
            "/admin/{interest}/icons/locations/{id}",
            put(update_location).delete(delete_location),
        )
}

fn authorize(state: &AppState, user: &AuthUser, slug: &str) -> Result<Interest> {
    require_capability(user, slug, Role::IconAdmin)?;
    load_interest(state, slug)
}

fn validate<T: Validate>(form: &T) -> Result<()> {
    form.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

// ─── SVG Upload ──────────────────────────────────────────────

#[derive(Serialize)]
pub struct SvgUploadResponse {
    pub svg_file_id: String,
    pub filename: String,
}

/// Store an SVG file for use by icons.
async fn upload_svg(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SvgUploadResponse>)> {
    let interest = authorize(&state, &user, &slug)?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("upload") {
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
    let (filename, contents) =
        upload.ok_or_else(|| AppError::BadRequest("Missing 'upload' file field".to_string()))?;

    if !filename.to_ascii_lowercase().ends_with(".svg") {
        return Err(AppError::BadRequest(format!("{} is not an SVG file", filename)));
    }

    let fileid = FileStore::new_file_id();
    state.files.write(&interest.slug, &fileid, &contents).await?;
    let recorded = state.db.insert_file(&NewFile {
        fileid: &fileid,
        filename: &filename,
        mimetype: SVG_MIMETYPE,
        interest_id: interest.id,
        route_id: None,
    });
    if let Err(e) = recorded {
        if let Err(cleanup) = state.files.delete(&interest.slug, &fileid).await {
            tracing::error!(fileid = %fileid, error = %cleanup, "Failed to remove unrecorded icon blob");
        }
        return Err(e.into_storage());
    }

    tracing::info!(user = %user.user_id, interest = %slug, fileid = %fileid, filename = %filename, "Icon SVG uploaded");
    Ok((
        StatusCode::CREATED,
        Json(SvgUploadResponse {
            svg_file_id: fileid,
            filename,
        }),
    ))
}

// ─── Icons ───────────────────────────────────────────────────

async fn list_icons(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Icon>>> {
    let interest = authorize(&state, &user, &slug)?;
    Ok(Json(state.db.list_icons(interest.id)?))
}

async fn create_icon(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
    Json(form): Json<IconForm>,
) -> Result<(StatusCode, Json<Icon>)> {
    let interest = authorize(&state, &user, &slug)?;
    validate(&form)?;

    let icon = state.db.insert_icon(interest.id, &form)?;
    tracing::info!(user = %user.user_id, interest = %slug, icon_id = icon.id, name = %icon.name, "Created icon");
    Ok((StatusCode::CREATED, Json(icon)))
}

async fn update_icon(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((slug, icon_id)): Path<(String, i64)>,
    Json(form): Json<IconForm>,
) -> Result<Json<Icon>> {
    let interest = authorize(&state, &user, &slug)?;
    validate(&form)?;

    let icon = state.db.update_icon(interest.id, icon_id, &form)?;
    tracing::info!(user = %user.user_id, interest = %slug, icon_id, "Updated icon");
    Ok(Json(icon))
}

/// Delete an icon no location uses. The SVG file is kept.
async fn delete_icon(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((slug, icon_id)): Path<(String, i64)>,
) -> Result<Json<SuccessResponse>> {
    let interest = authorize(&state, &user, &slug)?;
    state.db.delete_icon(interest.id, icon_id)?;
    tracing::info!(user = %user.user_id, interest = %slug, icon_id, "Deleted icon");
    Ok(Json(SuccessResponse { success: true }))
}

// ─── Subtypes ────────────────────────────────────────────────

async fn list_subtypes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<IconSubtype>>> {
    let interest = authorize(&state, &user, &slug)?;
    Ok(Json(state.db.list_icon_subtypes(interest.id)?))
}

async fn create_subtype(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
    Json(form): Json<IconSubtypeForm>,
) -> Result<(StatusCode, Json<IconSubtype>)> {
    let interest = authorize(&state, &user, &slug)?;
    validate(&form)?;
    let subtype = state.db.insert_icon_subtype(interest.id, &form)?;
    Ok((StatusCode::CREATED, Json(subtype)))
}

async fn update_subtype(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((slug, subtype_id)): Path<(String, i64)>,
    Json(form): Json<IconSubtypeForm>,
) -> Result<Json<IconSubtype>> {
    let interest = authorize(&state, &user, &slug)?;
    validate(&form)?;
    Ok(Json(state.db.update_icon_subtype(interest.id, subtype_id, &form)?))
}

async fn delete_subtype(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((slug, subtype_id)): Path<(String, i64)>,
) -> Result<Json<SuccessResponse>> {
    let interest = authorize(&state, &user, &slug)?;
    state.db.delete_icon_subtype(interest.id, subtype_id)?;
    tracing::info!(user = %user.user_id, interest = %slug, subtype_id, "Deleted icon subtype");
    Ok(Json(SuccessResponse { success: true }))
}

// ─── Icon Locations ──────────────────────────────────────────

async fn list_locations(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<IconLocation>>> {
    let interest = authorize(&state, &user, &slug)?;
    Ok(Json(state.db.list_icon_locations(interest.id)?))
}

/// Validate the form and resolve its location through the location cache.
async fn resolved_latlng(
    state: &AppState,
    interest: &Interest,
    form: &IconLocationForm,
) -> Result<String> {
    validate(form)?;
    let point = state
        .pipeline
        .snapper()
        .resolve(&state.db, state.geo.as_ref(), interest.id, &form.location)
        .await?;
    Ok(point.to_fixed6())
}

async fn create_location(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(slug): Path<String>,
    Json(form): Json<IconLocationForm>,
) -> Result<(StatusCode, Json<IconLocation>)> {
    let interest = authorize(&state, &user, &slug)?;
    let latlng = resolved_latlng(&state, &interest, &form).await?;

    let location = state.db.insert_icon_location(interest.id, &form, &latlng)?;
    tracing::info!(user = %user.user_id, interest = %slug, location_id = location.id, name = %location.name, "Created icon location");
    Ok((StatusCode::CREATED, Json(location)))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((slug, location_id)): Path<(String, i64)>,
    Json(form): Json<IconLocationForm>,
) -> Result<Json<IconLocation>> {
    let interest = authorize(&state, &user, &slug)?;
    let latlng = resolved_latlng(&state, &interest, &form).await?;

    let location = state
        .db
        .update_icon_location(interest.id, location_id, &form, &latlng)?;
    tracing::info!(user = %user.user_id, interest = %slug, location_id, "Updated icon location");
    Ok(Json(location))
}

async fn delete_location(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path((slug, location_id)): Path<(String, i64)>,
) -> Result<Json<SuccessResponse>> {
    let interest = authorize(&state, &user, &slug)?;
    state.db.delete_icon_location(interest.id, location_id)?;
    tracing::info!(user = %user.user_id, interest = %slug, location_id, "Deleted icon location");
    Ok(Json(SuccessResponse { success: true }))
}
