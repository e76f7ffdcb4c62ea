// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Read-only route API used by the map frontend.
//!
//! Public interests are readable by anyone; other interests need
//! `interest-admin` (or `super-admin`). Also serves icon locations as
//! GeoJSON for the icon map.

use crate::error::{AppError, Result};
use crate::geo_utils::LatLng;
use crate::middleware::auth::AuthUser;
use crate::models::{ElevationSample, Icon, IconLocation, Interest, Route};
use crate::permissions::{require_capability, Role};
use crate::routes::load_interest;
use crate::services::path;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use geojson::{feature, Feature, FeatureCollection, Geometry};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Public API routes (optional authentication).
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/{interest}/routes", get(list_routes))
        .route("/api/{interest}/routes/{id}/turns", get(get_turns))
        .route("/api/{interest}/routes/{id}/path", get(get_path))
        .route("/api/{interest}/files/{file_id}", get(get_file))
        .route("/api/{interest}/icons/locations", get(icon_locations))
}

/// Look up the interest and check the caller may read it.
fn authorize(state: &AppState, user: Option<&AuthUser>, slug: &str) -> Result<Interest> {
    let interest = load_interest(state, slug)?;
    if interest.public {
        return Ok(interest);
    }
    match user {
        Some(user) => {
            require_capability(user, slug, Role::InterestAdmin)?;
            Ok(interest)
        }
        None => Err(AppError::Unauthorized),
    }
}

/// An active route of the interest.
fn active_route(state: &AppState, interest: &Interest, route_id: i64) -> Result<Route> {
    state
        .db
        .get_route(interest.id, route_id)?
        .filter(|r| r.active)
        .ok_or_else(|| AppError::NotFound(format!("Route {}", route_id)))
}

// ─── Routes ──────────────────────────────────────────────────

/// Active routes of the interest.
async fn list_routes(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthUser>>,
    Path(slug): Path<String>,
) -> Result<Json<Vec<Route>>> {
    let interest = authorize(&state, user.as_deref(), &slug)?;
    Ok(Json(state.db.list_routes(interest.id, true)?))
}

#[derive(Serialize)]
pub struct TurnsResponse {
    pub turns: String,
}

async fn get_turns(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthUser>>,
    Path((slug, route_id)): Path<(String, i64)>,
) -> Result<Json<TurnsResponse>> {
    let interest = authorize(&state, user.as_deref(), &slug)?;
    let route = active_route(&state, &interest, route_id)?;
    Ok(Json(TurnsResponse {
        turns: route.turns.unwrap_or_default(),
    }))
}

/// Elevation profile rows from the route's path artifact.
async fn get_path(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthUser>>,
    Path((slug, route_id)): Path<(String, i64)>,
) -> Result<Json<Vec<ElevationSample>>> {
    let interest = authorize(&state, user.as_deref(), &slug)?;
    let route = active_route(&state, &interest, route_id)?;

    let path_file_id = route
        .path_file_id
        .ok_or_else(|| AppError::NotFound(format!("Path for route {}", route_id)))?;
    let bytes = state.files.read(&interest.slug, &path_file_id).await?;
    Ok(Json(path::from_csv(&bytes)?))
}

// ─── Files ───────────────────────────────────────────────────

/// Download a stored file with its recorded mimetype.
async fn get_file(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthUser>>,
    Path((slug, file_id)): Path<(String, String)>,
) -> Result<Response> {
    let interest = authorize(&state, user.as_deref(), &slug)?;

    let record = state
        .db
        .get_file(&file_id)?
        .filter(|f| f.interest_id == interest.id)
        .ok_or_else(|| AppError::NotFound(format!("File {}", file_id)))?;
    let bytes = state.files.read(&interest.slug, &record.fileid).await?;

    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        record.filename.replace(['"', '\\'], "_"),
        urlencoding::encode(&record.filename)
    );
    Ok((
        [
            (header::CONTENT_TYPE, record.mimetype),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

// ─── Icon Locations ──────────────────────────────────────────

#[derive(Deserialize)]
struct IconLocationsQuery {
    /// Select locations for the routes map instead of the icon map table
    #[serde(default)]
    map: bool,
}

/// Icon locations as GeoJSON points.
///
/// By default only locations whose icon is shown in the icon map table are
/// returned; `?map=true` returns those shown on the routes map.
async fn icon_locations(
    State(state): State<Arc<AppState>>,
    user: Option<Extension<AuthUser>>,
    Path(slug): Path<String>,
    Query(query): Query<IconLocationsQuery>,
) -> Result<Json<FeatureCollection>> {
    let interest = authorize(&state, user.as_deref(), &slug)?;

    let icons: HashMap<i64, Icon> = state
        .db
        .list_icons(interest.id)?
        .into_iter()
        .map(|icon| (icon.id, icon))
        .collect();
    let subtypes: HashMap<i64, String> = state
        .db
        .list_icon_subtypes(interest.id)?
        .into_iter()
        .map(|subtype| (subtype.id, subtype.name))
        .collect();

    let features = state
        .db
        .list_icon_locations(interest.id)?
        .into_iter()
        .filter_map(|location| {
            let icon = icons.get(&location.icon_id)?;
            let shown = if query.map {
                icon.shown_on_map
            } else {
                icon.shown_in_table
            };
            if !shown {
                return None;
            }
            let Some(point) = LatLng::parse_pair(&location.latlng) else {
                tracing::warn!(interest = %slug, location_id = location.id, latlng = %location.latlng, "Icon location has no usable point");
                return None;
            };
            let subtype = location.subtype_id.and_then(|id| subtypes.get(&id));
            Some(icon_feature(&location, point, icon, subtype))
        })
        .collect();

    Ok(Json(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }))
}

fn icon_feature(
    location: &IconLocation,
    point: LatLng,
    icon: &Icon,
    subtype: Option<&String>,
) -> Feature {
    let properties = serde_json::json!({
        "name": location.name,
        "icon": icon.name,
        "legend": icon.legend_text.as_deref().unwrap_or(&icon.name),
        "color": icon.color,
        "svg_file_id": icon.svg_file_id,
        "loctext": location.popup_text.as_deref().unwrap_or(&location.location),
        "addr_shown": icon.addr_shown,
        "subtype": subtype,
        "contact_name": location.contact_name,
        "email": location.email,
        "phone": location.phone,
    });

    Feature {
        bbox: None,
        // GeoJSON positions are [lng, lat]
        geometry: Some(Geometry::new(geojson::Value::Point(vec![point.lng, point.lat]))),
        id: Some(feature::Id::Number(location.id.into())),
        properties: properties.as_object().cloned(),
        foreign_members: None,
    }
}
