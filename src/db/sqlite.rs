// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! SQLite database wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Interests (tenants)
//! - Routes (scoped to an interest)
//! - Files (artifact metadata; blobs live in the file store)
//! - Locations (geocoding cache)
//! - Icons, icon subtypes and icon locations (see `db::icons`)

use crate::db::tables;
use crate::error::AppError;
use crate::models::{FileRecord, Interest, LocationEntry, Route, RouteForm};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS interests (
    id INTEGER PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL DEFAULT '',
    public INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS routes (
    id INTEGER PRIMARY KEY,
    interest_id INTEGER NOT NULL REFERENCES interests(id),
    name TEXT NOT NULL,
    distance REAL NOT NULL DEFAULT 0,
    start_location TEXT NOT NULL DEFAULT '',
    latlng TEXT NOT NULL DEFAULT '',
    surface TEXT NOT NULL DEFAULT 'road',
    elevation_gain INTEGER NOT NULL DEFAULT 0,
    map TEXT,
    turns TEXT,
    gpx_file_id TEXT NOT NULL,
    path_file_id TEXT,
    description TEXT,
    active INTEGER NOT NULL DEFAULT 1
);
CREATE INDEX IF NOT EXISTS routes_interest ON routes(interest_id);
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY,
    fileid TEXT NOT NULL UNIQUE,
    filename TEXT NOT NULL,
    mimetype TEXT NOT NULL,
    interest_id INTEGER NOT NULL REFERENCES interests(id),
    route_id INTEGER REFERENCES routes(id),
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS locations (
    id INTEGER PRIMARY KEY,
    interest_id INTEGER NOT NULL REFERENCES interests(id),
    location TEXT NOT NULL,
    lat REAL,
    lng REAL,
    cached TEXT,
    geoloc_required INTEGER NOT NULL DEFAULT 1,
    UNIQUE(interest_id, location)
);
CREATE TABLE IF NOT EXISTS icons (
    id INTEGER PRIMARY KEY,
    interest_id INTEGER NOT NULL REFERENCES interests(id),
    name TEXT NOT NULL,
    legend_text TEXT,
    svg_file_id TEXT NOT NULL,
    color TEXT NOT NULL,
    shown_on_map INTEGER NOT NULL DEFAULT 1,
    shown_in_table INTEGER NOT NULL DEFAULT 1,
    addr_shown INTEGER NOT NULL DEFAULT 0,
    UNIQUE(interest_id, name)
);
CREATE TABLE IF NOT EXISTS icon_subtypes (
    id INTEGER PRIMARY KEY,
    interest_id INTEGER NOT NULL REFERENCES interests(id),
    name TEXT NOT NULL,
    UNIQUE(interest_id, name)
);
CREATE TABLE IF NOT EXISTS icon_locations (
    id INTEGER PRIMARY KEY,
    interest_id INTEGER NOT NULL REFERENCES interests(id),
    name TEXT NOT NULL,
    icon_id INTEGER NOT NULL REFERENCES icons(id),
    subtype_id INTEGER REFERENCES icon_subtypes(id) ON DELETE SET NULL,
    location TEXT NOT NULL,
    latlng TEXT NOT NULL,
    popup_text TEXT,
    contact_name TEXT,
    email TEXT,
    phone TEXT
);
CREATE INDEX IF NOT EXISTS icon_locations_interest ON icon_locations(interest_id);
"#;

/// Summary fields written back to a route after a track (re-)upload.
#[derive(Debug, Clone)]
pub struct TrackSummary {
    pub distance: f64,
    pub elevation_gain: i64,
    pub start_location: String,
    pub latlng: String,
    pub gpx_file_id: String,
    pub path_file_id: String,
}

/// New file record, before it has an id.
#[derive(Debug, Clone)]
pub struct NewFile<'a> {
    pub fileid: &'a str,
    pub filename: &'a str,
    pub mimetype: &'a str,
    pub interest_id: i64,
    pub route_id: Option<i64>,
}

/// SQLite database client.
#[derive(Clone)]
pub struct SqliteDb {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDb {
    /// Open (creating if needed) the database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let conn = Connection::open(path.as_ref())
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;
        tracing::info!(path = %path.as_ref().display(), "Opened database");
        Self::with_connection(conn)
    }

    /// Create an in-memory database (tests, dry runs).
    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, AppError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(super) fn lock(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.conn
            .lock()
            .map_err(|_| AppError::Database("Database lock poisoned".to_string()))
    }

    // ─── Interest Operations ─────────────────────────────────────

    /// Get an interest by its slug.
    pub fn get_interest(&self, slug: &str) -> Result<Option<Interest>, AppError> {
        let conn = self.lock()?;
        let interest = conn
            .query_row(
                &format!(
                    "SELECT id, slug, description, public FROM {} WHERE slug = ?1",
                    tables::INTERESTS
                ),
                params![slug],
                interest_from_row,
            )
            .optional()?;
        Ok(interest)
    }

    /// Create or update an interest.
    pub fn upsert_interest(
        &self,
        slug: &str,
        description: &str,
        public: bool,
    ) -> Result<Interest, AppError> {
        {
            let conn = self.lock()?;
            conn.execute(
                &format!(
                    "INSERT INTO {} (slug, description, public) VALUES (?1, ?2, ?3)
                     ON CONFLICT(slug) DO UPDATE SET description = excluded.description,
                                                     public = excluded.public",
                    tables::INTERESTS
                ),
                params![slug, description, public],
            )?;
        }
        self.get_interest(slug)?
            .ok_or_else(|| AppError::Database(format!("Interest {} vanished after upsert", slug)))
    }

    // ─── Route Operations ────────────────────────────────────────

    /// Get a route of an interest.
    pub fn get_route(&self, interest_id: i64, route_id: i64) -> Result<Option<Route>, AppError> {
        let conn = self.lock()?;
        let route = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE interest_id = ?1 AND id = ?2",
                    ROUTE_COLUMNS,
                    tables::ROUTES
                ),
                params![interest_id, route_id],
                route_from_row,
            )
            .optional()?;
        Ok(route)
    }

    /// List routes of an interest, optionally only the active ones.
    pub fn list_routes(&self, interest_id: i64, active_only: bool) -> Result<Vec<Route>, AppError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE interest_id = ?1 AND (?2 = 0 OR active = 1) ORDER BY name, id",
            ROUTE_COLUMNS,
            tables::ROUTES
        ))?;
        let routes = stmt
            .query_map(params![interest_id, active_only], route_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(routes)
    }

    /// Snapped start points of every route of an interest.
    pub fn route_start_points(&self, interest_id: i64) -> Result<Vec<String>, AppError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT latlng FROM {} WHERE interest_id = ?1 AND latlng != '' ORDER BY id",
            tables::ROUTES
        ))?;
        let points = stmt
            .query_map(params![interest_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(points)
    }

    /// Insert a route from an admin form and link its files.
    pub fn insert_route(
        &self,
        interest_id: i64,
        form: &RouteForm,
        latlng: &str,
    ) -> Result<Route, AppError> {
        let route_id = {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            tx.execute(
                &format!(
                    "INSERT INTO {} (interest_id, name, distance, start_location, latlng, surface,
                                     elevation_gain, map, turns, gpx_file_id, path_file_id,
                                     description, active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                    tables::ROUTES
                ),
                params![
                    interest_id,
                    form.name,
                    form.distance,
                    form.location,
                    latlng,
                    form.surface.as_str(),
                    form.elevation_gain,
                    form.map,
                    form.turns,
                    form.gpx_file_id,
                    form.path_file_id,
                    form.description,
                    form.active,
                ],
            )?;
            let route_id = tx.last_insert_rowid();
            link_files(&tx, interest_id, route_id, &form.file_ids())?;
            tx.commit()?;
            route_id
        };

        self.get_route(interest_id, route_id)?
            .ok_or_else(|| AppError::Database(format!("Route {} vanished after insert", route_id)))
    }

    /// Update a route from an admin form and relink its files.
    pub fn update_route(
        &self,
        interest_id: i64,
        route_id: i64,
        form: &RouteForm,
        latlng: &str,
    ) -> Result<Route, AppError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            let changed = tx.execute(
                &format!(
                    "UPDATE {} SET name = ?3, distance = ?4, start_location = ?5, latlng = ?6,
                                   surface = ?7, elevation_gain = ?8, map = ?9, turns = ?10,
                                   gpx_file_id = ?11, path_file_id = ?12, description = ?13,
                                   active = ?14
                     WHERE interest_id = ?1 AND id = ?2",
                    tables::ROUTES
                ),
                params![
                    interest_id,
                    route_id,
                    form.name,
                    form.distance,
                    form.location,
                    latlng,
                    form.surface.as_str(),
                    form.elevation_gain,
                    form.map,
                    form.turns,
                    form.gpx_file_id,
                    form.path_file_id,
                    form.description,
                    form.active,
                ],
            )?;
            if changed == 0 {
                return Err(AppError::NotFound(format!("Route {}", route_id)));
            }
            link_files(&tx, interest_id, route_id, &form.file_ids())?;
            tx.commit()?;
        }

        self.get_route(interest_id, route_id)?
            .ok_or_else(|| AppError::NotFound(format!("Route {}", route_id)))
    }

    /// Replace a route's track-derived fields after a re-upload.
    pub fn update_route_track(
        &self,
        interest_id: i64,
        route_id: i64,
        summary: &TrackSummary,
    ) -> Result<Route, AppError> {
        {
            let mut conn = self.lock()?;
            let tx = conn.transaction()?;
            let changed = tx.execute(
                &format!(
                    "UPDATE {} SET distance = ?3, elevation_gain = ?4, start_location = ?5,
                                   latlng = ?6, gpx_file_id = ?7, path_file_id = ?8
                     WHERE interest_id = ?1 AND id = ?2",
                    tables::ROUTES
                ),
                params![
                    interest_id,
                    route_id,
                    summary.distance,
                    summary.elevation_gain,
                    summary.start_location,
                    summary.latlng,
                    summary.gpx_file_id,
                    summary.path_file_id,
                ],
            )?;
            if changed == 0 {
                return Err(AppError::NotFound(format!("Route {}", route_id)));
            }
            link_files(
                &tx,
                interest_id,
                route_id,
                &[summary.gpx_file_id.clone(), summary.path_file_id.clone()],
            )?;
            tx.commit()?;
        }

        self.get_route(interest_id, route_id)?
            .ok_or_else(|| AppError::NotFound(format!("Route {}", route_id)))
    }

    /// Soft delete or restore a route.
    pub fn set_route_active(
        &self,
        interest_id: i64,
        route_id: i64,
        active: bool,
    ) -> Result<(), AppError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET active = ?3 WHERE interest_id = ?1 AND id = ?2",
                tables::ROUTES
            ),
            params![interest_id, route_id, active],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("Route {}", route_id)));
        }
        Ok(())
    }

    // ─── File Operations ─────────────────────────────────────────

    /// Record a stored file.
    pub fn insert_file(&self, file: &NewFile<'_>) -> Result<FileRecord, AppError> {
        let created_at = crate::time_utils::format_utc_rfc3339(Utc::now());
        {
            let conn = self.lock()?;
            conn.execute(
                &format!(
                    "INSERT INTO {} (fileid, filename, mimetype, interest_id, route_id, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    tables::FILES
                ),
                params![
                    file.fileid,
                    file.filename,
                    file.mimetype,
                    file.interest_id,
                    file.route_id,
                    created_at,
                ],
            )?;
        }
        self.get_file(file.fileid)?
            .ok_or_else(|| AppError::Database(format!("File {} vanished after insert", file.fileid)))
    }

    /// Get a file record by its opaque id.
    pub fn get_file(&self, fileid: &str) -> Result<Option<FileRecord>, AppError> {
        let conn = self.lock()?;
        let file = conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE fileid = ?1",
                    FILE_COLUMNS,
                    tables::FILES
                ),
                params![fileid],
                file_from_row,
            )
            .optional()?;
        Ok(file)
    }

    /// List file records of an interest.
    pub fn list_files(&self, interest_id: i64) -> Result<Vec<FileRecord>, AppError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE interest_id = ?1 ORDER BY id",
            FILE_COLUMNS,
            tables::FILES
        ))?;
        let files = stmt
            .query_map(params![interest_id], file_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(files)
    }

    /// Delete a file record. Returns whether a record was removed.
    pub fn delete_file(&self, fileid: &str) -> Result<bool, AppError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            &format!("DELETE FROM {} WHERE fileid = ?1", tables::FILES),
            params![fileid],
        )?;
        Ok(changed > 0)
    }

    // ─── Location Cache Operations ───────────────────────────────

    /// Get the cache entry for a location string.
    pub fn get_location(
        &self,
        interest_id: i64,
        location: &str,
    ) -> Result<Option<LocationEntry>, AppError> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                &format!(
                    "SELECT id, interest_id, location, lat, lng, cached, geoloc_required
                     FROM {} WHERE interest_id = ?1 AND location = ?2",
                    tables::LOCATIONS
                ),
                params![interest_id, location],
                location_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Store coordinates for a location string.
    pub fn upsert_location(
        &self,
        interest_id: i64,
        location: &str,
        lat: f64,
        lng: f64,
        cached: Option<DateTime<Utc>>,
        geoloc_required: bool,
    ) -> Result<(), AppError> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (interest_id, location, lat, lng, cached, geoloc_required)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(interest_id, location) DO UPDATE SET
                     lat = excluded.lat, lng = excluded.lng,
                     cached = excluded.cached, geoloc_required = excluded.geoloc_required",
                tables::LOCATIONS
            ),
            params![
                interest_id,
                location,
                lat,
                lng,
                cached.map(crate::time_utils::format_utc_rfc3339),
                geoloc_required,
            ],
        )?;
        Ok(())
    }
}

const ROUTE_COLUMNS: &str = "id, interest_id, name, distance, start_location, latlng, surface, \
     elevation_gain, map, turns, gpx_file_id, path_file_id, description, active";

const FILE_COLUMNS: &str = "id, fileid, filename, mimetype, interest_id, route_id, created_at";

/// Point exactly `fileids` at `route_id`, unlinking files previously linked to it.
fn link_files(
    tx: &rusqlite::Transaction<'_>,
    interest_id: i64,
    route_id: i64,
    fileids: &[String],
) -> Result<(), AppError> {
    tx.execute(
        &format!(
            "UPDATE {} SET route_id = NULL WHERE route_id = ?1",
            tables::FILES
        ),
        params![route_id],
    )?;
    for fileid in fileids {
        let changed = tx.execute(
            &format!(
                "UPDATE {} SET route_id = ?1 WHERE fileid = ?2 AND interest_id = ?3",
                tables::FILES
            ),
            params![route_id, fileid, interest_id],
        )?;
        if changed == 0 {
            return Err(AppError::BadRequest(format!("Unknown file {}", fileid)));
        }
    }
    Ok(())
}

fn interest_from_row(row: &Row<'_>) -> rusqlite::Result<Interest> {
    Ok(Interest {
        id: row.get(0)?,
        slug: row.get(1)?,
        description: row.get(2)?,
        public: row.get(3)?,
    })
}

fn route_from_row(row: &Row<'_>) -> rusqlite::Result<Route> {
    let surface: String = row.get(6)?;
    Ok(Route {
        id: row.get(0)?,
        interest_id: row.get(1)?,
        name: row.get(2)?,
        distance: row.get(3)?,
        start_location: row.get(4)?,
        latlng: row.get(5)?,
        surface: surface.parse().unwrap_or_default(),
        elevation_gain: row.get(7)?,
        map: row.get(8)?,
        turns: row.get(9)?,
        gpx_file_id: row.get(10)?,
        path_file_id: row.get(11)?,
        description: row.get(12)?,
        active: row.get(13)?,
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: row.get(0)?,
        fileid: row.get(1)?,
        filename: row.get(2)?,
        mimetype: row.get(3)?,
        interest_id: row.get(4)?,
        route_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn location_from_row(row: &Row<'_>) -> rusqlite::Result<LocationEntry> {
    let cached: Option<String> = row.get(5)?;
    Ok(LocationEntry {
        id: row.get(0)?,
        interest_id: row.get(1)?,
        location: row.get(2)?,
        lat: row.get(3)?,
        lng: row.get(4)?,
        cached: cached.as_deref().and_then(crate::time_utils::parse_utc_rfc3339),
        geoloc_required: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Surface;

    fn db_with_interest() -> (SqliteDb, Interest) {
        let db = SqliteDb::open_in_memory().unwrap();
        let interest = db.upsert_interest("fsrc", "Frederick Steeplechasers", true).unwrap();
        (db, interest)
    }

    fn add_file(db: &SqliteDb, interest: &Interest, fileid: &str) {
        db.insert_file(&NewFile {
            fileid,
            filename: "loop.gpx",
            mimetype: "application/gpx+xml",
            interest_id: interest.id,
            route_id: None,
        })
        .unwrap();
    }

    fn form(gpx: &str, path: Option<&str>) -> RouteForm {
        RouteForm {
            name: "Baker Park Loop".to_string(),
            description: Some("meet at the carillon".to_string()),
            surface: Surface::Mixed,
            map: None,
            turns: Some("L on 2nd St\nR on Bentz St".to_string()),
            location: "39.414000, -77.418000".to_string(),
            distance: 3.1,
            elevation_gain: 120,
            gpx_file_id: gpx.to_string(),
            path_file_id: path.map(str::to_string),
            active: true,
        }
    }

    #[test]
    fn test_upsert_interest_updates_in_place() {
        let (db, interest) = db_with_interest();
        let again = db.upsert_interest("fsrc", "FSRC", false).unwrap();
        assert_eq!(again.id, interest.id);
        assert_eq!(again.description, "FSRC");
        assert!(!again.public);
    }

    #[test]
    fn test_insert_route_links_files() {
        let (db, interest) = db_with_interest();
        add_file(&db, &interest, "gpx1");
        add_file(&db, &interest, "path1");

        let route = db
            .insert_route(interest.id, &form("gpx1", Some("path1")), "39.414000,-77.418000")
            .unwrap();

        assert_eq!(route.surface, Surface::Mixed);
        assert_eq!(route.latlng, "39.414000,-77.418000");
        assert_eq!(db.get_file("gpx1").unwrap().unwrap().route_id, Some(route.id));
        assert_eq!(db.get_file("path1").unwrap().unwrap().route_id, Some(route.id));
    }

    #[test]
    fn test_update_route_relinks_files() {
        let (db, interest) = db_with_interest();
        add_file(&db, &interest, "gpx1");
        add_file(&db, &interest, "gpx2");
        let route = db.insert_route(interest.id, &form("gpx1", None), "1,2").unwrap();

        db.update_route(interest.id, route.id, &form("gpx2", None), "1,2")
            .unwrap();

        assert_eq!(db.get_file("gpx1").unwrap().unwrap().route_id, None);
        assert_eq!(db.get_file("gpx2").unwrap().unwrap().route_id, Some(route.id));
    }

    #[test]
    fn test_insert_route_with_unknown_file_rolls_back() {
        let (db, interest) = db_with_interest();
        let err = db
            .insert_route(interest.id, &form("missing", None), "1,2")
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(db.list_routes(interest.id, false).unwrap().is_empty());
    }

    #[test]
    fn test_routes_are_scoped_to_interest() {
        let (db, interest) = db_with_interest();
        let other = db.upsert_interest("other", "Other club", false).unwrap();
        add_file(&db, &interest, "gpx1");
        let route = db.insert_route(interest.id, &form("gpx1", None), "1,2").unwrap();

        assert!(db.get_route(other.id, route.id).unwrap().is_none());
        assert!(db.list_routes(other.id, false).unwrap().is_empty());
        assert!(db.route_start_points(other.id).unwrap().is_empty());
    }

    #[test]
    fn test_soft_delete_hides_from_active_listing() {
        let (db, interest) = db_with_interest();
        add_file(&db, &interest, "gpx1");
        let route = db.insert_route(interest.id, &form("gpx1", None), "1,2").unwrap();

        db.set_route_active(interest.id, route.id, false).unwrap();

        assert!(db.list_routes(interest.id, true).unwrap().is_empty());
        assert_eq!(db.list_routes(interest.id, false).unwrap().len(), 1);
        assert_eq!(db.route_start_points(interest.id).unwrap(), vec!["1,2"]);
    }

    #[test]
    fn test_location_cache_round_trip() {
        let (db, interest) = db_with_interest();
        let now = Utc::now();
        db.upsert_location(interest.id, "Baker Park", 39.41, -77.42, Some(now), true)
            .unwrap();

        let entry = db.get_location(interest.id, "Baker Park").unwrap().unwrap();
        assert_eq!(entry.lat, Some(39.41));
        assert!(entry.geoloc_required);
        assert!(entry.cached.is_some());
        assert!(db.get_location(interest.id, "Elsewhere").unwrap().is_none());
    }

    #[test]
    fn test_delete_file() {
        let (db, interest) = db_with_interest();
        add_file(&db, &interest, "gpx1");
        assert!(db.delete_file("gpx1").unwrap());
        assert!(!db.delete_file("gpx1").unwrap());
        assert!(db.get_file("gpx1").unwrap().is_none());
    }
}
