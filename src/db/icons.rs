// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Icon, icon subtype and icon location operations.

use crate::db::tables;
use crate::db::SqliteDb;
use crate::error::AppError;
use crate::models::{
    Icon, IconForm, IconLocation, IconLocationForm, IconSubtype, IconSubtypeForm,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

const ICON_COLUMNS: &str = "id, interest_id, name, legend_text, svg_file_id, color, \
     shown_on_map, shown_in_table, addr_shown";

const ICON_LOCATION_COLUMNS: &str = "id, interest_id, name, icon_id, subtype_id, location, \
     latlng, popup_text, contact_name, email, phone";

impl SqliteDb {
    // ─── Icon Operations ─────────────────────────────────────────

    /// List icons of an interest by name.
    pub fn list_icons(&self, interest_id: i64) -> Result<Vec<Icon>, AppError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE interest_id = ?1 ORDER BY name, id",
            ICON_COLUMNS,
            tables::ICONS
        ))?;
        let icons = stmt
            .query_map(params![interest_id], icon_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(icons)
    }

    pub fn get_icon(&self, interest_id: i64, icon_id: i64) -> Result<Option<Icon>, AppError> {
        let conn = self.lock()?;
        Ok(query_icon(&conn, interest_id, icon_id)?)
    }

    /// Insert an icon. Its SVG must be a file of the same interest.
    pub fn insert_icon(&self, interest_id: i64, form: &IconForm) -> Result<Icon, AppError> {
        let conn = self.lock()?;
        require_file(&conn, interest_id, &form.svg_file_id)?;
        conn.execute(
            &format!(
                "INSERT INTO {} (interest_id, name, legend_text, svg_file_id, color,
                                 shown_on_map, shown_in_table, addr_shown)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                tables::ICONS
            ),
            params![
                interest_id,
                form.name,
                form.legend_text,
                form.svg_file_id,
                form.color,
                form.shown_on_map,
                form.shown_in_table,
                form.addr_shown,
            ],
        )
        .map_err(|e| unique_violation(e, &format!("Icon {:?}", form.name)))?;
        let id = conn.last_insert_rowid();

        query_icon(&conn, interest_id, id)?
            .ok_or_else(|| AppError::Database(format!("Icon {} vanished after insert", id)))
    }

    pub fn update_icon(
        &self,
        interest_id: i64,
        icon_id: i64,
        form: &IconForm,
    ) -> Result<Icon, AppError> {
        let conn = self.lock()?;
        require_file(&conn, interest_id, &form.svg_file_id)?;
        let changed = conn
            .execute(
                &format!(
                    "UPDATE {} SET name = ?3, legend_text = ?4, svg_file_id = ?5, color = ?6,
                                   shown_on_map = ?7, shown_in_table = ?8, addr_shown = ?9
                     WHERE interest_id = ?1 AND id = ?2",
                    tables::ICONS
                ),
                params![
                    interest_id,
                    icon_id,
                    form.name,
                    form.legend_text,
                    form.svg_file_id,
                    form.color,
                    form.shown_on_map,
                    form.shown_in_table,
                    form.addr_shown,
                ],
            )
            .map_err(|e| unique_violation(e, &format!("Icon {:?}", form.name)))?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("Icon {}", icon_id)));
        }

        query_icon(&conn, interest_id, icon_id)?
            .ok_or_else(|| AppError::NotFound(format!("Icon {}", icon_id)))
    }

    /// Delete an icon that no location uses.
    pub fn delete_icon(&self, interest_id: i64, icon_id: i64) -> Result<(), AppError> {
        let conn = self.lock()?;
        let users: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE interest_id = ?1 AND icon_id = ?2",
                tables::ICON_LOCATIONS
            ),
            params![interest_id, icon_id],
            |row| row.get(0),
        )?;
        if users > 0 {
            return Err(AppError::BadRequest(format!(
                "Icon {} is used by {} location(s)",
                icon_id, users
            )));
        }

        let changed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE interest_id = ?1 AND id = ?2",
                tables::ICONS
            ),
            params![interest_id, icon_id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("Icon {}", icon_id)));
        }
        Ok(())
    }

    // ─── Icon Subtype Operations ─────────────────────────────────

    pub fn list_icon_subtypes(&self, interest_id: i64) -> Result<Vec<IconSubtype>, AppError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, interest_id, name FROM {} WHERE interest_id = ?1 ORDER BY name, id",
            tables::ICON_SUBTYPES
        ))?;
        let subtypes = stmt
            .query_map(params![interest_id], subtype_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(subtypes)
    }

    pub fn insert_icon_subtype(
        &self,
        interest_id: i64,
        form: &IconSubtypeForm,
    ) -> Result<IconSubtype, AppError> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (interest_id, name) VALUES (?1, ?2)",
                tables::ICON_SUBTYPES
            ),
            params![interest_id, form.name],
        )
        .map_err(|e| unique_violation(e, &format!("Subtype {:?}", form.name)))?;

        Ok(IconSubtype {
            id: conn.last_insert_rowid(),
            interest_id,
            name: form.name.clone(),
        })
    }

    pub fn update_icon_subtype(
        &self,
        interest_id: i64,
        subtype_id: i64,
        form: &IconSubtypeForm,
    ) -> Result<IconSubtype, AppError> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                &format!(
                    "UPDATE {} SET name = ?3 WHERE interest_id = ?1 AND id = ?2",
                    tables::ICON_SUBTYPES
                ),
                params![interest_id, subtype_id, form.name],
            )
            .map_err(|e| unique_violation(e, &format!("Subtype {:?}", form.name)))?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("Subtype {}", subtype_id)));
        }

        Ok(IconSubtype {
            id: subtype_id,
            interest_id,
            name: form.name.clone(),
        })
    }

    /// Delete a subtype. Locations using it keep their icon and lose the subtype.
    pub fn delete_icon_subtype(&self, interest_id: i64, subtype_id: i64) -> Result<(), AppError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE interest_id = ?1 AND id = ?2",
                tables::ICON_SUBTYPES
            ),
            params![interest_id, subtype_id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("Subtype {}", subtype_id)));
        }
        Ok(())
    }

    // ─── Icon Location Operations ────────────────────────────────

    pub fn list_icon_locations(&self, interest_id: i64) -> Result<Vec<IconLocation>, AppError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE interest_id = ?1 ORDER BY name, id",
            ICON_LOCATION_COLUMNS,
            tables::ICON_LOCATIONS
        ))?;
        let locations = stmt
            .query_map(params![interest_id], icon_location_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(locations)
    }

    /// Insert an icon location whose `location` resolved to `latlng`.
    pub fn insert_icon_location(
        &self,
        interest_id: i64,
        form: &IconLocationForm,
        latlng: &str,
    ) -> Result<IconLocation, AppError> {
        let conn = self.lock()?;
        require_icon_refs(&conn, interest_id, form)?;
        conn.execute(
            &format!(
                "INSERT INTO {} (interest_id, name, icon_id, subtype_id, location, latlng,
                                 popup_text, contact_name, email, phone)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                tables::ICON_LOCATIONS
            ),
            params![
                interest_id,
                form.name,
                form.icon_id,
                form.subtype_id,
                form.location.trim(),
                latlng,
                form.popup_text,
                form.contact_name,
                form.email,
                form.phone,
            ],
        )?;
        let id = conn.last_insert_rowid();

        query_icon_location(&conn, interest_id, id)?.ok_or_else(|| {
            AppError::Database(format!("Icon location {} vanished after insert", id))
        })
    }

    pub fn update_icon_location(
        &self,
        interest_id: i64,
        location_id: i64,
        form: &IconLocationForm,
        latlng: &str,
    ) -> Result<IconLocation, AppError> {
        let conn = self.lock()?;
        require_icon_refs(&conn, interest_id, form)?;
        let changed = conn.execute(
            &format!(
                "UPDATE {} SET name = ?3, icon_id = ?4, subtype_id = ?5, location = ?6,
                               latlng = ?7, popup_text = ?8, contact_name = ?9, email = ?10,
                               phone = ?11
                 WHERE interest_id = ?1 AND id = ?2",
                tables::ICON_LOCATIONS
            ),
            params![
                interest_id,
                location_id,
                form.name,
                form.icon_id,
                form.subtype_id,
                form.location.trim(),
                latlng,
                form.popup_text,
                form.contact_name,
                form.email,
                form.phone,
            ],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("Icon location {}", location_id)));
        }

        query_icon_location(&conn, interest_id, location_id)?
            .ok_or_else(|| AppError::NotFound(format!("Icon location {}", location_id)))
    }

    pub fn delete_icon_location(&self, interest_id: i64, location_id: i64) -> Result<(), AppError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE interest_id = ?1 AND id = ?2",
                tables::ICON_LOCATIONS
            ),
            params![interest_id, location_id],
        )?;
        if changed == 0 {
            return Err(AppError::NotFound(format!("Icon location {}", location_id)));
        }
        Ok(())
    }
}

fn query_icon(conn: &Connection, interest_id: i64, icon_id: i64) -> rusqlite::Result<Option<Icon>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM {} WHERE interest_id = ?1 AND id = ?2",
            ICON_COLUMNS,
            tables::ICONS
        ),
        params![interest_id, icon_id],
        icon_from_row,
    )
    .optional()
}

fn query_icon_location(
    conn: &Connection,
    interest_id: i64,
    location_id: i64,
) -> rusqlite::Result<Option<IconLocation>> {
    conn.query_row(
        &format!(
            "SELECT {} FROM {} WHERE interest_id = ?1 AND id = ?2",
            ICON_LOCATION_COLUMNS,
            tables::ICON_LOCATIONS
        ),
        params![interest_id, location_id],
        icon_location_from_row,
    )
    .optional()
}

/// `BadRequest` unless `fileid` is a file of the interest.
fn require_file(conn: &Connection, interest_id: i64, fileid: &str) -> Result<(), AppError> {
    let found = conn
        .query_row(
            &format!(
                "SELECT 1 FROM {} WHERE fileid = ?1 AND interest_id = ?2",
                tables::FILES
            ),
            params![fileid, interest_id],
            |_| Ok(()),
        )
        .optional()?;
    found.ok_or_else(|| AppError::BadRequest(format!("Unknown file {}", fileid)))
}

/// `BadRequest` unless the form's icon and subtype belong to the interest.
fn require_icon_refs(
    conn: &Connection,
    interest_id: i64,
    form: &IconLocationForm,
) -> Result<(), AppError> {
    if query_icon(conn, interest_id, form.icon_id)?.is_none() {
        return Err(AppError::BadRequest(format!("Unknown icon {}", form.icon_id)));
    }
    if let Some(subtype_id) = form.subtype_id {
        let found = conn
            .query_row(
                &format!(
                    "SELECT 1 FROM {} WHERE interest_id = ?1 AND id = ?2",
                    tables::ICON_SUBTYPES
                ),
                params![interest_id, subtype_id],
                |_| Ok(()),
            )
            .optional()?;
        if found.is_none() {
            return Err(AppError::BadRequest(format!("Unknown subtype {}", subtype_id)));
        }
    }
    Ok(())
}

/// Duplicate names are a client error.
fn unique_violation(err: rusqlite::Error, what: &str) -> AppError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            AppError::BadRequest(format!("{} already exists", what))
        }
        _ => err.into(),
    }
}

fn icon_from_row(row: &Row<'_>) -> rusqlite::Result<Icon> {
    Ok(Icon {
        id: row.get(0)?,
        interest_id: row.get(1)?,
        name: row.get(2)?,
        legend_text: row.get(3)?,
        svg_file_id: row.get(4)?,
        color: row.get(5)?,
        shown_on_map: row.get(6)?,
        shown_in_table: row.get(7)?,
        addr_shown: row.get(8)?,
    })
}

fn subtype_from_row(row: &Row<'_>) -> rusqlite::Result<IconSubtype> {
    Ok(IconSubtype {
        id: row.get(0)?,
        interest_id: row.get(1)?,
        name: row.get(2)?,
    })
}

fn icon_location_from_row(row: &Row<'_>) -> rusqlite::Result<IconLocation> {
    Ok(IconLocation {
        id: row.get(0)?,
        interest_id: row.get(1)?,
        name: row.get(2)?,
        icon_id: row.get(3)?,
        subtype_id: row.get(4)?,
        location: row.get(5)?,
        latlng: row.get(6)?,
        popup_text: row.get(7)?,
        contact_name: row.get(8)?,
        email: row.get(9)?,
        phone: row.get(10)?,
    })
}
