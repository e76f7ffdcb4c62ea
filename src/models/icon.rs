// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Map icons and the points of interest that use them.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Mimetype recorded for icon SVG uploads.
pub const SVG_MIMETYPE: &str = "image/svg+xml";

/// An icon symbol with its legend and display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Icon {
    pub id: i64,
    pub interest_id: i64,
    /// Name used in tables, pop-ups and pick lists
    pub name: String,
    /// Legend text, when it differs from the name
    pub legend_text: Option<String>,
    pub svg_file_id: String,
    /// Any CSS color value
    pub color: String,
    /// Show locations with this icon on the routes map
    pub shown_on_map: bool,
    /// Show locations with this icon in the icon map table
    pub shown_in_table: bool,
    /// Show the location text in route pop-ups
    pub addr_shown: bool,
}

/// Create/update form for icons.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IconForm {
    #[validate(length(min = 1, max = 64, message = "icon name is required"))]
    pub name: String,
    #[validate(length(max = 128))]
    pub legend_text: Option<String>,
    #[validate(length(min = 1, message = "svg file is required"))]
    pub svg_file_id: String,
    #[validate(length(min = 1, max = 32, message = "color is required"))]
    pub color: String,
    #[serde(default = "default_true")]
    pub shown_on_map: bool,
    #[serde(default = "default_true")]
    pub shown_in_table: bool,
    #[serde(default)]
    pub addr_shown: bool,
}

fn default_true() -> bool {
    true
}

/// Optional finer classification of icon locations, e.g. "restroom".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconSubtype {
    pub id: i64,
    pub interest_id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IconSubtypeForm {
    #[validate(length(min = 1, max = 64, message = "subtype is required"))]
    pub name: String,
}

/// A point of interest drawn with an icon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IconLocation {
    pub id: i64,
    pub interest_id: i64,
    pub name: String,
    pub icon_id: i64,
    pub subtype_id: Option<i64>,
    /// Location as entered (address or "lat, lng")
    pub location: String,
    /// Resolved point, "lat,lng" with 6 decimals
    pub latlng: String,
    /// Text shown in the pop-up instead of the location
    pub popup_text: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Create/update form for icon locations.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct IconLocationForm {
    #[validate(length(min = 1, max = 128, message = "name is required"))]
    pub name: String,
    pub icon_id: i64,
    pub subtype_id: Option<i64>,
    #[validate(length(min = 1, max = 512, message = "location is required"))]
    pub location: String,
    #[validate(length(max = 512))]
    pub popup_text: Option<String>,
    #[validate(length(max = 128))]
    pub contact_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icon_form_defaults() {
        let form: IconForm = serde_json::from_value(serde_json::json!({
            "name": "Water",
            "svg_file_id": "abc",
            "color": "blue",
        }))
        .unwrap();
        assert!(form.shown_on_map);
        assert!(form.shown_in_table);
        assert!(!form.addr_shown);
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_icon_location_form_rejects_bad_email() {
        let form: IconLocationForm = serde_json::from_value(serde_json::json!({
            "name": "Carroll Creek fountain",
            "icon_id": 1,
            "location": "39.414, -77.410",
            "email": "not an address",
        }))
        .unwrap();
        let errors = form.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
    }
}
