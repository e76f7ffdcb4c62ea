//! Database layer (SQLite).

mod icons;
pub mod sqlite;

pub use sqlite::{NewFile, SqliteDb, TrackSummary};

/// Table names as constants.
pub mod tables {
    pub const INTERESTS: &str = "interests";
    pub const ROUTES: &str = "routes";
    /// File artifact metadata (blobs live on disk)
    pub const FILES: &str = "files";
    pub const LOCATIONS: &str = "locations";
    pub const ICONS: &str = "icons";
    pub const ICON_SUBTYPES: &str = "icon_subtypes";
    /// Points of interest shown with an icon
    pub const ICON_LOCATIONS: &str = "icon_locations";
}
