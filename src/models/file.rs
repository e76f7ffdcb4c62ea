// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Stored file artifact records.

use serde::{Deserialize, Serialize};

/// Mimetype recorded for path artifacts.
pub const PATH_MIMETYPE: &str = "text/csv";

/// Filename suffix for path artifacts.
pub const PATH_SUFFIX: &str = ".csv";

/// Metadata for a blob stored under `<file folder>/<interest>/<fileid>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: i64,
    /// Opaque, globally unique file identifier
    pub fileid: String,
    /// Original (or derived) filename, used for downloads
    pub filename: String,
    pub mimetype: String,
    pub interest_id: i64,
    /// Owning route, once the route has been saved
    pub route_id: Option<i64>,
    /// When the record was created (RFC3339)
    pub created_at: String,
}
