// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Interest (tenant) model.

use serde::{Deserialize, Serialize};

/// A club or organization whose routes are administered separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    pub id: i64,
    /// URL slug, e.g. "fsrc"
    pub slug: String,
    pub description: String,
    /// Whether anonymous users may browse this interest's routes
    pub public: bool,
}
