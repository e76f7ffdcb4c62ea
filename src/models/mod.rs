// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod file;
pub mod icon;
pub mod interest;
pub mod location;
pub mod route;
pub mod track;

pub use file::FileRecord;
pub use icon::{Icon, IconForm, IconLocation, IconLocationForm, IconSubtype, IconSubtypeForm};
pub use interest::Interest;
pub use location::LocationEntry;
pub use route::{Route, RouteForm, Surface};
pub use track::{AnnotatedPoint, ElevationResult, ElevationSample};
