// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role-based capability checks, scoped per interest.

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Roles carried in session tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Everything, on every interest
    SuperAdmin,
    /// Upload tracks and edit routes
    RoutesAdmin,
    /// Read non-public interest data
    InterestAdmin,
    /// Manage map icons and icon locations
    IconAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "super-admin",
            Role::RoutesAdmin => "routes-admin",
            Role::InterestAdmin => "interest-admin",
            Role::IconAdmin => "icon-admin",
        }
    }

    /// Parse a role name; unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "super-admin" => Some(Role::SuperAdmin),
            "routes-admin" => Some(Role::RoutesAdmin),
            "interest-admin" => Some(Role::InterestAdmin),
            "icon-admin" => Some(Role::IconAdmin),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True if `user` may act as `required` on `interest`.
///
/// Super admins always pass. Everyone else needs the role and membership
/// in the interest.
pub fn has_capability(user: &AuthUser, interest: &str, required: Role) -> bool {
    if user.roles.contains(&Role::SuperAdmin) {
        return true;
    }
    user.roles.contains(&required) && user.interests.iter().any(|i| i == interest)
}

/// `Forbidden` unless [`has_capability`] passes.
pub fn require_capability(user: &AuthUser, interest: &str, required: Role) -> Result<(), AppError> {
    if has_capability(user, interest, required) {
        Ok(())
    } else {
        tracing::warn!(
            user = %user.user_id,
            interest,
            role = %required,
            "Capability check failed"
        );
        Err(AppError::Forbidden)
    }
}
