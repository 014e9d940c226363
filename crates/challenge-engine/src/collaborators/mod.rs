// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! External collaborators consumed by the engines.
//!
//! Identity, user lookup, activity content and object storage belong to other
//! services. Only their interfaces live here, plus in-process [`mock`]
//! implementations.

pub mod mock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Role that unlocks authoring and administrative operations.
pub const ADMIN_ROLE: &str = "ADMIN";

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Caller's user id. Trusted for every user-scoped operation.
    pub user_id: String,
    /// Granted roles.
    pub roles: Vec<String>,
}

impl Identity {
    /// Create an identity with the given roles.
    pub fn new(user_id: impl Into<String>, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            user_id: user_id.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether the caller holds [`ADMIN_ROLE`].
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(ADMIN_ROLE))
    }
}

/// Resolves request credentials into an [`Identity`].
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticate opaque credentials (e.g. a bearer token).
    ///
    /// Fails with [`crate::Error::Unauthenticated`] when they are not accepted.
    async fn authenticate(&self, credentials: &str) -> Result<Identity>;
}

/// Lookup of known users.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether `user_id` refers to an existing user.
    async fn user_exists(&self, user_id: &str) -> Result<bool>;
}

/// Displayable content for one activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityContent {
    /// Activity title.
    pub title: String,
    /// Activity description.
    pub description: String,
    /// Where the activity is played.
    pub url: Option<String>,
}

/// Resolves activity ids referenced by day plans.
#[async_trait]
pub trait ActivityCatalog: Send + Sync {
    /// Resolve `activity_id` into displayable content.
    async fn resolve(&self, activity_id: &str) -> Result<ActivityContent>;
}

/// Binary object storage for cover images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `path` and return a durable URL.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String>;

    /// Delete the object behind `url`.
    async fn delete(&self, url: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_admin() {
        assert!(Identity::new("u1", ["USER", "ADMIN"]).is_admin());
        assert!(Identity::new("u1", ["admin"]).is_admin());
        assert!(!Identity::new("u1", ["USER"]).is_admin());
        assert!(!Identity::new("u1", Vec::<String>::new()).is_admin());
    }
}
