// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-process collaborators for tests and embedding.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{ActivityCatalog, ActivityContent, Identity, IdentityProvider, ObjectStorage, UserDirectory};
use crate::error::{Error, Result};

/// Token-table identity provider.
#[derive(Debug, Default, Clone)]
pub struct MockIdentityProvider {
    tokens: HashMap<String, Identity>,
}

impl MockIdentityProvider {
    /// Create an empty provider that rejects every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as a regular user.
    pub fn with_user(mut self, token: &str, user_id: &str) -> Self {
        self.tokens
            .insert(token.to_string(), Identity::new(user_id, ["USER"]));
        self
    }

    /// Accept `token` as an administrator.
    pub fn with_admin(mut self, token: &str, user_id: &str) -> Self {
        self.tokens
            .insert(token.to_string(), Identity::new(user_id, ["USER", "ADMIN"]));
        self
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn authenticate(&self, credentials: &str) -> Result<Identity> {
        self.tokens
            .get(credentials)
            .cloned()
            .ok_or(Error::Unauthenticated)
    }
}

/// Fixed set of known users.
#[derive(Debug, Default)]
pub struct MockUserDirectory {
    users: Mutex<HashSet<String>>,
}

impl MockUserDirectory {
    /// Directory containing `users`.
    pub fn with_users(users: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            users: Mutex::new(users.into_iter().map(Into::into).collect()),
        }
    }

    /// Register another user.
    pub async fn add_user(&self, user_id: &str) {
        self.users.lock().await.insert(user_id.to_string());
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn user_exists(&self, user_id: &str) -> Result<bool> {
        Ok(self.users.lock().await.contains(user_id))
    }
}

/// Activity catalog backed by a map, with optional failing ids.
#[derive(Debug, Default, Clone)]
pub struct MockActivityCatalog {
    activities: HashMap<String, ActivityContent>,
    failing: HashSet<String>,
}

impl MockActivityCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an activity titled `title`.
    pub fn with_activity(mut self, activity_id: &str, title: &str) -> Self {
        self.activities.insert(
            activity_id.to_string(),
            ActivityContent {
                title: title.to_string(),
                description: format!("{} description", title),
                url: Some(format!("https://games.example.com/{}", activity_id)),
            },
        );
        self
    }

    /// Make resolving `activity_id` fail.
    pub fn failing_on(mut self, activity_id: &str) -> Self {
        self.failing.insert(activity_id.to_string());
        self
    }
}

#[async_trait]
impl ActivityCatalog for MockActivityCatalog {
    async fn resolve(&self, activity_id: &str) -> Result<ActivityContent> {
        if self.failing.contains(activity_id) {
            return Err(Error::Collaborator(format!(
                "Activity catalog unavailable for '{}'",
                activity_id
            )));
        }
        self.activities
            .get(activity_id)
            .cloned()
            .ok_or_else(|| Error::Collaborator(format!("Unknown activity '{}'", activity_id)))
    }
}

/// Object storage that keeps bytes in memory and records deletions.
#[derive(Debug, Clone)]
pub struct MockObjectStorage {
    base_url: String,
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    deleted: Arc<Mutex<Vec<String>>>,
    /// If true, every delete fails.
    pub fail_deletes: bool,
}

impl Default for MockObjectStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockObjectStorage {
    /// Create an empty store serving from `https://storage.example.com`.
    pub fn new() -> Self {
        Self {
            base_url: "https://storage.example.com".to_string(),
            objects: Arc::new(Mutex::new(HashMap::new())),
            deleted: Arc::new(Mutex::new(Vec::new())),
            fail_deletes: false,
        }
    }

    /// Create a store whose deletes always fail.
    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::new()
        }
    }

    /// URLs currently stored.
    pub async fn stored_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.objects.lock().await.keys().cloned().collect();
        urls.sort();
        urls
    }

    /// URLs passed to `delete`, in call order.
    pub async fn deleted_urls(&self) -> Vec<String> {
        self.deleted.lock().await.clone()
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<String> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        self.objects.lock().await.insert(url.clone(), bytes);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        self.deleted.lock().await.push(url.to_string());
        if self.fail_deletes {
            return Err(Error::Collaborator(format!("Failed to delete {}", url)));
        }
        self.objects.lock().await.remove(url);
        Ok(())
    }
}
