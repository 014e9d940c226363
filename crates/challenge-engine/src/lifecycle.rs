// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Challenge authoring: create, update, delete and reads.
//!
//! Authoring may only move a challenge from `draft` to `published`. Going live
//! and closing belong to [`crate::status_scheduler`].

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::MAX_WRITE_ATTEMPTS;
use crate::collaborators::ObjectStorage;
use crate::error::{Error, Result};
use crate::model::{ChallengeEvent, ChallengeRecord, ChallengeStatus, DayPlan, DayPlanEntry};
use crate::persistence::Persistence;

/// Cover URLs containing this host are shared defaults and never deleted.
pub const PLACEHOLDER_IMAGE_HOST: &str = "placeholder.com";

/// Storage prefix for uploaded cover images.
pub const COVER_PREFIX: &str = "challenges/covers";

/// Fields of a new challenge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChallenge {
    /// Title shown to users.
    pub title: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Number of days.
    pub duration: i32,
    /// First day of the window.
    pub start_date: NaiveDate,
    /// Last day of the window.
    pub end_date: NaiveDate,
    /// Optional initial day plan.
    #[serde(default)]
    pub day_plan: Option<Vec<DayPlanEntry>>,
    /// Optional cover image URL.
    #[serde(default)]
    pub image_url: Option<String>,
    /// `draft` (default) or `published`.
    #[serde(default)]
    pub status: Option<ChallengeStatus>,
}

/// Partial update of a draft challenge. `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeUpdate {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New duration.
    pub duration: Option<i32>,
    /// New start date.
    pub start_date: Option<NaiveDate>,
    /// New end date.
    pub end_date: Option<NaiveDate>,
    /// Replacement day plan. Replaces the stored plan wholesale.
    pub day_plan: Option<Vec<DayPlanEntry>>,
    /// New cover image URL.
    pub image_url: Option<String>,
    /// `draft` keeps the challenge editable, `published` publishes it.
    pub status: Option<ChallengeStatus>,
}

/// Owns authoring-triggered challenge transitions.
#[derive(Clone)]
pub struct ChallengeLifecycleManager {
    persistence: Arc<dyn Persistence>,
    storage: Arc<dyn ObjectStorage>,
}

impl ChallengeLifecycleManager {
    /// Create a manager over `persistence`, deleting replaced covers from `storage`.
    pub fn new(persistence: Arc<dyn Persistence>, storage: Arc<dyn ObjectStorage>) -> Self {
        Self {
            persistence,
            storage,
        }
    }

    /// Create a challenge in `draft`, or directly in `published` when the day
    /// plan covers every day.
    pub async fn create(&self, request: NewChallenge) -> Result<ChallengeRecord> {
        ChallengeRecord::validate_schedule(request.duration, request.start_date, request.end_date)?;

        let day_plan = DayPlan::from_entries(request.day_plan.unwrap_or_default())?;
        day_plan.validate_range(request.duration)?;

        let now = Utc::now();
        let mut challenge = ChallengeRecord {
            id: uuid::Uuid::new_v4().to_string(),
            title: request.title,
            description: request.description,
            duration: request.duration,
            status: ChallengeStatus::Draft,
            start_date: request.start_date,
            end_date: request.end_date,
            image_url: request.image_url.filter(|url| !url.trim().is_empty()),
            day_plan,
            created_at: now,
            updated_at: now,
            version: 1,
        };

        if authoring_target(request.status)? == ChallengeStatus::Published {
            challenge.day_plan.ensure_complete(challenge.duration)?;
            challenge.apply(ChallengeEvent::Publish)?;
        }

        self.persistence.insert_challenge(&challenge).await?;

        info!(
            challenge_id = %challenge.id,
            status = %challenge.status(),
            duration = challenge.duration,
            planned_days = challenge.day_plan.len(),
            "Challenge created"
        );

        Ok(challenge)
    }

    /// Apply `update` to a draft challenge.
    ///
    /// A supplied day plan replaces the stored one. Publishing requires the
    /// resulting plan to cover every day. The duration of a joined draft can
    /// grow but not shrink.
    pub async fn update(&self, challenge_id: &str, update: ChallengeUpdate) -> Result<ChallengeRecord> {
        let target = authoring_target(update.status)?;

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut challenge = self.get_by_id(challenge_id).await?;

            if challenge.status() != ChallengeStatus::Draft {
                return Err(Error::InvalidState(format!(
                    "Only draft challenges can be edited; challenge '{}' is {}",
                    challenge_id,
                    challenge.status()
                )));
            }

            if let Some(title) = &update.title {
                challenge.title = title.clone();
            }
            if let Some(description) = &update.description {
                challenge.description = description.clone();
            }
            if let Some(duration) = update.duration {
                if duration < challenge.duration {
                    let participants = self
                        .persistence
                        .count_participations_for_challenge(challenge_id)
                        .await?;
                    if participants > 0 {
                        return Err(Error::InvalidState(format!(
                            "Challenge '{}' has {} participation(s); duration cannot shrink from {} to {}",
                            challenge_id, participants, challenge.duration, duration
                        )));
                    }
                }
                challenge.duration = duration;
            }
            if let Some(start_date) = update.start_date {
                challenge.start_date = start_date;
            }
            if let Some(end_date) = update.end_date {
                challenge.end_date = end_date;
            }
            ChallengeRecord::validate_schedule(
                challenge.duration,
                challenge.start_date,
                challenge.end_date,
            )?;

            let replace_day_plan = update.day_plan.is_some();
            if let Some(entries) = &update.day_plan {
                challenge.day_plan = DayPlan::from_entries(entries.iter().cloned())?;
            }
            challenge.day_plan.validate_range(challenge.duration)?;

            if target == ChallengeStatus::Published {
                challenge.day_plan.ensure_complete(challenge.duration)?;
                challenge.apply(ChallengeEvent::Publish)?;
            }

            let replaced_image = match update.image_url.as_deref().map(str::trim) {
                Some(url) if !url.is_empty() && challenge.image_url.as_deref() != Some(url) => {
                    challenge.image_url.replace(url.to_string())
                }
                _ => None,
            };

            challenge.updated_at = Utc::now();

            if self
                .persistence
                .update_challenge(&challenge, replace_day_plan)
                .await?
            {
                challenge.version += 1;

                info!(
                    challenge_id = %challenge.id,
                    status = %challenge.status(),
                    day_plan_replaced = replace_day_plan,
                    "Challenge updated"
                );

                if let Some(old_url) = replaced_image {
                    self.discard_image(&old_url).await;
                }

                return Ok(challenge);
            }

            debug!(challenge_id, attempt, "Challenge version changed, retrying update");
        }

        Err(Error::Conflict(format!(
            "challenge '{}' kept changing during update",
            challenge_id
        )))
    }

    /// Delete a draft challenge that nobody has joined.
    pub async fn delete(&self, challenge_id: &str) -> Result<()> {
        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let challenge = self.get_by_id(challenge_id).await?;

            if challenge.status() != ChallengeStatus::Draft {
                return Err(Error::InvalidState(format!(
                    "Only draft challenges can be deleted; challenge '{}' is {}",
                    challenge_id,
                    challenge.status()
                )));
            }

            let participants = self
                .persistence
                .count_participations_for_challenge(challenge_id)
                .await?;
            if participants > 0 {
                return Err(Error::InvalidState(format!(
                    "Challenge '{}' has {} participation(s) and cannot be deleted",
                    challenge_id, participants
                )));
            }

            if self
                .persistence
                .delete_challenge(challenge_id, challenge.version())
                .await?
            {
                info!(challenge_id, "Challenge deleted");
                if let Some(url) = &challenge.image_url {
                    self.discard_image(url).await;
                }
                return Ok(());
            }

            debug!(challenge_id, attempt, "Challenge version changed, retrying delete");
        }

        Err(Error::Conflict(format!(
            "challenge '{}' kept changing during delete",
            challenge_id
        )))
    }

    /// Load a challenge or fail with [`Error::ChallengeNotFound`].
    pub async fn get_by_id(&self, challenge_id: &str) -> Result<ChallengeRecord> {
        self.persistence
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| Error::ChallengeNotFound(challenge_id.to_string()))
    }

    /// Every challenge, oldest first.
    pub async fn list_all(&self) -> Result<Vec<ChallengeRecord>> {
        self.persistence.list_challenges(None).await
    }

    /// Challenges in `status`, oldest first.
    pub async fn list_by_status(&self, status: ChallengeStatus) -> Result<Vec<ChallengeRecord>> {
        self.persistence.list_challenges(Some(status)).await
    }

    /// List challenges, optionally filtered by a status name.
    pub async fn list(&self, status: Option<&str>) -> Result<Vec<ChallengeRecord>> {
        match status.map(str::trim).filter(|s| !s.is_empty()) {
            Some(name) => {
                let status = name.parse::<ChallengeStatus>().map_err(|_| {
                    Error::Validation(format!("Unknown challenge status '{}'", name))
                })?;
                self.list_by_status(status).await
            }
            None => self.list_all().await,
        }
    }

    /// Day plan sorted by day number.
    pub async fn day_plan(&self, challenge_id: &str) -> Result<Vec<DayPlanEntry>> {
        Ok(self.get_by_id(challenge_id).await?.day_plan.entries())
    }

    /// Store cover image bytes and return their URL.
    pub async fn upload_cover(&self, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        if bytes.is_empty() {
            return Err(Error::Validation("Cover image is empty".to_string()));
        }

        let name = sanitize_file_name(file_name);
        if name.is_empty() {
            return Err(Error::Validation("Cover image needs a file name".to_string()));
        }

        let path = format!("{}/{}-{}", COVER_PREFIX, uuid::Uuid::new_v4(), name);
        let url = self.storage.put(&path, bytes).await?;
        info!(%url, "Challenge cover uploaded");
        Ok(url)
    }

    async fn discard_image(&self, url: &str) {
        if url.contains(PLACEHOLDER_IMAGE_HOST) {
            return;
        }
        match self.storage.delete(url).await {
            Ok(()) => info!(%url, "Deleted replaced challenge cover"),
            Err(e) => warn!(%url, error = %e, "Failed to delete replaced challenge cover"),
        }
    }
}

/// Status an authoring request may ask for.
fn authoring_target(requested: Option<ChallengeStatus>) -> Result<ChallengeStatus> {
    match requested {
        None | Some(ChallengeStatus::Draft) => Ok(ChallengeStatus::Draft),
        Some(ChallengeStatus::Published) => Ok(ChallengeStatus::Published),
        Some(other) => Err(Error::InvalidState(format!(
            "Challenges reach '{}' only through the status scheduler",
            other
        ))),
    }
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authoring_target() {
        assert_eq!(authoring_target(None).unwrap(), ChallengeStatus::Draft);
        assert_eq!(
            authoring_target(Some(ChallengeStatus::Published)).unwrap(),
            ChallengeStatus::Published
        );
        assert!(matches!(
            authoring_target(Some(ChallengeStatus::Active)),
            Err(Error::InvalidState(_))
        ));
        assert!(matches!(
            authoring_target(Some(ChallengeStatus::Completed)),
            Err(Error::InvalidState(_))
        ));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("cover.png"), "cover.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\tmp\\my cover.jpg"), "my_cover.jpg");
        assert_eq!(sanitize_file_name("dir/"), "");
    }
}
