// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! User participation: join, day completion, progress and reads.
//!
//! Day completion is tracked as a set and is not gated on the current day
//! pointer. Moving the pointer is left to
//! [`crate::progress_scheduler::ParticipationAdvancer`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::MAX_WRITE_ATTEMPTS;
use crate::collaborators::{ActivityCatalog, ActivityContent, UserDirectory};
use crate::error::{Error, Result};
use crate::model::{ChallengeRecord, DayCompletion, ParticipationRecord, ParticipationStatus};
use crate::persistence::Persistence;

/// Result of a read-modify-write closure.
pub(crate) enum Mutation<T> {
    /// Nothing to write.
    Unchanged(T),
    /// Record changed and must be written.
    Changed(T),
}

/// Re-read, mutate and version-checked write of one participation, retrying
/// when another writer got there first.
pub(crate) async fn modify_participation<T, F>(
    persistence: &dyn Persistence,
    user_id: &str,
    challenge_id: &str,
    mut mutate: F,
) -> Result<T>
where
    F: FnMut(&mut ParticipationRecord) -> Result<Mutation<T>>,
{
    for attempt in 1..=MAX_WRITE_ATTEMPTS {
        let mut participation = persistence
            .get_participation(user_id, challenge_id)
            .await?
            .ok_or_else(|| Error::ParticipationNotFound {
                user_id: user_id.to_string(),
                challenge_id: challenge_id.to_string(),
            })?;

        match mutate(&mut participation)? {
            Mutation::Unchanged(value) => return Ok(value),
            Mutation::Changed(value) => {
                if persistence.update_participation(&participation).await? {
                    return Ok(value);
                }
                debug!(
                    user_id,
                    challenge_id, attempt, "Participation version changed, retrying"
                );
            }
        }
    }

    Err(Error::Conflict(format!(
        "participation of user '{}' in challenge '{}' kept changing",
        user_id, challenge_id
    )))
}

/// Activity planned for one day, with the caller's completion flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivity {
    /// Challenge identifier.
    pub challenge_id: String,
    /// Day number.
    pub day_number: i32,
    /// Planned activity.
    pub activity_id: String,
    /// Resolved content, absent when the catalog could not resolve it.
    pub content: Option<ActivityContent>,
    /// Whether the requesting user completed this day.
    pub completed: bool,
}

/// Summary of one in-progress participation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentChallenge {
    /// Challenge identifier.
    pub challenge_id: String,
    /// Challenge title.
    pub title: String,
    /// Challenge description.
    pub description: String,
    /// Number of days.
    pub duration: i32,
    /// Cover image.
    pub image_url: Option<String>,
    /// Completed day count.
    pub progress: usize,
    /// Day the pointer is waiting on.
    pub current_day: i32,
    /// Title of the current day's activity, when resolvable.
    pub current_activity_title: Option<String>,
    /// When the user joined.
    pub started_at: DateTime<Utc>,
}

/// Owns user-triggered participation transitions.
#[derive(Clone)]
pub struct ParticipationEngine {
    persistence: Arc<dyn Persistence>,
    users: Arc<dyn UserDirectory>,
    catalog: Arc<dyn ActivityCatalog>,
}

impl ParticipationEngine {
    /// Create an engine.
    pub fn new(
        persistence: Arc<dyn Persistence>,
        users: Arc<dyn UserDirectory>,
        catalog: Arc<dyn ActivityCatalog>,
    ) -> Self {
        Self {
            persistence,
            users,
            catalog,
        }
    }

    /// Enroll `user_id` in `challenge_id`, or return the existing participation.
    pub async fn join(&self, user_id: &str, challenge_id: &str) -> Result<ParticipationRecord> {
        if let Some(existing) = self
            .persistence
            .get_participation(user_id, challenge_id)
            .await?
        {
            return Ok(existing);
        }

        self.challenge(challenge_id).await?;
        if !self.users.user_exists(user_id).await? {
            return Err(Error::UserNotFound(user_id.to_string()));
        }

        let candidate = ParticipationRecord::enroll(user_id, challenge_id, Utc::now());
        let stored = self
            .persistence
            .insert_participation_if_absent(&candidate)
            .await?;

        if stored.id == candidate.id {
            info!(
                user_id,
                challenge_id,
                participation_id = %stored.id,
                "User joined challenge"
            );
        }

        Ok(stored)
    }

    /// Explicit alias of [`Self::join`].
    pub async fn start(&self, user_id: &str, challenge_id: &str) -> Result<ParticipationRecord> {
        self.join(user_id, challenge_id).await
    }

    /// Mark `day` as completed. Repeating a completed day is a no-op.
    pub async fn complete_day(
        &self,
        user_id: &str,
        challenge_id: &str,
        day: i32,
    ) -> Result<DayCompletion> {
        let challenge = self.challenge(challenge_id).await?;
        let now = Utc::now();

        let outcome = modify_participation(
            self.persistence.as_ref(),
            user_id,
            challenge_id,
            |participation| {
                Ok(match participation.complete_day(day, challenge.duration, now)? {
                    DayCompletion::AlreadyRecorded => {
                        Mutation::Unchanged(DayCompletion::AlreadyRecorded)
                    }
                    other => Mutation::Changed(other),
                })
            },
        )
        .await?;

        match outcome {
            DayCompletion::AlreadyRecorded => {
                debug!(user_id, challenge_id, day, "Day already completed")
            }
            DayCompletion::Recorded => info!(user_id, challenge_id, day, "Day completed"),
            DayCompletion::Finished => {
                info!(user_id, challenge_id, day, "Day completed, challenge finished")
            }
        }

        Ok(outcome)
    }

    /// Current participation, enrolling the user first when none exists.
    pub async fn get_progress(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<ParticipationRecord> {
        match self
            .persistence
            .get_participation(user_id, challenge_id)
            .await?
        {
            Some(participation) => Ok(participation),
            None => self.join(user_id, challenge_id).await,
        }
    }

    /// Every participation of `user_id`, any status.
    pub async fn history(&self, user_id: &str) -> Result<Vec<ParticipationRecord>> {
        self.persistence
            .list_participations_for_user(user_id, None)
            .await
    }

    /// Activity planned for `day`. Catalog failures blank the content only.
    pub async fn daily_activity(
        &self,
        challenge_id: &str,
        day: i32,
        user_id: Option<&str>,
    ) -> Result<DailyActivity> {
        let challenge = self.challenge(challenge_id).await?;
        let activity_id = challenge
            .day_plan
            .activity_for(day)
            .ok_or_else(|| Error::DayNotFound {
                challenge_id: challenge_id.to_string(),
                day,
            })?
            .to_string();

        let content = self.resolve(&activity_id).await;

        let completed = match user_id {
            Some(user_id) => self
                .persistence
                .get_participation(user_id, challenge_id)
                .await?
                .is_some_and(|p| p.has_completed(day)),
            None => false,
        };

        Ok(DailyActivity {
            challenge_id: challenge.id,
            day_number: day,
            activity_id,
            content,
            completed,
        })
    }

    /// In-progress participations of `user_id` with challenge details.
    pub async fn current_challenges(&self, user_id: &str) -> Result<Vec<CurrentChallenge>> {
        let participations = self
            .persistence
            .list_participations_for_user(user_id, Some(ParticipationStatus::InProgress))
            .await?;

        let mut current = Vec::with_capacity(participations.len());
        for participation in participations {
            let Some(challenge) = self
                .persistence
                .get_challenge(&participation.challenge_id)
                .await?
            else {
                warn!(
                    user_id,
                    challenge_id = %participation.challenge_id,
                    "Participation references a missing challenge"
                );
                continue;
            };

            let current_activity_title = match challenge
                .day_plan
                .activity_for(participation.current_day())
            {
                Some(activity_id) => self.resolve(activity_id).await.map(|c| c.title),
                None => None,
            };

            current.push(CurrentChallenge {
                challenge_id: challenge.id,
                title: challenge.title,
                description: challenge.description,
                duration: challenge.duration,
                image_url: challenge.image_url,
                progress: participation.progress(),
                current_day: participation.current_day(),
                current_activity_title,
                started_at: participation.started_at,
            });
        }

        Ok(current)
    }

    async fn challenge(&self, challenge_id: &str) -> Result<ChallengeRecord> {
        self.persistence
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| Error::ChallengeNotFound(challenge_id.to_string()))
    }

    async fn resolve(&self, activity_id: &str) -> Option<ActivityContent> {
        match self.catalog.resolve(activity_id).await {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(activity_id, error = %e, "Failed to resolve activity content");
                None
            }
        }
    }
}
