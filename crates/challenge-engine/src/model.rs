// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Domain records and the two forward-only status machines.
//!
//! Status fields are crate-private. They only change through
//! [`ChallengeStatus::apply`] and [`ParticipationStatus::apply`], which reject
//! every transition not drawn below:
//!
//! ```text
//! Challenge:      draft --publish--> published --go_live--> active --close--> completed
//! Participation:  enrolled --day_completed--> in_progress --finish--> completed
//!                 enrolled --finish--> completed
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Error, Result};

/// A status string did not match any known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown status: {0}")]
pub struct ParseStatusError(pub String);

/// A status machine rejected an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// Rejected challenge transition.
    #[error("Cannot apply '{event}' to challenge in status '{from}'")]
    Challenge {
        /// Status the challenge was in.
        from: ChallengeStatus,
        /// Event that was rejected.
        event: ChallengeEvent,
    },
    /// Rejected participation transition.
    #[error("Cannot apply '{event}' to participation in status '{from}'")]
    Participation {
        /// Status the participation was in.
        from: ParticipationStatus,
        /// Event that was rejected.
        event: ParticipationEvent,
    },
}

// ============================================================================
// Challenge status machine
// ============================================================================

/// Lifecycle status of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeStatus {
    /// Being authored; day plan may be incomplete.
    Draft,
    /// Authoring finished; waiting for its start date.
    Published,
    /// Running; between start and end date.
    Active,
    /// End date has passed.
    Completed,
}

impl ChallengeStatus {
    /// Persisted string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    /// Apply an event, returning the next status or rejecting the transition.
    pub fn apply(self, event: ChallengeEvent) -> std::result::Result<Self, TransitionError> {
        match (self, event) {
            (Self::Draft, ChallengeEvent::Publish) => Ok(Self::Published),
            (Self::Published, ChallengeEvent::GoLive) => Ok(Self::Active),
            (Self::Active, ChallengeEvent::Close) => Ok(Self::Completed),
            (from, event) => Err(TransitionError::Challenge { from, event }),
        }
    }
}

impl fmt::Display for ChallengeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChallengeStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Events that move a challenge forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChallengeEvent {
    /// Manual authoring promotion out of draft.
    Publish,
    /// Scheduler: start date reached.
    GoLive,
    /// Scheduler: end date passed.
    Close,
}

impl ChallengeEvent {
    /// Event name used in logs and errors.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::GoLive => "go_live",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for ChallengeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Participation status machine
// ============================================================================

/// Lifecycle status of one user's participation in one challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipationStatus {
    /// Joined, no day completed yet.
    Enrolled,
    /// At least one day completed.
    InProgress,
    /// Every day completed.
    Completed,
}

impl ParticipationStatus {
    /// Persisted string form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enrolled => "enrolled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Whether the participation still accepts progress.
    pub const fn is_open(&self) -> bool {
        !matches!(self, Self::Completed)
    }

    /// Apply an event, returning the next status or rejecting the transition.
    pub fn apply(self, event: ParticipationEvent) -> std::result::Result<Self, TransitionError> {
        match (self, event) {
            (Self::Enrolled | Self::InProgress, ParticipationEvent::DayCompleted) => {
                Ok(Self::InProgress)
            }
            (Self::Enrolled | Self::InProgress, ParticipationEvent::Finish) => Ok(Self::Completed),
            (from, event) => Err(TransitionError::Participation { from, event }),
        }
    }
}

impl fmt::Display for ParticipationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticipationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "enrolled" => Ok(Self::Enrolled),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Events that move a participation forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipationEvent {
    /// A new day was added to the completed set.
    DayCompleted,
    /// All days are done.
    Finish,
}

impl ParticipationEvent {
    /// Event name used in logs and errors.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DayCompleted => "day_completed",
            Self::Finish => "finish",
        }
    }
}

impl fmt::Display for ParticipationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Day plan
// ============================================================================

/// One (day, activity) assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlanEntry {
    /// 1-indexed day number.
    pub day_number: i32,
    /// Reference into the activity catalog.
    pub activity_id: String,
}

/// Ordered assignment of activities to day numbers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayPlan {
    days: BTreeMap<i32, String>,
}

impl DayPlan {
    /// Build a plan from entries, rejecting duplicate days and blank activities.
    pub fn from_entries(entries: impl IntoIterator<Item = DayPlanEntry>) -> Result<Self> {
        let mut days = BTreeMap::new();
        for entry in entries {
            if entry.activity_id.trim().is_empty() {
                return Err(Error::Validation(format!(
                    "Day {} has no activity",
                    entry.day_number
                )));
            }
            if days.insert(entry.day_number, entry.activity_id).is_some() {
                return Err(Error::Validation(format!(
                    "Day {} appears more than once in the day plan",
                    entry.day_number
                )));
            }
        }
        Ok(Self { days })
    }

    /// Number of planned days.
    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// Whether no day is planned.
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Activity planned for `day`, if any.
    pub fn activity_for(&self, day: i32) -> Option<&str> {
        self.days.get(&day).map(String::as_str)
    }

    /// Entries sorted by day number.
    pub fn entries(&self) -> Vec<DayPlanEntry> {
        self.days
            .iter()
            .map(|(day, activity)| DayPlanEntry {
                day_number: *day,
                activity_id: activity.clone(),
            })
            .collect()
    }

    /// Every planned day must fall in `1..=duration`.
    pub fn validate_range(&self, duration: i32) -> Result<()> {
        if let Some(day) = self.days.keys().find(|d| **d < 1 || **d > duration) {
            return Err(Error::Validation(format!(
                "Day {} is outside the challenge duration 1..={}",
                day, duration
            )));
        }
        Ok(())
    }

    /// Days in `1..=duration` that have no activity.
    pub fn missing_days(&self, duration: i32) -> Vec<i32> {
        (1..=duration).filter(|d| !self.days.contains_key(d)).collect()
    }

    /// True when the plan covers exactly `1..=duration`.
    pub fn is_complete(&self, duration: i32) -> bool {
        duration > 0
            && self.days.len() == duration as usize
            && self.days.keys().all(|d| (1..=duration).contains(d))
    }

    /// Fail unless the plan covers exactly `1..=duration`.
    pub fn ensure_complete(&self, duration: i32) -> Result<()> {
        self.validate_range(duration)?;
        let missing = self.missing_days(duration);
        if !missing.is_empty() {
            return Err(Error::Validation(format!(
                "Published challenge must have an activity for every day; missing days {:?}",
                missing
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Records
// ============================================================================

/// One challenge: identity, schedule, status and day plan.
#[derive(Debug, Clone)]
pub struct ChallengeRecord {
    /// Stable identifier.
    pub id: String,
    /// Title shown to users.
    pub title: String,
    /// Free-text description.
    pub description: String,
    /// Number of days the challenge spans.
    pub duration: i32,
    pub(crate) status: ChallengeStatus,
    /// First calendar day of the scheduling window.
    pub start_date: NaiveDate,
    /// Last calendar day of the scheduling window.
    pub end_date: NaiveDate,
    /// Cover image URL.
    pub image_url: Option<String>,
    /// Activity per day.
    pub day_plan: DayPlan,
    /// When the challenge was created.
    pub created_at: DateTime<Utc>,
    /// When the challenge was last written.
    pub updated_at: DateTime<Utc>,
    pub(crate) version: i64,
}

impl ChallengeRecord {
    /// Current lifecycle status.
    pub fn status(&self) -> ChallengeStatus {
        self.status
    }

    /// Optimistic concurrency version.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Advance the status machine.
    pub(crate) fn apply(&mut self, event: ChallengeEvent) -> Result<ChallengeStatus> {
        self.status = self.status.apply(event)?;
        Ok(self.status)
    }

    /// Reject non-positive durations and inverted windows.
    pub fn validate_schedule(duration: i32, start_date: NaiveDate, end_date: NaiveDate) -> Result<()> {
        if duration < 1 {
            return Err(Error::Validation(format!(
                "Duration must be positive, got {}",
                duration
            )));
        }
        if end_date < start_date {
            return Err(Error::Validation(format!(
                "End date {} precedes start date {}",
                end_date, start_date
            )));
        }
        Ok(())
    }
}

/// Outcome of recording a day completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayCompletion {
    /// The day was already in the completed set; nothing changed.
    AlreadyRecorded,
    /// The day was added.
    Recorded,
    /// The day was added and every day is now completed.
    Finished,
}

/// Outcome of one advancement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advancement {
    /// Current day not completed yet.
    Waiting,
    /// Pointer moved to the contained day.
    Advanced(i32),
    /// Last day was completed; participation finished.
    Finished,
    /// Participation was already completed.
    Closed,
}

/// One user's progress through one challenge.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipationRecord {
    /// Stable identifier.
    pub id: String,
    /// Participating user.
    pub user_id: String,
    /// Referenced challenge.
    pub challenge_id: String,
    pub(crate) status: ParticipationStatus,
    pub(crate) current_day: i32,
    pub(crate) completed_days: BTreeSet<i32>,
    /// When the user joined.
    pub started_at: DateTime<Utc>,
    pub(crate) completed_at: Option<DateTime<Utc>>,
    pub(crate) version: i64,
}

impl ParticipationRecord {
    /// Fresh enrollment on day 1 with nothing completed.
    pub(crate) fn enroll(user_id: &str, challenge_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            challenge_id: challenge_id.to_string(),
            status: ParticipationStatus::Enrolled,
            current_day: 1,
            completed_days: BTreeSet::new(),
            started_at: now,
            completed_at: None,
            version: 1,
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> ParticipationStatus {
        self.status
    }

    /// Next day the pointer is waiting on.
    pub fn current_day(&self) -> i32 {
        self.current_day
    }

    /// Days marked done, in ascending order.
    pub fn completed_days(&self) -> &BTreeSet<i32> {
        &self.completed_days
    }

    /// When every day was completed.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Optimistic concurrency version.
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Whether `day` is in the completed set.
    pub fn has_completed(&self, day: i32) -> bool {
        self.completed_days.contains(&day)
    }

    /// Number of completed days.
    pub fn progress(&self) -> usize {
        self.completed_days.len()
    }

    /// Whether every day in `1..=duration` is completed.
    fn covers(&self, duration: i32) -> bool {
        duration >= 1 && self.completed_days.range(1..=duration).count() >= duration as usize
    }

    fn finish(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.status = self.status.apply(ParticipationEvent::Finish)?;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Mark `day` as completed.
    ///
    /// Days may be completed in any order; `current_day` is not a gate.
    pub(crate) fn complete_day(
        &mut self,
        day: i32,
        duration: i32,
        now: DateTime<Utc>,
    ) -> Result<DayCompletion> {
        if day < 1 || day > duration {
            return Err(Error::Validation(format!(
                "Invalid day {}: must be between 1 and {}",
                day, duration
            )));
        }
        if !self.completed_days.insert(day) {
            return Ok(DayCompletion::AlreadyRecorded);
        }
        if !self.status.is_open() {
            return Ok(DayCompletion::Recorded);
        }

        self.status = self.status.apply(ParticipationEvent::DayCompleted)?;

        if self.covers(duration) {
            self.finish(now)?;
            return Ok(DayCompletion::Finished);
        }
        Ok(DayCompletion::Recorded)
    }

    /// Move the day pointer forward by at most one day.
    pub(crate) fn advance(&mut self, duration: i32, now: DateTime<Utc>) -> Result<Advancement> {
        if !self.status.is_open() {
            return Ok(Advancement::Closed);
        }
        // The pointer never moves back, even past a shortened duration.
        if self.current_day >= duration {
            if !self.covers(duration) {
                return Ok(Advancement::Waiting);
            }
            self.finish(now)?;
            return Ok(Advancement::Finished);
        }
        if !self.completed_days.contains(&self.current_day) {
            return Ok(Advancement::Waiting);
        }
        self.current_day += 1;
        Ok(Advancement::Advanced(self.current_day))
    }
}
