// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence interfaces and backends for challenge-engine.
//!
//! Every write is version-checked: update methods return `false` when the
//! stored version no longer matches the record's, and callers re-read and
//! retry. This keeps a user's `complete_day` and a scheduler pass over the
//! same participation from overwriting each other.

pub mod postgres;
pub mod sqlite;

pub use self::postgres::PostgresPersistence;
pub use self::sqlite::SqlitePersistence;

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use tracing::info;

use crate::config::ConfigError;
use crate::error::{Error, Result};
use crate::model::{
    ChallengeRecord, ChallengeStatus, DayPlan, DayPlanEntry, ParticipationRecord,
    ParticipationStatus,
};

/// Challenge row as stored (day plan lives in `challenge_days`).
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ChallengeRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub duration: i32,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub image_url: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Day plan row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ChallengeDayRow {
    pub day_number: i32,
    pub activity_id: String,
}

/// Participation row as stored.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct ParticipationRow {
    pub id: String,
    pub user_id: String,
    pub challenge_id: String,
    pub status: String,
    pub current_day: i32,
    pub completed_days: Json<Vec<i32>>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl ChallengeRow {
    pub(crate) fn into_record(self, days: Vec<ChallengeDayRow>) -> Result<ChallengeRecord> {
        let status = self
            .status
            .parse::<ChallengeStatus>()
            .map_err(|e| Error::CorruptRecord(format!("challenge '{}': {}", self.id, e)))?;
        let day_plan = DayPlan::from_entries(days.into_iter().map(|d| DayPlanEntry {
            day_number: d.day_number,
            activity_id: d.activity_id,
        }))
        .map_err(|e| Error::CorruptRecord(format!("challenge '{}': {}", self.id, e)))?;

        Ok(ChallengeRecord {
            id: self.id,
            title: self.title,
            description: self.description,
            duration: self.duration,
            status,
            start_date: self.start_date,
            end_date: self.end_date,
            image_url: self.image_url,
            day_plan,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

impl TryFrom<ParticipationRow> for ParticipationRecord {
    type Error = Error;

    fn try_from(row: ParticipationRow) -> Result<Self> {
        let status = row
            .status
            .parse::<ParticipationStatus>()
            .map_err(|e| Error::CorruptRecord(format!("participation '{}': {}", row.id, e)))?;
        let completed_days: BTreeSet<i32> = row.completed_days.0.into_iter().collect();

        Ok(ParticipationRecord {
            id: row.id,
            user_id: row.user_id,
            challenge_id: row.challenge_id,
            status,
            current_day: row.current_day,
            completed_days,
            started_at: row.started_at,
            completed_at: row.completed_at,
            version: row.version,
        })
    }
}

/// Map a foreign-key violation raised while deleting a challenge to
/// [`Error::InvalidState`]. A participation inserted after the caller's
/// emptiness check still blocks the delete.
pub(crate) fn map_delete_error(challenge_id: &str, err: sqlx::Error) -> Error {
    match err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => Error::InvalidState(format!(
            "Challenge '{}' has participations and cannot be deleted",
            challenge_id
        )),
        other => Error::Database(other),
    }
}

/// Stored form of a participation's completed days.
pub(crate) fn completed_days_json(record: &ParticipationRecord) -> Json<Vec<i32>> {
    Json(record.completed_days().iter().copied().collect())
}

/// Lightweight reference to an open participation, used by paged scans.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ParticipationKey {
    /// Participation id (scan cursor).
    pub id: String,
    /// Participating user.
    pub user_id: String,
    /// Referenced challenge.
    pub challenge_id: String,
}

/// Persistence interface shared by the engines and schedulers.
#[allow(missing_docs)]
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn insert_challenge(&self, challenge: &ChallengeRecord) -> Result<()>;

    async fn get_challenge(&self, challenge_id: &str) -> Result<Option<ChallengeRecord>>;

    async fn list_challenges(&self, status: Option<ChallengeStatus>)
    -> Result<Vec<ChallengeRecord>>;

    /// Write every field of `challenge` if the stored version equals
    /// `challenge.version()`. When `replace_day_plan` is set, stored day rows
    /// are discarded and replaced in the same transaction.
    ///
    /// Returns true if the write was applied.
    async fn update_challenge(
        &self,
        challenge: &ChallengeRecord,
        replace_day_plan: bool,
    ) -> Result<bool>;

    /// Compare-and-set on status and version only.
    async fn set_challenge_status(
        &self,
        challenge_id: &str,
        expected_version: i64,
        status: ChallengeStatus,
    ) -> Result<bool>;

    /// Delete a challenge and its day plan if the version still matches.
    async fn delete_challenge(&self, challenge_id: &str, expected_version: i64) -> Result<bool>;

    /// Ids of published challenges with `start_date <= today`, ordered by id,
    /// strictly after `after`.
    async fn challenges_due_to_start(
        &self,
        today: NaiveDate,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<String>>;

    /// Ids of active challenges with `end_date < today`, ordered by id,
    /// strictly after `after`.
    async fn challenges_due_to_close(
        &self,
        today: NaiveDate,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<String>>;

    /// Insert `participation` unless the (user, challenge) pair already exists,
    /// then return whichever record is stored for the pair.
    async fn insert_participation_if_absent(
        &self,
        participation: &ParticipationRecord,
    ) -> Result<ParticipationRecord>;

    async fn get_participation(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<Option<ParticipationRecord>>;

    async fn list_participations_for_user(
        &self,
        user_id: &str,
        status: Option<ParticipationStatus>,
    ) -> Result<Vec<ParticipationRecord>>;

    async fn count_participations_for_challenge(&self, challenge_id: &str) -> Result<i64>;

    /// Keys of enrolled or in-progress participations, ordered by id,
    /// strictly after `after`.
    async fn open_participations(
        &self,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ParticipationKey>>;

    /// Write progress fields if the stored version equals
    /// `participation.version()`. Returns true if the write was applied.
    async fn update_participation(&self, participation: &ParticipationRecord) -> Result<bool>;

    async fn health_check(&self) -> Result<bool>;
}

/// Connect to `database_url`, run migrations and return the matching backend.
///
/// `sqlite:` URLs use [`SqlitePersistence`]; `postgres:`/`postgresql:` URLs use
/// [`PostgresPersistence`].
pub async fn connect(database_url: &str, max_connections: u32) -> Result<Arc<dyn Persistence>> {
    if database_url.starts_with("sqlite:") {
        // Every connection to an in-memory database gets its own empty schema.
        let max_connections = if database_url.contains(":memory:") {
            1
        } else {
            max_connections
        };
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        crate::migrations::run_sqlite(&pool).await?;
        info!(backend = "sqlite", "Database ready");
        Ok(Arc::new(SqlitePersistence::new(pool)))
    } else if database_url.starts_with("postgres:") || database_url.starts_with("postgresql:") {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        crate::migrations::run_postgres(&pool).await?;
        info!(backend = "postgres", "Database ready");
        Ok(Arc::new(PostgresPersistence::new(pool)))
    } else {
        Err(ConfigError::Invalid(
            "CHALLENGE_DATABASE_URL",
            "expected a sqlite: or postgres: URL",
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_sqlite_memory() {
        let persistence = connect("sqlite::memory:", 10).await.unwrap();
        assert!(persistence.health_check().await.unwrap());
        assert!(persistence.list_challenges(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connect_rejects_unknown_scheme() {
        let err = match connect("mysql://localhost/challenges", 1).await {
            Ok(_) => panic!("mysql URL must be rejected"),
            Err(e) => e,
        };
        assert!(matches!(
            err,
            Error::Config(ConfigError::Invalid("CHALLENGE_DATABASE_URL", _))
        ));
    }
}
