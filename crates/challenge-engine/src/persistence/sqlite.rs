// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! SQLite-backed persistence implementation.

use std::path::Path;

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use crate::error::{Error, Result};
use crate::model::{ChallengeRecord, ChallengeStatus, ParticipationRecord, ParticipationStatus};

use super::{
    ChallengeDayRow, ChallengeRow, ParticipationKey, ParticipationRow, Persistence,
    completed_days_json, map_delete_error,
};

const CHALLENGE_COLUMNS: &str = "id, title, description, duration, status, start_date, end_date, \
     image_url, version, created_at, updated_at";

const PARTICIPATION_COLUMNS: &str = "id, user_id, challenge_id, status, current_day, \
     completed_days, started_at, completed_at, version";

/// SQLite-backed persistence provider.
#[derive(Clone)]
pub struct SqlitePersistence {
    pool: SqlitePool,
}

impl SqlitePersistence {
    /// Create a new SQLite persistence provider from an existing pool.
    ///
    /// Migrations are not run; see [`crate::migrations::run_sqlite`].
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create and initialize a SQLite persistence from a file path.
    ///
    /// Creates parent directories and the database file when missing, then
    /// runs migrations.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    Error::Other(format!("Failed to create directory {:?}: {}", parent, e))
                })?;
            }
        }

        let url = format!("sqlite:{}?mode=rwc", path.to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        crate::migrations::run_sqlite(&pool).await?;

        Ok(Self { pool })
    }

    /// Underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_days(&self, challenge_id: &str) -> Result<Vec<ChallengeDayRow>> {
        let days = sqlx::query_as::<_, ChallengeDayRow>(
            r#"
            SELECT day_number, activity_id
            FROM challenge_days
            WHERE challenge_id = ?
            ORDER BY day_number
            "#,
        )
        .bind(challenge_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(days)
    }

    async fn hydrate(&self, rows: Vec<ChallengeRow>) -> Result<Vec<ChallengeRecord>> {
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let days = self.load_days(&row.id).await?;
            records.push(row.into_record(days)?);
        }
        Ok(records)
    }
}

#[async_trait::async_trait]
impl Persistence for SqlitePersistence {
    async fn insert_challenge(&self, challenge: &ChallengeRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO challenges (id, title, description, duration, status, start_date,
                                    end_date, image_url, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&challenge.id)
        .bind(&challenge.title)
        .bind(&challenge.description)
        .bind(challenge.duration)
        .bind(challenge.status().as_str())
        .bind(challenge.start_date)
        .bind(challenge.end_date)
        .bind(&challenge.image_url)
        .bind(challenge.version())
        .bind(challenge.created_at)
        .bind(challenge.updated_at)
        .execute(&mut *tx)
        .await?;

        for entry in challenge.day_plan.entries() {
            sqlx::query(
                r#"
                INSERT INTO challenge_days (challenge_id, day_number, activity_id)
                VALUES (?, ?, ?)
                "#,
            )
            .bind(&challenge.id)
            .bind(entry.day_number)
            .bind(&entry.activity_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_challenge(&self, challenge_id: &str) -> Result<Option<ChallengeRecord>> {
        let row = sqlx::query_as::<_, ChallengeRow>(&format!(
            "SELECT {} FROM challenges WHERE id = ?",
            CHALLENGE_COLUMNS
        ))
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let days = self.load_days(&row.id).await?;
                Ok(Some(row.into_record(days)?))
            }
            None => Ok(None),
        }
    }

    async fn list_challenges(
        &self,
        status: Option<ChallengeStatus>,
    ) -> Result<Vec<ChallengeRecord>> {
        let rows = if let Some(status) = status {
            sqlx::query_as::<_, ChallengeRow>(&format!(
                "SELECT {} FROM challenges WHERE status = ? ORDER BY created_at, id",
                CHALLENGE_COLUMNS
            ))
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, ChallengeRow>(&format!(
                "SELECT {} FROM challenges ORDER BY created_at, id",
                CHALLENGE_COLUMNS
            ))
            .fetch_all(&self.pool)
            .await?
        };

        self.hydrate(rows).await
    }

    async fn update_challenge(
        &self,
        challenge: &ChallengeRecord,
        replace_day_plan: bool,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE challenges
            SET title = ?, description = ?, duration = ?, status = ?, start_date = ?,
                end_date = ?, image_url = ?, updated_at = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&challenge.title)
        .bind(&challenge.description)
        .bind(challenge.duration)
        .bind(challenge.status().as_str())
        .bind(challenge.start_date)
        .bind(challenge.end_date)
        .bind(&challenge.image_url)
        .bind(challenge.updated_at)
        .bind(&challenge.id)
        .bind(challenge.version())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if replace_day_plan {
            sqlx::query("DELETE FROM challenge_days WHERE challenge_id = ?")
                .bind(&challenge.id)
                .execute(&mut *tx)
                .await?;

            for entry in challenge.day_plan.entries() {
                sqlx::query(
                    r#"
                    INSERT INTO challenge_days (challenge_id, day_number, activity_id)
                    VALUES (?, ?, ?)
                    "#,
                )
                .bind(&challenge.id)
                .bind(entry.day_number)
                .bind(&entry.activity_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn set_challenge_status(
        &self,
        challenge_id: &str,
        expected_version: i64,
        status: ChallengeStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE challenges
            SET status = ?, updated_at = ?, version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(challenge_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_challenge(&self, challenge_id: &str, expected_version: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM challenges WHERE id = ? AND version = ?")
            .bind(challenge_id)
            .bind(expected_version)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_delete_error(challenge_id, e))?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        // No-op when foreign keys cascaded already.
        sqlx::query("DELETE FROM challenge_days WHERE challenge_id = ?")
            .bind(challenge_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn challenges_due_to_start(
        &self,
        today: NaiveDate,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT id FROM challenges
            WHERE status = 'published' AND start_date <= ? AND id > ?
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(today)
        .bind(after.unwrap_or_default())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn challenges_due_to_close(
        &self,
        today: NaiveDate,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT id FROM challenges
            WHERE status = 'active' AND end_date < ? AND id > ?
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(today)
        .bind(after.unwrap_or_default())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn insert_participation_if_absent(
        &self,
        participation: &ParticipationRecord,
    ) -> Result<ParticipationRecord> {
        sqlx::query(
            r#"
            INSERT INTO participations (id, user_id, challenge_id, status, current_day,
                                        completed_days, started_at, completed_at, version)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (user_id, challenge_id) DO NOTHING
            "#,
        )
        .bind(&participation.id)
        .bind(&participation.user_id)
        .bind(&participation.challenge_id)
        .bind(participation.status().as_str())
        .bind(participation.current_day())
        .bind(completed_days_json(participation))
        .bind(participation.started_at)
        .bind(participation.completed_at())
        .bind(participation.version())
        .execute(&self.pool)
        .await?;

        self.get_participation(&participation.user_id, &participation.challenge_id)
            .await?
            .ok_or_else(|| {
                Error::Other(format!(
                    "Participation for user '{}' in challenge '{}' vanished after insert",
                    participation.user_id, participation.challenge_id
                ))
            })
    }

    async fn get_participation(
        &self,
        user_id: &str,
        challenge_id: &str,
    ) -> Result<Option<ParticipationRecord>> {
        let row = sqlx::query_as::<_, ParticipationRow>(&format!(
            "SELECT {} FROM participations WHERE user_id = ? AND challenge_id = ?",
            PARTICIPATION_COLUMNS
        ))
        .bind(user_id)
        .bind(challenge_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(ParticipationRecord::try_from).transpose()
    }

    async fn list_participations_for_user(
        &self,
        user_id: &str,
        status: Option<ParticipationStatus>,
    ) -> Result<Vec<ParticipationRecord>> {
        let rows = if let Some(status) = status {
            sqlx::query_as::<_, ParticipationRow>(&format!(
                "SELECT {} FROM participations WHERE user_id = ? AND status = ? \
                 ORDER BY started_at, id",
                PARTICIPATION_COLUMNS
            ))
            .bind(user_id)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, ParticipationRow>(&format!(
                "SELECT {} FROM participations WHERE user_id = ? ORDER BY started_at, id",
                PARTICIPATION_COLUMNS
            ))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(ParticipationRecord::try_from).collect()
    }

    async fn count_participations_for_challenge(&self, challenge_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM participations WHERE challenge_id = ?")
                .bind(challenge_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn open_participations(
        &self,
        after: Option<&str>,
        limit: i64,
    ) -> Result<Vec<ParticipationKey>> {
        let keys = sqlx::query_as::<_, ParticipationKey>(
            r#"
            SELECT id, user_id, challenge_id FROM participations
            WHERE status IN ('enrolled', 'in_progress') AND id > ?
            ORDER BY id
            LIMIT ?
            "#,
        )
        .bind(after.unwrap_or_default())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(keys)
    }

    async fn update_participation(&self, participation: &ParticipationRecord) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE participations
            SET status = ?, current_day = ?, completed_days = ?, completed_at = ?,
                version = version + 1
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(participation.status().as_str())
        .bind(participation.current_day())
        .bind(completed_days_json(participation))
        .bind(participation.completed_at())
        .bind(&participation.id)
        .bind(participation.version())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<bool> {
        let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DayPlan, DayPlanEntry};
    use chrono::Duration;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");

        crate::migrations::run_sqlite(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn challenge(id: &str, status: ChallengeStatus, days: &[i32]) -> ChallengeRecord {
        let now = Utc::now();
        ChallengeRecord {
            id: id.to_string(),
            title: format!("Challenge {}", id),
            description: "test".to_string(),
            duration: 3,
            status,
            start_date: date(2025, 3, 1),
            end_date: date(2025, 3, 3),
            image_url: None,
            day_plan: DayPlan::from_entries(days.iter().map(|d| DayPlanEntry {
                day_number: *d,
                activity_id: format!("game-{}", d),
            }))
            .unwrap(),
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_challenge() {
        let persistence = SqlitePersistence::new(test_pool().await);
        persistence
            .insert_challenge(&challenge("c1", ChallengeStatus::Draft, &[2, 1]))
            .await
            .unwrap();

        let loaded = persistence.get_challenge("c1").await.unwrap().unwrap();
        assert_eq!(loaded.status(), ChallengeStatus::Draft);
        assert_eq!(loaded.duration, 3);
        assert_eq!(loaded.start_date, date(2025, 3, 1));
        assert_eq!(loaded.day_plan.activity_for(1), Some("game-1"));
        assert_eq!(loaded.day_plan.activity_for(2), Some("game-2"));
        assert_eq!(loaded.day_plan.len(), 2);
        assert_eq!(loaded.version(), 1);

        assert!(persistence.get_challenge("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_challenges_by_status() {
        let persistence = SqlitePersistence::new(test_pool().await);
        persistence
            .insert_challenge(&challenge("a", ChallengeStatus::Draft, &[]))
            .await
            .unwrap();
        persistence
            .insert_challenge(&challenge("b", ChallengeStatus::Published, &[1, 2, 3]))
            .await
            .unwrap();

        assert_eq!(persistence.list_challenges(None).await.unwrap().len(), 2);
        let published = persistence
            .list_challenges(Some(ChallengeStatus::Published))
            .await
            .unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].id, "b");
        assert_eq!(published[0].day_plan.len(), 3);
    }

    #[tokio::test]
    async fn test_update_challenge_replaces_day_plan_and_checks_version() {
        let persistence = SqlitePersistence::new(test_pool().await);
        persistence
            .insert_challenge(&challenge("c1", ChallengeStatus::Draft, &[1, 2]))
            .await
            .unwrap();

        let mut edited = persistence.get_challenge("c1").await.unwrap().unwrap();
        edited.title = "Renamed".to_string();
        edited.day_plan = DayPlan::from_entries(vec![DayPlanEntry {
            day_number: 3,
            activity_id: "game-x".into(),
        }])
        .unwrap();

        assert!(persistence.update_challenge(&edited, true).await.unwrap());

        let reloaded = persistence.get_challenge("c1").await.unwrap().unwrap();
        assert_eq!(reloaded.title, "Renamed");
        assert_eq!(reloaded.version(), 2);
        assert_eq!(reloaded.day_plan.len(), 1);
        assert_eq!(reloaded.day_plan.activity_for(3), Some("game-x"));

        // `edited` still carries version 1.
        assert!(!persistence.update_challenge(&edited, false).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_challenge_status_is_compare_and_set() {
        let persistence = SqlitePersistence::new(test_pool().await);
        persistence
            .insert_challenge(&challenge("c1", ChallengeStatus::Published, &[1, 2, 3]))
            .await
            .unwrap();

        assert!(
            persistence
                .set_challenge_status("c1", 1, ChallengeStatus::Active)
                .await
                .unwrap()
        );
        assert!(
            !persistence
                .set_challenge_status("c1", 1, ChallengeStatus::Completed)
                .await
                .unwrap()
        );

        let loaded = persistence.get_challenge("c1").await.unwrap().unwrap();
        assert_eq!(loaded.status(), ChallengeStatus::Active);
        assert_eq!(loaded.version(), 2);
    }

    #[tokio::test]
    async fn test_due_queries_respect_dates_and_cursor() {
        let persistence = SqlitePersistence::new(test_pool().await);
        for id in ["a", "b", "c"] {
            persistence
                .insert_challenge(&challenge(id, ChallengeStatus::Published, &[1, 2, 3]))
                .await
                .unwrap();
        }
        let mut active = challenge("d", ChallengeStatus::Active, &[1, 2, 3]);
        active.end_date = date(2025, 3, 3);
        persistence.insert_challenge(&active).await.unwrap();

        let before_start = persistence
            .challenges_due_to_start(date(2025, 2, 28), None, 10)
            .await
            .unwrap();
        assert!(before_start.is_empty());

        let first_page = persistence
            .challenges_due_to_start(date(2025, 3, 1), None, 2)
            .await
            .unwrap();
        assert_eq!(first_page, vec!["a".to_string(), "b".to_string()]);
        let second_page = persistence
            .challenges_due_to_start(date(2025, 3, 1), Some("b"), 2)
            .await
            .unwrap();
        assert_eq!(second_page, vec!["c".to_string()]);

        // end_date itself is still inside the window
        assert!(
            persistence
                .challenges_due_to_close(date(2025, 3, 3), None, 10)
                .await
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            persistence
                .challenges_due_to_close(date(2025, 3, 4), None, 10)
                .await
                .unwrap(),
            vec!["d".to_string()]
        );
    }

    #[tokio::test]
    async fn test_delete_challenge() {
        let persistence = SqlitePersistence::new(test_pool().await);
        persistence
            .insert_challenge(&challenge("c1", ChallengeStatus::Draft, &[1]))
            .await
            .unwrap();

        assert!(!persistence.delete_challenge("c1", 7).await.unwrap());
        assert!(persistence.delete_challenge("c1", 1).await.unwrap());
        assert!(persistence.get_challenge("c1").await.unwrap().is_none());

        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM challenge_days")
            .fetch_one(persistence.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[tokio::test]
    async fn test_delete_challenge_with_participation_is_state_error() {
        let persistence = SqlitePersistence::new(test_pool().await);
        persistence
            .insert_challenge(&challenge("c1", ChallengeStatus::Draft, &[1]))
            .await
            .unwrap();
        persistence
            .insert_participation_if_absent(&ParticipationRecord::enroll("u1", "c1", Utc::now()))
            .await
            .unwrap();

        let err = persistence.delete_challenge("c1", 1).await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)), "got {:?}", err);
        assert!(persistence.get_challenge("c1").await.unwrap().is_some());
        assert_eq!(persistence.count_participations_for_challenge("c1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_participation_if_absent_keeps_first() {
        let persistence = SqlitePersistence::new(test_pool().await);
        persistence
            .insert_challenge(&challenge("c1", ChallengeStatus::Active, &[1, 2, 3]))
            .await
            .unwrap();

        let first = ParticipationRecord::enroll("u1", "c1", Utc::now());
        let stored = persistence
            .insert_participation_if_absent(&first)
            .await
            .unwrap();
        assert_eq!(stored.id, first.id);

        let second = ParticipationRecord::enroll("u1", "c1", Utc::now() + Duration::hours(1));
        let stored_again = persistence
            .insert_participation_if_absent(&second)
            .await
            .unwrap();
        assert_eq!(stored_again.id, first.id);
        assert_eq!(
            persistence
                .count_participations_for_challenge("c1")
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_update_participation_version_check() {
        let persistence = SqlitePersistence::new(test_pool().await);
        persistence
            .insert_challenge(&challenge("c1", ChallengeStatus::Active, &[1, 2, 3]))
            .await
            .unwrap();
        let mut record = persistence
            .insert_participation_if_absent(&ParticipationRecord::enroll("u1", "c1", Utc::now()))
            .await
            .unwrap();

        record.complete_day(2, 3, Utc::now()).unwrap();
        assert!(persistence.update_participation(&record).await.unwrap());
        // Same stale version must be rejected.
        assert!(!persistence.update_participation(&record).await.unwrap());

        let loaded = persistence
            .get_participation("u1", "c1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.status(), ParticipationStatus::InProgress);
        assert!(loaded.has_completed(2));
        assert_eq!(loaded.version(), 2);
    }

    #[tokio::test]
    async fn test_open_participations_excludes_completed() {
        let persistence = SqlitePersistence::new(test_pool().await);
        persistence
            .insert_challenge(&challenge("c1", ChallengeStatus::Active, &[1, 2, 3]))
            .await
            .unwrap();

        for user in ["u1", "u2"] {
            persistence
                .insert_participation_if_absent(&ParticipationRecord::enroll(
                    user,
                    "c1",
                    Utc::now(),
                ))
                .await
                .unwrap();
        }
        sqlx::query("UPDATE participations SET status = 'completed' WHERE user_id = 'u2'")
            .execute(persistence.pool())
            .await
            .unwrap();

        let keys = persistence.open_participations(None, 10).await.unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].user_id, "u1");

        let history = persistence
            .list_participations_for_user("u2", None)
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status(), ParticipationStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_status_is_corrupt_record() {
        let persistence = SqlitePersistence::new(test_pool().await);
        persistence
            .insert_challenge(&challenge("c1", ChallengeStatus::Active, &[1, 2, 3]))
            .await
            .unwrap();
        persistence
            .insert_participation_if_absent(&ParticipationRecord::enroll("u1", "c1", Utc::now()))
            .await
            .unwrap();
        sqlx::query("UPDATE participations SET status = 'joined'")
            .execute(persistence.pool())
            .await
            .unwrap();

        let result = persistence.get_participation("u1", "c1").await;
        assert!(matches!(result, Err(Error::CorruptRecord(_))));
    }

    #[tokio::test]
    async fn test_health_check_db() {
        let persistence = SqlitePersistence::new(test_pool().await);
        assert!(persistence.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_from_path_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("challenges.db");

        let persistence = SqlitePersistence::from_path(&path).await.unwrap();
        assert!(path.exists());
        assert!(persistence.health_check().await.unwrap());
    }
}
