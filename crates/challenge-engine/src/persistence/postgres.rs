// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! PostgreSQL-backed persistence implementation.

use chrono::NaiveDate;
use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::model::{ChallengeRecord, ChallengeStatus, ParticipationRecord, ParticipationStatus};

use super::{
    ChallengeDayRow, ChallengeRow, ParticipationKey, ParticipationRow, Persistence,
    completed_days_json, map_delete_error,
};

/// PostgreSQL-backed persistence provider.
#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    /// Create a new Postgres persistence provider.
    ///
    /// Migrations are not run; see [`crate::migrations::run_postgres`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_days(&self, challenge_id: &str) -> Result<Vec<ChallengeDayRow>> {
        let days = sqlx::query_as::<_, ChallengeDayRow>(
            r#"
            SELECT day_number, activity_id
            FROM challenge_days
            WHERE challenge_id = $1
            ORDER BY day_number
            "#,
        )
        .bind(challenge_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(days)
    }

    async fn insert_days(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        challenge: &ChallengeRecord,
    ) -> Result<()> {
        for entry in challenge.day_plan.entries() {
            sqlx::query(
                r#"
                INSERT INTO challenge_days (challenge_id, day_number, activity_id)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&challenge.id)
            .bind(entry.day_number)
            .bind(&entry.activity_id)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Persistence for PostgresPersistence {
    async fn insert_challenge(&self, challenge: &ChallengeRecord) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO challenges (id, title, description, duration, status, start_date,
                                    end_date, image_url, version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
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

        Self::insert_days(&mut tx, challenge).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_challenge(&self, challenge_id: &str) -> Result<Option<ChallengeRecord>> {
        let row = sqlx::query_as::<_, ChallengeRow>(
            r#"
            SELECT id, title, description, duration, status, start_date, end_date,
                   image_url, version, created_at, updated_at
            FROM challenges
            WHERE id = $1
            "#,
        )
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
        let rows = sqlx::query_as::<_, ChallengeRow>(
            r#"
            SELECT id, title, description, duration, status, start_date, end_date,
                   image_url, version, created_at, updated_at
            FROM challenges
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at, id
            "#,
        )
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let days = self.load_days(&row.id).await?;
            records.push(row.into_record(days)?);
        }
        Ok(records)
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
            SET title = $1, description = $2, duration = $3, status = $4, start_date = $5,
                end_date = $6, image_url = $7, updated_at = $8, version = version + 1
            WHERE id = $9 AND version = $10
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
            sqlx::query("DELETE FROM challenge_days WHERE challenge_id = $1")
                .bind(&challenge.id)
                .execute(&mut *tx)
                .await?;
            Self::insert_days(&mut tx, challenge).await?;
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
            SET status = $1, updated_at = NOW(), version = version + 1
            WHERE id = $2 AND version = $3
            "#,
        )
        .bind(status.as_str())
        .bind(challenge_id)
        .bind(expected_version)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_challenge(&self, challenge_id: &str, expected_version: i64) -> Result<bool> {
        // challenge_days cascades
        let result = sqlx::query("DELETE FROM challenges WHERE id = $1 AND version = $2")
            .bind(challenge_id)
            .bind(expected_version)
            .execute(&self.pool)
            .await
            .map_err(|e| map_delete_error(challenge_id, e))?;

        Ok(result.rows_affected() > 0)
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
            WHERE status = 'published' AND start_date <= $1 AND id > $2
            ORDER BY id
            LIMIT $3
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
            WHERE status = 'active' AND end_date < $1 AND id > $2
            ORDER BY id
            LIMIT $3
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
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
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
        let row = sqlx::query_as::<_, ParticipationRow>(
            r#"
            SELECT id, user_id, challenge_id, status, current_day, completed_days,
                   started_at, completed_at, version
            FROM participations
            WHERE user_id = $1 AND challenge_id = $2
            "#,
        )
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
        let rows = sqlx::query_as::<_, ParticipationRow>(
            r#"
            SELECT id, user_id, challenge_id, status, current_day, completed_days,
                   started_at, completed_at, version
            FROM participations
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY started_at, id
            "#,
        )
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(ParticipationRecord::try_from).collect()
    }

    async fn count_participations_for_challenge(&self, challenge_id: &str) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM participations WHERE challenge_id = $1")
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
            WHERE status IN ('enrolled', 'in_progress') AND id > $1
            ORDER BY id
            LIMIT $2
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
            SET status = $1, current_day = $2, completed_days = $3, completed_at = $4,
                version = version + 1
            WHERE id = $5 AND version = $6
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
        let row: (i32,) = sqlx::query_as("SELECT 1").fetch_one(&self.pool).await?;
        Ok(row.0 == 1)
    }
}
