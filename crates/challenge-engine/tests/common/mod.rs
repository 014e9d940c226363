// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for challenge-engine integration tests.
//!
//! Provides TestContext wiring an in-memory SQLite store to the engines and
//! mock collaborators.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use sqlx::sqlite::SqlitePoolOptions;

use challenge_engine::collaborators::mock::{
    MockActivityCatalog, MockIdentityProvider, MockObjectStorage, MockUserDirectory,
};
use challenge_engine::handlers::ChallengeHandlerState;
use challenge_engine::lifecycle::{ChallengeLifecycleManager, NewChallenge};
use challenge_engine::model::{ChallengeRecord, ChallengeStatus, DayPlanEntry};
use challenge_engine::participation::ParticipationEngine;
use challenge_engine::persistence::{Persistence, SqlitePersistence};
use challenge_engine::progress_scheduler::ParticipationAdvancer;
use challenge_engine::status_scheduler::ChallengeStatusUpdater;

pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";
pub const ALICE_TOKEN: &str = "alice-token";
pub const BOB_TOKEN: &str = "bob-token";
pub const ADMIN_TOKEN: &str = "admin-token";

/// Test context with an in-memory database, engines and mocks.
pub struct TestContext {
    pub sqlite: SqlitePersistence,
    pub persistence: Arc<dyn Persistence>,
    pub lifecycle: ChallengeLifecycleManager,
    pub engine: ParticipationEngine,
    pub users: Arc<MockUserDirectory>,
    pub storage: MockObjectStorage,
    pub status_updater: ChallengeStatusUpdater,
    pub advancer: ParticipationAdvancer,
    pub state: ChallengeHandlerState,
}

impl TestContext {
    /// Context with the default catalog (`game-1` ..= `game-10`).
    pub async fn new() -> Self {
        Self::build(default_catalog(), MockObjectStorage::new(), 100).await
    }

    /// Context with a custom activity catalog.
    pub async fn with_catalog(catalog: MockActivityCatalog) -> Self {
        Self::build(catalog, MockObjectStorage::new(), 100).await
    }

    /// Context with custom object storage.
    pub async fn with_storage(storage: MockObjectStorage) -> Self {
        Self::build(default_catalog(), storage, 100).await
    }

    /// Context whose schedulers page with `batch_size`.
    pub async fn with_batch_size(batch_size: i64) -> Self {
        Self::build(default_catalog(), MockObjectStorage::new(), batch_size).await
    }

    async fn build(catalog: MockActivityCatalog, storage: MockObjectStorage, batch_size: i64) -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory SQLite pool");
        challenge_engine::migrations::run_sqlite(&pool)
            .await
            .expect("Failed to run migrations");

        let sqlite = SqlitePersistence::new(pool);
        let persistence: Arc<dyn Persistence> = Arc::new(sqlite.clone());

        let users = Arc::new(MockUserDirectory::with_users([ALICE, BOB, "root"]));
        let catalog = Arc::new(catalog);
        let identity = Arc::new(
            MockIdentityProvider::new()
                .with_user(ALICE_TOKEN, ALICE)
                .with_user(BOB_TOKEN, BOB)
                .with_admin(ADMIN_TOKEN, "root"),
        );

        let lifecycle =
            ChallengeLifecycleManager::new(persistence.clone(), Arc::new(storage.clone()));
        let engine = ParticipationEngine::new(persistence.clone(), users.clone(), catalog.clone());
        let status_updater = ChallengeStatusUpdater::new(persistence.clone(), batch_size);
        let advancer = ParticipationAdvancer::new(persistence.clone(), batch_size);

        let state = ChallengeHandlerState::new(
            persistence.clone(),
            identity,
            users.clone(),
            catalog,
            Arc::new(storage.clone()),
        )
        .with_schedulers(status_updater.clone(), advancer.clone());

        Self {
            sqlite,
            persistence,
            lifecycle,
            engine,
            users,
            storage,
            status_updater,
            advancer,
            state,
        }
    }

    /// Create a published challenge with a complete day plan.
    pub async fn published(&self, duration: i32, start: NaiveDate, end: NaiveDate) -> ChallengeRecord {
        let mut request = new_challenge(duration, start, end);
        request.day_plan = Some(plan(duration));
        request.status = Some(ChallengeStatus::Published);
        self.lifecycle
            .create(request)
            .await
            .expect("Failed to create published challenge")
    }

    /// Create a challenge that is active on `today`.
    pub async fn active(&self, duration: i32, today: NaiveDate) -> ChallengeRecord {
        let end = today + chrono::Duration::days(duration as i64);
        let challenge = self.published(duration, today, end).await;
        self.status_updater
            .run_pass(today)
            .await
            .expect("Status pass failed");
        let challenge = self.lifecycle.get_by_id(&challenge.id).await.unwrap();
        assert_eq!(challenge.status(), ChallengeStatus::Active);
        challenge
    }
}

fn default_catalog() -> MockActivityCatalog {
    (1..=10).fold(MockActivityCatalog::new(), |catalog, n| {
        catalog.with_activity(&format!("game-{}", n), &format!("Game {}", n))
    })
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

/// Day plan assigning `game-N` to day N for every day.
pub fn plan(duration: i32) -> Vec<DayPlanEntry> {
    (1..=duration)
        .map(|day| DayPlanEntry {
            day_number: day,
            activity_id: format!("game-{}", day),
        })
        .collect()
}

/// Draft request without a day plan.
pub fn new_challenge(duration: i32, start: NaiveDate, end: NaiveDate) -> NewChallenge {
    NewChallenge {
        title: "Mindful March".to_string(),
        description: "One puzzle a day".to_string(),
        duration,
        start_date: start,
        end_date: end,
        day_plan: None,
        image_url: None,
        status: None,
    }
}
