// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Participation advancement scheduler.
//!
//! Once per pass, every open participation whose current day is completed
//! moves its pointer forward by exactly one day, or finishes when that day
//! was the last one. Users who complete several days at once still unlock
//! them one pass at a time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::model::Advancement;
use crate::participation::{Mutation, modify_participation};
use crate::persistence::{ParticipationKey, Persistence};
use crate::status_scheduler::PassOutcome;

/// Counters for one advancement pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvancementPassReport {
    /// Pointers moved forward.
    pub advanced: u64,
    /// Participations completed.
    pub finished: u64,
    /// Participations whose current day is still open.
    pub waiting: u64,
    /// Participations that failed and were left for the next pass.
    pub failed: u64,
}

/// Day-pointer advancement over all open participations.
///
/// Clones share one pass guard.
#[derive(Clone)]
pub struct ParticipationAdvancer {
    persistence: Arc<dyn Persistence>,
    batch_size: i64,
    running: Arc<Mutex<()>>,
}

impl ParticipationAdvancer {
    /// Create an advancer reading `batch_size` participations per page.
    pub fn new(persistence: Arc<dyn Persistence>, batch_size: i64) -> Self {
        Self {
            persistence,
            batch_size: batch_size.max(1),
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Run one pass, stamping finished participations with `now`.
    pub async fn run_pass(&self, now: DateTime<Utc>) -> Result<PassOutcome<AdvancementPassReport>> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Participation advancement pass already running, skipping");
            return Ok(PassOutcome::Skipped);
        };

        let mut report = AdvancementPassReport::default();
        // Durations are cached for this pass only.
        let mut durations: HashMap<String, i32> = HashMap::new();
        let mut cursor: Option<String> = None;

        loop {
            let keys = self
                .persistence
                .open_participations(cursor.as_deref(), self.batch_size)
                .await?;

            for key in &keys {
                match self.advance_one(key, now, &mut durations).await {
                    Ok(Advancement::Advanced(day)) => {
                        info!(
                            participation_id = %key.id,
                            user_id = %key.user_id,
                            challenge_id = %key.challenge_id,
                            current_day = day,
                            "Participation advanced"
                        );
                        report.advanced += 1;
                    }
                    Ok(Advancement::Finished) => {
                        info!(
                            participation_id = %key.id,
                            user_id = %key.user_id,
                            challenge_id = %key.challenge_id,
                            "Participation completed"
                        );
                        report.finished += 1;
                    }
                    Ok(Advancement::Waiting) => report.waiting += 1,
                    Ok(Advancement::Closed) => {}
                    Err(e) => {
                        error!(
                            participation_id = %key.id,
                            user_id = %key.user_id,
                            challenge_id = %key.challenge_id,
                            error = %e,
                            "Failed to advance participation"
                        );
                        report.failed += 1;
                    }
                }
            }

            if (keys.len() as i64) < self.batch_size {
                break;
            }
            cursor = keys.last().map(|k| k.id.clone());
        }

        Ok(PassOutcome::Completed(report))
    }

    async fn advance_one(
        &self,
        key: &ParticipationKey,
        now: DateTime<Utc>,
        durations: &mut HashMap<String, i32>,
    ) -> Result<Advancement> {
        let duration = match durations.get(&key.challenge_id) {
            Some(duration) => *duration,
            None => {
                let challenge = self
                    .persistence
                    .get_challenge(&key.challenge_id)
                    .await?
                    .ok_or_else(|| Error::ChallengeNotFound(key.challenge_id.clone()))?;
                durations.insert(key.challenge_id.clone(), challenge.duration);
                challenge.duration
            }
        };

        modify_participation(
            self.persistence.as_ref(),
            &key.user_id,
            &key.challenge_id,
            |participation| {
                Ok(match participation.advance(duration, now)? {
                    outcome @ (Advancement::Waiting | Advancement::Closed) => {
                        Mutation::Unchanged(outcome)
                    }
                    outcome => Mutation::Changed(outcome),
                })
            },
        )
        .await
    }
}

/// Participation advancement scheduler configuration.
#[derive(Debug, Clone)]
pub struct ProgressSchedulerConfig {
    /// How often to run a pass
    pub poll_interval: Duration,
    /// Participations fetched per page
    pub batch_size: i64,
}

impl Default for ProgressSchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(86400),
            batch_size: 100,
        }
    }
}

/// Participation advancement scheduler that runs as a background task.
pub struct ParticipationAdvancementScheduler {
    advancer: ParticipationAdvancer,
    config: ProgressSchedulerConfig,
    shutdown: Arc<Notify>,
}

impl ParticipationAdvancementScheduler {
    /// Create a new scheduler.
    pub fn new(persistence: Arc<dyn Persistence>, config: ProgressSchedulerConfig) -> Self {
        Self {
            advancer: ParticipationAdvancer::new(persistence, config.batch_size),
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Advancer sharing this scheduler's pass guard, for forced passes.
    pub fn advancer(&self) -> ParticipationAdvancer {
        self.advancer.clone()
    }

    /// Get a handle to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the scheduler loop.
    pub async fn run(self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            batch_size = self.config.batch_size,
            "Participation advancement scheduler started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("Participation advancement scheduler shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    match self.advancer.run_pass(Utc::now()).await {
                        Ok(PassOutcome::Completed(report)) => {
                            if report.failed > 0 {
                                warn!(failed = report.failed, "Some participations could not be advanced");
                            }
                            info!(
                                advanced = report.advanced,
                                finished = report.finished,
                                waiting = report.waiting,
                                failed = report.failed,
                                "Participation advancement pass finished"
                            );
                        }
                        Ok(PassOutcome::Skipped) => {}
                        Err(e) => error!(error = %e, "Participation advancement pass failed"),
                    }
                }
            }
        }
    }
}
