// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Challenge status scheduler.
//!
//! Periodically moves challenges along the calendar:
//! - `published` with `start_date <= today` goes `active`
//! - `active` with `end_date < today` goes `completed`
//!
//! Going live runs first, so a challenge whose whole window already passed
//! reaches `completed` in a single pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::model::{ChallengeEvent, ChallengeStatus};
use crate::persistence::Persistence;

/// Outcome of a scheduler pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome<R> {
    /// Another pass held the guard; nothing was examined.
    Skipped,
    /// The pass ran to the end.
    Completed(R),
}

impl<R> PassOutcome<R> {
    /// Whether the pass was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }

    /// Report of a completed pass.
    pub fn report(&self) -> Option<&R> {
        match self {
            Self::Skipped => None,
            Self::Completed(report) => Some(report),
        }
    }
}

/// Counters for one status pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusPassReport {
    /// Challenges moved to `active`.
    pub activated: u64,
    /// Challenges moved to `completed`.
    pub completed: u64,
    /// Challenges that failed and were left for the next pass.
    pub failed: u64,
}

impl StatusPassReport {
    /// Whether the pass changed or failed on nothing.
    pub fn is_idle(&self) -> bool {
        self.activated == 0 && self.completed == 0 && self.failed == 0
    }
}

/// Calendar-driven challenge transitions.
///
/// Clones share one pass guard, so a forced pass and the periodic pass never
/// overlap.
#[derive(Clone)]
pub struct ChallengeStatusUpdater {
    persistence: Arc<dyn Persistence>,
    batch_size: i64,
    running: Arc<Mutex<()>>,
}

impl ChallengeStatusUpdater {
    /// Create an updater reading `batch_size` ids per page.
    pub fn new(persistence: Arc<dyn Persistence>, batch_size: i64) -> Self {
        Self {
            persistence,
            batch_size: batch_size.max(1),
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Run one pass for calendar day `today`.
    ///
    /// Failures on single challenges are logged and counted. Only a failure to
    /// page through candidates aborts the pass.
    pub async fn run_pass(&self, today: NaiveDate) -> Result<PassOutcome<StatusPassReport>> {
        let Ok(_guard) = self.running.try_lock() else {
            debug!("Challenge status pass already running, skipping");
            return Ok(PassOutcome::Skipped);
        };

        let mut report = StatusPassReport::default();
        self.sweep(today, ChallengeEvent::GoLive, &mut report)
            .await?;
        self.sweep(today, ChallengeEvent::Close, &mut report).await?;

        Ok(PassOutcome::Completed(report))
    }

    async fn sweep(
        &self,
        today: NaiveDate,
        event: ChallengeEvent,
        report: &mut StatusPassReport,
    ) -> Result<()> {
        let mut cursor: Option<String> = None;

        loop {
            let ids = match event {
                ChallengeEvent::GoLive => {
                    self.persistence
                        .challenges_due_to_start(today, cursor.as_deref(), self.batch_size)
                        .await?
                }
                _ => {
                    self.persistence
                        .challenges_due_to_close(today, cursor.as_deref(), self.batch_size)
                        .await?
                }
            };

            for id in &ids {
                match self.transition(id, today, event).await {
                    Ok(true) if event == ChallengeEvent::GoLive => report.activated += 1,
                    Ok(true) => report.completed += 1,
                    Ok(false) => {}
                    Err(e) => {
                        error!(challenge_id = %id, event = %event, error = %e, "Failed to update challenge status");
                        report.failed += 1;
                    }
                }
            }

            if (ids.len() as i64) < self.batch_size {
                return Ok(());
            }
            cursor = ids.last().cloned();
        }
    }

    /// Returns false when the challenge is no longer due or was changed
    /// concurrently.
    async fn transition(&self, challenge_id: &str, today: NaiveDate, event: ChallengeEvent) -> Result<bool> {
        let Some(challenge) = self.persistence.get_challenge(challenge_id).await? else {
            return Ok(false);
        };

        let due = match event {
            ChallengeEvent::GoLive => {
                challenge.status() == ChallengeStatus::Published && challenge.start_date <= today
            }
            ChallengeEvent::Close => {
                challenge.status() == ChallengeStatus::Active && challenge.end_date < today
            }
            ChallengeEvent::Publish => false,
        };
        if !due {
            return Ok(false);
        }

        let from = challenge.status();
        let to = from.apply(event)?;

        if !self
            .persistence
            .set_challenge_status(challenge_id, challenge.version(), to)
            .await?
        {
            debug!(challenge_id, "Challenge changed during status pass, leaving for next pass");
            return Ok(false);
        }

        info!(
            challenge_id,
            from = %from,
            to = %to,
            start_date = %challenge.start_date,
            end_date = %challenge.end_date,
            "Challenge status updated"
        );
        Ok(true)
    }
}

/// Challenge status scheduler configuration.
#[derive(Debug, Clone)]
pub struct StatusSchedulerConfig {
    /// How often to run a pass
    pub poll_interval: Duration,
    /// Ids fetched per page
    pub batch_size: i64,
}

impl Default for StatusSchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3600),
            batch_size: 100,
        }
    }
}

/// Challenge status scheduler that runs as a background task.
pub struct ChallengeStatusScheduler {
    updater: ChallengeStatusUpdater,
    config: StatusSchedulerConfig,
    shutdown: Arc<Notify>,
}

impl ChallengeStatusScheduler {
    /// Create a new scheduler.
    pub fn new(persistence: Arc<dyn Persistence>, config: StatusSchedulerConfig) -> Self {
        Self {
            updater: ChallengeStatusUpdater::new(persistence, config.batch_size),
            config,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Updater sharing this scheduler's pass guard, for forced passes.
    pub fn updater(&self) -> ChallengeStatusUpdater {
        self.updater.clone()
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
            "Challenge status scheduler started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    info!("Challenge status scheduler shutting down");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {
                    let today = Utc::now().date_naive();
                    match self.updater.run_pass(today).await {
                        Ok(PassOutcome::Completed(report)) if report.is_idle() => {
                            debug!(%today, "No challenge status changes due");
                        }
                        Ok(PassOutcome::Completed(report)) => {
                            info!(
                                %today,
                                activated = report.activated,
                                completed = report.completed,
                                failed = report.failed,
                                "Challenge status pass finished"
                            );
                        }
                        Ok(PassOutcome::Skipped) => {}
                        Err(e) => error!(error = %e, "Challenge status pass failed"),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StatusSchedulerConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(3600));
        assert_eq!(config.batch_size, 100);
    }

    #[test]
    fn test_pass_outcome_accessors() {
        let skipped: PassOutcome<StatusPassReport> = PassOutcome::Skipped;
        assert!(skipped.is_skipped());
        assert!(skipped.report().is_none());

        let done = PassOutcome::Completed(StatusPassReport {
            activated: 2,
            ..Default::default()
        });
        assert!(!done.is_skipped());
        assert_eq!(done.report().map(|r| r.activated), Some(2));
        assert!(!done.report().unwrap().is_idle());
    }
}
