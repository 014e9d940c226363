// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Embeddable runtime for challenge-engine.
//!
//! [`ChallengeRuntime`] spawns both schedulers inside an existing tokio
//! application and hands out the updater/advancer used for forced passes.
//!
//! ```rust,ignore
//! use challenge_engine::{persistence, runtime::ChallengeRuntime};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let persistence = persistence::connect("sqlite:challenges.db?mode=rwc", 5).await?;
//!
//!     let runtime = ChallengeRuntime::builder()
//!         .persistence(persistence)
//!         .status_poll_interval(std::time::Duration::from_secs(3600))
//!         .build()?
//!         .start()
//!         .await?;
//!
//!     // ... serve requests ...
//!
//!     runtime.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::Config;
use crate::persistence::Persistence;
use crate::progress_scheduler::{
    ParticipationAdvancementScheduler, ParticipationAdvancer, ProgressSchedulerConfig,
};
use crate::status_scheduler::{
    ChallengeStatusScheduler, ChallengeStatusUpdater, StatusSchedulerConfig,
};

/// Builder for creating a [`ChallengeRuntime`].
pub struct ChallengeRuntimeBuilder {
    persistence: Option<Arc<dyn Persistence>>,
    status_poll_interval: Duration,
    progress_poll_interval: Duration,
    batch_size: i64,
}

impl Default for ChallengeRuntimeBuilder {
    fn default() -> Self {
        Self {
            persistence: None,
            status_poll_interval: Duration::from_secs(3600), // hourly
            progress_poll_interval: Duration::from_secs(86400), // daily
            batch_size: 100,
        }
    }
}

impl ChallengeRuntimeBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the persistence backend (required).
    pub fn persistence(mut self, persistence: Arc<dyn Persistence>) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Take intervals and batch size from a loaded [`Config`].
    pub fn config(self, config: &Config) -> Self {
        self.status_poll_interval(config.status_poll_interval)
            .progress_poll_interval(config.progress_poll_interval)
            .batch_size(config.batch_size)
    }

    /// Set how often challenge statuses are re-evaluated.
    pub fn status_poll_interval(mut self, interval: Duration) -> Self {
        self.status_poll_interval = interval;
        self
    }

    /// Set how often participations are advanced.
    pub fn progress_poll_interval(mut self, interval: Duration) -> Self {
        self.progress_poll_interval = interval;
        self
    }

    /// Set the page size both schedulers read with.
    pub fn batch_size(mut self, size: i64) -> Self {
        self.batch_size = size;
        self
    }

    /// Build the runtime configuration.
    pub fn build(self) -> Result<ChallengeRuntimeConfig> {
        let persistence = self
            .persistence
            .ok_or_else(|| anyhow::anyhow!("persistence is required"))?;
        if self.batch_size < 1 {
            anyhow::bail!("batch_size must be positive, got {}", self.batch_size);
        }

        Ok(ChallengeRuntimeConfig {
            persistence,
            status_poll_interval: self.status_poll_interval,
            progress_poll_interval: self.progress_poll_interval,
            batch_size: self.batch_size,
        })
    }
}

/// Configuration for a [`ChallengeRuntime`].
pub struct ChallengeRuntimeConfig {
    persistence: Arc<dyn Persistence>,
    status_poll_interval: Duration,
    progress_poll_interval: Duration,
    batch_size: i64,
}

impl ChallengeRuntimeConfig {
    /// Start the runtime, spawning both scheduler tasks.
    pub async fn start(self) -> Result<ChallengeRuntime> {
        let status_scheduler = ChallengeStatusScheduler::new(
            self.persistence.clone(),
            StatusSchedulerConfig {
                poll_interval: self.status_poll_interval,
                batch_size: self.batch_size,
            },
        );
        let progress_scheduler = ParticipationAdvancementScheduler::new(
            self.persistence.clone(),
            ProgressSchedulerConfig {
                poll_interval: self.progress_poll_interval,
                batch_size: self.batch_size,
            },
        );

        let status_updater = status_scheduler.updater();
        let advancer = progress_scheduler.advancer();
        let status_shutdown = status_scheduler.shutdown_handle();
        let progress_shutdown = progress_scheduler.shutdown_handle();

        let status_handle = tokio::spawn(status_scheduler.run());
        let progress_handle = tokio::spawn(progress_scheduler.run());

        info!(
            status_poll_interval_secs = self.status_poll_interval.as_secs(),
            progress_poll_interval_secs = self.progress_poll_interval.as_secs(),
            batch_size = self.batch_size,
            "ChallengeRuntime started"
        );

        Ok(ChallengeRuntime {
            status_handle,
            progress_handle,
            status_shutdown,
            progress_shutdown,
            status_updater,
            advancer,
        })
    }
}

/// Running challenge-engine background tasks.
///
/// Call [`shutdown`](Self::shutdown) for graceful termination.
pub struct ChallengeRuntime {
    status_handle: JoinHandle<()>,
    progress_handle: JoinHandle<()>,
    status_shutdown: Arc<Notify>,
    progress_shutdown: Arc<Notify>,
    status_updater: ChallengeStatusUpdater,
    advancer: ParticipationAdvancer,
}

impl ChallengeRuntime {
    /// Create a new builder for configuring the runtime.
    pub fn builder() -> ChallengeRuntimeBuilder {
        ChallengeRuntimeBuilder::new()
    }

    /// Updater sharing the status scheduler's pass guard.
    pub fn status_updater(&self) -> ChallengeStatusUpdater {
        self.status_updater.clone()
    }

    /// Advancer sharing the advancement scheduler's pass guard.
    pub fn advancer(&self) -> ParticipationAdvancer {
        self.advancer.clone()
    }

    /// Gracefully shut down both schedulers and wait for them.
    pub async fn shutdown(self) -> Result<()> {
        info!("ChallengeRuntime shutting down...");

        self.status_shutdown.notify_one();
        self.progress_shutdown.notify_one();

        let mut panicked = false;
        if let Err(e) = self.status_handle.await {
            error!("Challenge status scheduler task panicked: {}", e);
            panicked = true;
        }
        if let Err(e) = self.progress_handle.await {
            error!("Participation advancement scheduler task panicked: {}", e);
            panicked = true;
        }

        if panicked {
            anyhow::bail!("scheduler task panicked");
        }
        info!("ChallengeRuntime shutdown complete");
        Ok(())
    }

    /// Check if both schedulers are still running.
    pub fn is_running(&self) -> bool {
        !self.status_handle.is_finished() && !self.progress_handle.is_finished()
    }
}
