// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::time::Duration;

/// challenge-engine configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL or SQLite connection URL
    pub database_url: String,
    /// Maximum pooled database connections
    pub max_connections: u32,
    /// Interval between challenge status passes
    pub status_poll_interval: Duration,
    /// Interval between participation advancement passes
    pub progress_poll_interval: Duration,
    /// Records fetched per page during a pass
    pub batch_size: i64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `CHALLENGE_DATABASE_URL`: PostgreSQL or SQLite connection string
    ///
    /// Optional (with defaults):
    /// - `CHALLENGE_DB_MAX_CONNECTIONS` (default: 10)
    /// - `CHALLENGE_STATUS_POLL_INTERVAL_SECS` (default: 3600)
    /// - `CHALLENGE_PROGRESS_POLL_INTERVAL_SECS` (default: 86400)
    /// - `CHALLENGE_SCHEDULER_BATCH_SIZE` (default: 100)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("CHALLENGE_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("CHALLENGE_DATABASE_URL"))?;

        let max_connections: u32 = positive("CHALLENGE_DB_MAX_CONNECTIONS", "10")?;
        let status_secs: u64 = positive("CHALLENGE_STATUS_POLL_INTERVAL_SECS", "3600")?;
        let progress_secs: u64 = positive("CHALLENGE_PROGRESS_POLL_INTERVAL_SECS", "86400")?;
        let batch_size: i64 = positive("CHALLENGE_SCHEDULER_BATCH_SIZE", "100")?;

        Ok(Self {
            database_url,
            max_connections,
            status_poll_interval: Duration::from_secs(status_secs),
            progress_poll_interval: Duration::from_secs(progress_secs),
            batch_size,
        })
    }
}

fn positive<T>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let value: T = std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::Invalid(key, "must be a positive integer"))?;

    if value <= T::default() {
        return Err(ConfigError::Invalid(key, "must be a positive integer"));
    }
    Ok(value)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
