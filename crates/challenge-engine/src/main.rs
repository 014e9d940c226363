// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Challenge Engine - scheduler service
//!
//! Runs the challenge status and participation advancement schedulers
//! against the configured database until interrupted.

use tracing::{info, warn};

use challenge_engine::config::Config;
use challenge_engine::persistence;
use challenge_engine::runtime::ChallengeRuntime;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "challenge_engine=info".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        max_connections = config.max_connections,
        status_poll_interval_secs = config.status_poll_interval.as_secs(),
        progress_poll_interval_secs = config.progress_poll_interval.as_secs(),
        batch_size = config.batch_size,
        "Starting Challenge Engine"
    );

    let persistence = persistence::connect(&config.database_url, config.max_connections).await?;

    let runtime = ChallengeRuntime::builder()
        .persistence(persistence)
        .config(&config)
        .build()?
        .start()
        .await?;

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    runtime.shutdown().await?;

    info!("Challenge Engine shut down");

    Ok(())
}
