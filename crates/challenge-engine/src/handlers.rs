// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Transport-agnostic request handlers.
//!
//! Each handler takes the shared [`ChallengeHandlerState`], the caller's raw
//! credentials where the operation is user-scoped, and a serde request type.
//! Authoring and forced scheduler passes require the `ADMIN` role.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::collaborators::{ActivityCatalog, Identity, IdentityProvider, ObjectStorage, UserDirectory};
use crate::error::{Error, Result};
use crate::lifecycle::{ChallengeLifecycleManager, ChallengeUpdate, NewChallenge};
use crate::model::{
    ChallengeRecord, ChallengeStatus, DayCompletion, DayPlanEntry, ParticipationRecord,
    ParticipationStatus,
};
use crate::participation::{CurrentChallenge, DailyActivity, ParticipationEngine};
use crate::persistence::Persistence;
use crate::progress_scheduler::ParticipationAdvancer;
use crate::status_scheduler::{ChallengeStatusUpdater, PassOutcome};

/// Default page size for forced passes when no scheduler is shared.
const DEFAULT_BATCH_SIZE: i64 = 100;

/// Shared state for challenge handlers.
pub struct ChallengeHandlerState {
    /// Persistence backend.
    pub persistence: Arc<dyn Persistence>,
    /// Authoring operations.
    pub lifecycle: ChallengeLifecycleManager,
    /// Participation operations.
    pub participation: ParticipationEngine,
    /// Resolves caller credentials.
    pub identity: Arc<dyn IdentityProvider>,
    /// Used by forced status passes.
    pub status_updater: ChallengeStatusUpdater,
    /// Used by forced advancement passes.
    pub advancer: ParticipationAdvancer,
    /// When the state was created (for uptime calculation).
    pub start_time: std::time::Instant,
    /// Server version string.
    pub version: String,
}

impl ChallengeHandlerState {
    /// Create handler state with its own updater and advancer.
    ///
    /// Use [`Self::with_schedulers`] to share pass guards with a running
    /// [`crate::runtime::ChallengeRuntime`].
    pub fn new(
        persistence: Arc<dyn Persistence>,
        identity: Arc<dyn IdentityProvider>,
        users: Arc<dyn UserDirectory>,
        catalog: Arc<dyn ActivityCatalog>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            lifecycle: ChallengeLifecycleManager::new(persistence.clone(), storage),
            participation: ParticipationEngine::new(persistence.clone(), users, catalog),
            identity,
            status_updater: ChallengeStatusUpdater::new(persistence.clone(), DEFAULT_BATCH_SIZE),
            advancer: ParticipationAdvancer::new(persistence.clone(), DEFAULT_BATCH_SIZE),
            persistence,
            start_time: std::time::Instant::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Route forced passes through the given updater and advancer.
    pub fn with_schedulers(
        mut self,
        status_updater: ChallengeStatusUpdater,
        advancer: ParticipationAdvancer,
    ) -> Self {
        self.status_updater = status_updater;
        self.advancer = advancer;
        self
    }

    /// Get the uptime in milliseconds.
    pub fn uptime_ms(&self) -> i64 {
        self.start_time.elapsed().as_millis() as i64
    }

    async fn authenticate(&self, credentials: &str) -> Result<Identity> {
        self.identity.authenticate(credentials).await
    }

    async fn authorize_admin(&self, credentials: &str) -> Result<Identity> {
        let identity = self.authenticate(credentials).await?;
        if !identity.is_admin() {
            return Err(Error::Forbidden(format!(
                "user '{}' lacks the ADMIN role",
                identity.user_id
            )));
        }
        Ok(identity)
    }
}

// ============================================================================
// Shared response types
// ============================================================================

/// Error body for transports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP-equivalent status.
    pub status: u16,
    /// Stable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&Error> for ErrorResponse {
    fn from(error: &Error) -> Self {
        Self {
            status: error.kind().status_code(),
            code: error.error_code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Challenge as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeResponse {
    /// Challenge identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Number of days.
    pub duration: i32,
    /// Lifecycle status.
    pub status: ChallengeStatus,
    /// First day of the window.
    pub start_date: NaiveDate,
    /// Last day of the window.
    pub end_date: NaiveDate,
    /// Cover image.
    pub image_url: Option<String>,
    /// Day plan sorted by day.
    pub day_plan: Vec<DayPlanEntry>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last write time.
    pub updated_at: DateTime<Utc>,
}

impl From<ChallengeRecord> for ChallengeResponse {
    fn from(challenge: ChallengeRecord) -> Self {
        Self {
            status: challenge.status(),
            day_plan: challenge.day_plan.entries(),
            id: challenge.id,
            title: challenge.title,
            description: challenge.description,
            duration: challenge.duration,
            start_date: challenge.start_date,
            end_date: challenge.end_date,
            image_url: challenge.image_url,
            created_at: challenge.created_at,
            updated_at: challenge.updated_at,
        }
    }
}

/// Participation progress as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressResponse {
    /// Participation identifier.
    pub participation_id: String,
    /// Participating user.
    pub user_id: String,
    /// Challenge identifier.
    pub challenge_id: String,
    /// Lifecycle status.
    pub status: ParticipationStatus,
    /// Day the pointer is waiting on.
    pub current_day: i32,
    /// Completed days, ascending.
    pub completed_days: Vec<i32>,
    /// When the user joined.
    pub started_at: DateTime<Utc>,
    /// When every day was completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<ParticipationRecord> for ProgressResponse {
    fn from(participation: ParticipationRecord) -> Self {
        Self {
            status: participation.status(),
            current_day: participation.current_day(),
            completed_days: participation.completed_days().iter().copied().collect(),
            completed_at: participation.completed_at(),
            participation_id: participation.id,
            user_id: participation.user_id,
            challenge_id: participation.challenge_id,
            started_at: participation.started_at,
        }
    }
}

// ============================================================================
// Health Check
// ============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckResponse {
    /// Whether the database answered.
    pub healthy: bool,
    /// Server version.
    pub version: String,
    /// Uptime in milliseconds.
    pub uptime_ms: i64,
}

/// Handle health check request.
pub async fn handle_health_check(state: &ChallengeHandlerState) -> Result<HealthCheckResponse> {
    let healthy = state.persistence.health_check().await.unwrap_or(false);

    Ok(HealthCheckResponse {
        healthy,
        version: state.version.clone(),
        uptime_ms: state.uptime_ms(),
    })
}

// ============================================================================
// Challenge reads
// ============================================================================

/// Request to list challenges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListChallengesRequest {
    /// Optional status name filter.
    #[serde(default)]
    pub status: Option<String>,
}

/// Handle list challenges request.
pub async fn handle_list_challenges(
    state: &ChallengeHandlerState,
    request: ListChallengesRequest,
) -> Result<Vec<ChallengeResponse>> {
    let challenges = state.lifecycle.list(request.status.as_deref()).await?;
    Ok(challenges.into_iter().map(ChallengeResponse::from).collect())
}

/// Handle get challenge request.
pub async fn handle_get_challenge(
    state: &ChallengeHandlerState,
    challenge_id: &str,
) -> Result<ChallengeResponse> {
    Ok(state.lifecycle.get_by_id(challenge_id).await?.into())
}

/// Handle get day plan request.
pub async fn handle_get_day_plan(
    state: &ChallengeHandlerState,
    challenge_id: &str,
) -> Result<Vec<DayPlanEntry>> {
    state.lifecycle.day_plan(challenge_id).await
}

/// Handle daily activity request.
///
/// Anonymous callers get `completed = false`.
pub async fn handle_get_daily_activity(
    state: &ChallengeHandlerState,
    credentials: Option<&str>,
    challenge_id: &str,
    day: i32,
) -> Result<DailyActivity> {
    let identity = match credentials {
        Some(credentials) => Some(state.authenticate(credentials).await?),
        None => None,
    };

    state
        .participation
        .daily_activity(
            challenge_id,
            day,
            identity.as_ref().map(|i| i.user_id.as_str()),
        )
        .await
}

// ============================================================================
// Authoring (admin)
// ============================================================================

/// Handle create challenge request.
pub async fn handle_create_challenge(
    state: &ChallengeHandlerState,
    credentials: &str,
    request: NewChallenge,
) -> Result<ChallengeResponse> {
    let admin = state.authorize_admin(credentials).await?;
    let challenge = state.lifecycle.create(request).await?;
    info!(admin = %admin.user_id, challenge_id = %challenge.id, "Challenge created by admin");
    Ok(challenge.into())
}

/// Handle update challenge request.
pub async fn handle_update_challenge(
    state: &ChallengeHandlerState,
    credentials: &str,
    challenge_id: &str,
    request: ChallengeUpdate,
) -> Result<ChallengeResponse> {
    state.authorize_admin(credentials).await?;
    Ok(state.lifecycle.update(challenge_id, request).await?.into())
}

/// Delete challenge response.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteChallengeResponse {
    /// Always true on success.
    pub success: bool,
    /// Deleted challenge.
    pub challenge_id: String,
}

/// Handle delete challenge request.
pub async fn handle_delete_challenge(
    state: &ChallengeHandlerState,
    credentials: &str,
    challenge_id: &str,
) -> Result<DeleteChallengeResponse> {
    state.authorize_admin(credentials).await?;
    state.lifecycle.delete(challenge_id).await?;
    Ok(DeleteChallengeResponse {
        success: true,
        challenge_id: challenge_id.to_string(),
    })
}

/// Request to upload a cover image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadCoverRequest {
    /// Original file name.
    pub file_name: String,
    /// Image bytes.
    pub bytes: Vec<u8>,
}

/// Upload cover response.
#[derive(Debug, Clone, Serialize)]
pub struct UploadCoverResponse {
    /// Durable URL of the stored image.
    pub url: String,
}

/// Handle cover upload request.
pub async fn handle_upload_cover(
    state: &ChallengeHandlerState,
    credentials: &str,
    request: UploadCoverRequest,
) -> Result<UploadCoverResponse> {
    state.authorize_admin(credentials).await?;
    let url = state
        .lifecycle
        .upload_cover(&request.file_name, request.bytes)
        .await?;
    Ok(UploadCoverResponse { url })
}

// ============================================================================
// Participation
// ============================================================================

/// Handle join challenge request.
pub async fn handle_join_challenge(
    state: &ChallengeHandlerState,
    credentials: &str,
    challenge_id: &str,
) -> Result<ProgressResponse> {
    let identity = state.authenticate(credentials).await?;
    Ok(state
        .participation
        .join(&identity.user_id, challenge_id)
        .await?
        .into())
}

/// Handle start challenge request.
pub async fn handle_start_challenge(
    state: &ChallengeHandlerState,
    credentials: &str,
    challenge_id: &str,
) -> Result<ProgressResponse> {
    let identity = state.authenticate(credentials).await?;
    Ok(state
        .participation
        .start(&identity.user_id, challenge_id)
        .await?
        .into())
}

/// Handle progress request. Enrolls the caller when needed.
pub async fn handle_get_progress(
    state: &ChallengeHandlerState,
    credentials: &str,
    challenge_id: &str,
) -> Result<ProgressResponse> {
    let identity = state.authenticate(credentials).await?;
    Ok(state
        .participation
        .get_progress(&identity.user_id, challenge_id)
        .await?
        .into())
}

/// Request to complete a day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteDayRequest {
    /// Challenge identifier.
    pub challenge_id: String,
    /// Day number to mark completed.
    pub day: i32,
}

/// Complete day response.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteDayResponse {
    /// Always true on success, including repeats.
    pub success: bool,
    /// False when the day had already been completed.
    pub newly_completed: bool,
    /// True when this completion finished the challenge.
    pub finished: bool,
}

/// Handle complete day request.
pub async fn handle_complete_day(
    state: &ChallengeHandlerState,
    credentials: &str,
    request: CompleteDayRequest,
) -> Result<CompleteDayResponse> {
    let identity = state.authenticate(credentials).await?;
    let outcome = state
        .participation
        .complete_day(&identity.user_id, &request.challenge_id, request.day)
        .await?;

    Ok(CompleteDayResponse {
        success: true,
        newly_completed: outcome != DayCompletion::AlreadyRecorded,
        finished: outcome == DayCompletion::Finished,
    })
}

/// Handle participation history request.
pub async fn handle_get_history(
    state: &ChallengeHandlerState,
    credentials: &str,
) -> Result<Vec<ProgressResponse>> {
    let identity = state.authenticate(credentials).await?;
    let history = state.participation.history(&identity.user_id).await?;
    Ok(history.into_iter().map(ProgressResponse::from).collect())
}

/// Handle current challenges request.
pub async fn handle_get_current_challenges(
    state: &ChallengeHandlerState,
    credentials: &str,
) -> Result<Vec<CurrentChallenge>> {
    let identity = state.authenticate(credentials).await?;
    state
        .participation
        .current_challenges(&identity.user_id)
        .await
}

// ============================================================================
// Forced scheduler passes (admin)
// ============================================================================

/// Forced status pass response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForceStatusUpdateResponse {
    /// True when another pass was running and this one did nothing.
    pub skipped: bool,
    /// Challenges moved to `active`.
    pub activated: u64,
    /// Challenges moved to `completed`.
    pub completed: u64,
    /// Challenges that failed.
    pub failed: u64,
}

/// Handle forced challenge status update. Runs the scheduler's pass for today.
pub async fn handle_force_status_update(
    state: &ChallengeHandlerState,
    credentials: &str,
) -> Result<ForceStatusUpdateResponse> {
    let admin = state.authorize_admin(credentials).await?;
    let today = Utc::now().date_naive();
    info!(admin = %admin.user_id, %today, "Forced challenge status update");

    Ok(match state.status_updater.run_pass(today).await? {
        PassOutcome::Skipped => ForceStatusUpdateResponse {
            skipped: true,
            ..Default::default()
        },
        PassOutcome::Completed(report) => ForceStatusUpdateResponse {
            skipped: false,
            activated: report.activated,
            completed: report.completed,
            failed: report.failed,
        },
    })
}

/// Forced advancement pass response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForceAdvancementResponse {
    /// True when another pass was running and this one did nothing.
    pub skipped: bool,
    /// Pointers moved forward.
    pub advanced: u64,
    /// Participations completed.
    pub finished: u64,
    /// Participations still waiting on their current day.
    pub waiting: u64,
    /// Participations that failed.
    pub failed: u64,
}

/// Handle forced participation advancement.
pub async fn handle_force_progress_advancement(
    state: &ChallengeHandlerState,
    credentials: &str,
) -> Result<ForceAdvancementResponse> {
    let admin = state.authorize_admin(credentials).await?;
    info!(admin = %admin.user_id, "Forced participation advancement");

    Ok(match state.advancer.run_pass(Utc::now()).await? {
        PassOutcome::Skipped => ForceAdvancementResponse {
            skipped: true,
            ..Default::default()
        },
        PassOutcome::Completed(report) => ForceAdvancementResponse {
            skipped: false,
            advanced: report.advanced,
            finished: report.finished,
            waiting: report.waiting,
            failed: report.failed,
        },
    })
}
