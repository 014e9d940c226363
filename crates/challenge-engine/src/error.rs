// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for challenge-engine.
//!
//! Every error maps to an [`ErrorKind`] so that transports can surface a
//! 404/400/409-style response without inspecting individual variants.

use thiserror::Error;

use crate::model::TransitionError;

/// Engine errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying migrations failed.
    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Challenge was not found.
    #[error("Challenge not found: {0}")]
    ChallengeNotFound(String),

    /// User is unknown to the user directory.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// No participation exists for the (user, challenge) pair.
    #[error("No participation found for user '{user_id}' in challenge '{challenge_id}'")]
    ParticipationNotFound {
        /// User identifier.
        user_id: String,
        /// Challenge identifier.
        challenge_id: String,
    },

    /// The challenge has no activity planned for the requested day.
    #[error("Day {day} not found for challenge '{challenge_id}'")]
    DayNotFound {
        /// Challenge identifier.
        challenge_id: String,
        /// Requested day number.
        day: i32,
    },

    /// Request validation failed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation is illegal in the record's current lifecycle state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A status transition was rejected by the state machine.
    #[error(transparent)]
    Transition(#[from] TransitionError),

    /// Concurrent writers kept invalidating the record version.
    #[error("Conflicting concurrent update: {0}")]
    Conflict(String),

    /// Caller could not be authenticated.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Caller is authenticated but lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An external collaborator (catalog, storage, directory) failed.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// A stored record could not be decoded into a valid domain value.
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    /// Other error.
    #[error("{0}")]
    Other(String),
}

/// Coarse error classification used by transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown id (404).
    NotFound,
    /// Malformed input or violated authoring constraint (400).
    Validation,
    /// Illegal lifecycle transition (409).
    State,
    /// Lost an optimistic-concurrency race too many times (409).
    Conflict,
    /// Missing or invalid credentials (401).
    Unauthenticated,
    /// Insufficient role (403).
    Forbidden,
    /// Storage or collaborator failure (500).
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status code.
    pub fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::Validation => 400,
            Self::State | Self::Conflict => 409,
            Self::Unauthenticated => 401,
            Self::Forbidden => 403,
            Self::Internal => 500,
        }
    }
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ChallengeNotFound(_)
            | Self::UserNotFound(_)
            | Self::ParticipationNotFound { .. }
            | Self::DayNotFound { .. } => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidState(_) | Self::Transition(_) => ErrorKind::State,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthenticated => ErrorKind::Unauthenticated,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Config(_)
            | Self::Database(_)
            | Self::Migrate(_)
            | Self::Collaborator(_)
            | Self::CorruptRecord(_)
            | Self::Other(_) => ErrorKind::Internal,
        }
    }

    /// Stable error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::Database(_) | Self::Migrate(_) => "DATABASE_ERROR",
            Self::ChallengeNotFound(_) => "CHALLENGE_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::ParticipationNotFound { .. } => "PARTICIPATION_NOT_FOUND",
            Self::DayNotFound { .. } => "DAY_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidState(_) | Self::Transition(_) => "INVALID_STATE",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Collaborator(_) => "COLLABORATOR_ERROR",
            Self::CorruptRecord(_) => "CORRUPT_RECORD",
            Self::Other(_) => "INTERNAL_ERROR",
        }
    }
}

/// Result type using the engine [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
