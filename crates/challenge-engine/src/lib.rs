// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Challenge Engine - Challenge Lifecycle and Participation Progression
//!
//! Users join multi-day challenges, complete one activity per day, and move
//! toward completion. This crate owns the two state machines behind that and
//! the background passes that advance them:
//!
//! - Authoring: create, edit and publish challenges and their day plans
//! - Participation: join, complete days, read progress
//! - Status scheduler: publish → active → completed along the calendar
//! - Advancement scheduler: move each user's day pointer one day per pass
//!
//! # Architecture
//!
//! ```text
//!   authoring request           user request
//!          │                         │
//!          ▼                         ▼
//! ┌─────────────────────┐   ┌─────────────────────┐
//! │ ChallengeLifecycle  │   │ ParticipationEngine │
//! │ Manager             │   │                     │
//! └──────────┬──────────┘   └──────────┬──────────┘
//!            │                         │
//!            ▼                         ▼
//! ┌─────────────────────────────────────────────────┐
//! │          Persistence (SQLite / PostgreSQL)      │
//! │   challenges · challenge_days · participations  │
//! └─────────────────────────────────────────────────┘
//!            ▲                         ▲
//!            │                         │
//! ┌──────────┴──────────┐   ┌──────────┴──────────┐
//! │ ChallengeStatus     │   │ ParticipationAdvance│
//! │ Scheduler (hourly)  │   │ Scheduler (daily)   │
//! └─────────────────────┘   └─────────────────────┘
//! ```
//!
//! The schedulers never talk to each other or to the engines; they only read
//! what the engines wrote. Every write is version-checked, so a user's day
//! completion and a scheduler pass over the same participation cannot
//! overwrite each other.
//!
//! # State Machines
//!
//! ```text
//! Challenge:
//!   ┌───────┐ publish  ┌───────────┐ start_date ≤ today ┌────────┐ end_date < today ┌───────────┐
//!   │ DRAFT │ ───────► │ PUBLISHED │ ─────────────────► │ ACTIVE │ ───────────────► │ COMPLETED │
//!   └───────┘ (admin)  └───────────┘    (scheduler)     └────────┘   (scheduler)    └───────────┘
//!
//! Participation:
//!   join ┌──────────┐ complete day ┌─────────────┐ all days done ┌───────────┐
//!   ───► │ ENROLLED │ ───────────► │ IN_PROGRESS │ ────────────► │ COMPLETED │
//!        └──────────┘              └─────────────┘               └───────────┘
//! ```
//!
//! # Configuration
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `CHALLENGE_DATABASE_URL` | Yes | - | `sqlite:` or `postgres:` connection string |
//! | `CHALLENGE_DB_MAX_CONNECTIONS` | No | `10` | Pool size |
//! | `CHALLENGE_STATUS_POLL_INTERVAL_SECS` | No | `3600` | Challenge status pass interval |
//! | `CHALLENGE_PROGRESS_POLL_INTERVAL_SECS` | No | `86400` | Advancement pass interval |
//! | `CHALLENGE_SCHEDULER_BATCH_SIZE` | No | `100` | Records per page in a pass |
//!
//! # Modules
//!
//! - [`model`]: Records, day plans and the status machines
//! - [`persistence`]: Storage trait with SQLite and PostgreSQL backends
//! - [`lifecycle`]: Challenge authoring
//! - [`participation`]: Joining and completing days
//! - [`status_scheduler`]: Calendar-driven challenge transitions
//! - [`progress_scheduler`]: Day pointer advancement
//! - [`collaborators`]: Identity, users, activity catalog, object storage
//! - [`handlers`]: Transport-agnostic request handlers
//! - [`runtime`]: Embeddable scheduler runtime

#![deny(missing_docs)]

/// Embedded SQLite and PostgreSQL migrations.
pub mod migrations;

/// Configuration loaded from environment variables.
pub mod config;

/// Error types and their transport classification.
pub mod error;

/// Records, day plans and status machines.
pub mod model;

/// Storage trait and backends.
pub mod persistence;

/// External collaborator interfaces and in-process implementations.
pub mod collaborators;

/// Challenge authoring.
pub mod lifecycle;

/// Participation operations.
pub mod participation;

/// Background challenge status transitions.
pub mod status_scheduler;

/// Background participation advancement.
pub mod progress_scheduler;

/// Request handlers.
pub mod handlers;

/// Embeddable runtime running both schedulers.
pub mod runtime;

pub use error::{Error, ErrorKind, Result};
pub use lifecycle::ChallengeLifecycleManager;
pub use participation::ParticipationEngine;
pub use status_scheduler::PassOutcome;

/// Attempts at a version-checked write before giving up with [`Error::Conflict`].
pub const MAX_WRITE_ATTEMPTS: u32 = 5;
