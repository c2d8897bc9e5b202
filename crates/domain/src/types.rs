//! Common data types used throughout the sync subsystem

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Network reachability as observed by the connectivity monitor.
///
/// Absence of connectivity is a state, not an error: consumers receive
/// `Unavailable` through the same channel as `Available` and react to the
/// transition rather than to a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    Available,
    Unavailable,
}

impl ConnectivityState {
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Unavailable => "unavailable",
        }
    }
}

/// The job slots owned by the sync scheduler.
///
/// Each key tracks its own lifecycle; an outcome on one key never affects
/// the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKey {
    /// Connectivity-driven sync, scheduled when the network comes back.
    OneShot,
    /// Timer-driven sync, fired on a fixed interval while the app runs.
    Periodic,
}

impl JobKey {
    /// All keys, in scheduling order.
    pub const ALL: [Self; 2] = [Self::OneShot, Self::Periodic];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OneShot => "sync.one_shot",
            Self::Periodic => "sync.periodic",
        }
    }

    /// Conflict policy applied when a trigger lands on an occupied key.
    #[must_use]
    pub const fn policy(self) -> SchedulePolicy {
        match self {
            Self::OneShot => SchedulePolicy::Replace,
            Self::Periodic => SchedulePolicy::KeepExisting,
        }
    }
}

/// What happens when a trigger arrives for a key that already has a job
/// outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// The new trigger wins: pending work is dropped, running work is
    /// allowed to finish and a fresh execution follows it.
    Replace,
    /// The outstanding job absorbs the trigger; nothing new is scheduled.
    KeepExisting,
}

/// Lifecycle phase of one job key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// No job outstanding.
    Idle,
    /// Dispatch decided but the execution task has not started yet.
    Scheduled,
    /// An execution is in flight.
    Running,
    /// A transient failure was recorded; the next attempt is waiting for
    /// its backoff to elapse.
    RetryPending,
    /// The job gave up, either permanently or by exhausting its retries.
    Failed,
}

impl JobPhase {
    /// A key with work outstanding, running or waiting to run.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Scheduled | Self::Running | Self::RetryPending)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scheduled => "scheduled",
            Self::Running => "running",
            Self::RetryPending => "retry_pending",
            Self::Failed => "failed",
        }
    }
}

/// Result of a single sync job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// All work completed; local state matches the backend.
    Success,
    /// A transient failure on the given 1-based attempt; the job is safe
    /// to re-invoke.
    Retry { attempt: u32 },
    /// A permanent failure, or retries exhausted. Terminal until a new
    /// trigger arrives.
    Failure { reason: String },
}

impl SyncOutcome {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failure { .. })
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Retry { .. } => "retry",
            Self::Failure { .. } => "failure",
        }
    }
}

/// Retry classification for sync errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Worth retrying: timeouts, dropped connections, server-side errors.
    Transient,
    /// Retrying will not help: client-side errors, undecodable payloads.
    Permanent,
}

/// A queued local write awaiting delivery to the backend.
///
/// Ops carry an idempotency key so that re-sending a batch after a failed
/// or half-acknowledged sync cannot double-apply on the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingOp {
    pub id: Uuid,
    pub idempotency_key: Uuid,
    /// Backend resource the op applies to, e.g. `orders`.
    pub resource: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PendingOp {
    #[must_use]
    pub fn new(resource: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            idempotency_key: Uuid::new_v4(),
            resource: resource.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}

/// Catalog refresh payload returned by the backend.
///
/// Decoding is lenient: unknown fields are ignored and missing optional
/// fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub version: i64,
    /// Server-side generation time, when the backend reports one.
    #[serde(default)]
    pub fetched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub records: Vec<CatalogRecord>,
}

/// One record in a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub resource: String,
    pub id: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Observable state of one job key, published by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeySnapshot {
    pub key: JobKey,
    pub phase: JobPhase,
    /// Transient failures recorded in the current job lifetime.
    pub attempts: u32,
    pub last_outcome: Option<SyncOutcome>,
    pub last_success_at: Option<DateTime<Utc>>,
}

impl KeySnapshot {
    #[must_use]
    pub const fn idle(key: JobKey) -> Self {
        Self {
            key,
            phase: JobPhase::Idle,
            attempts: 0,
            last_outcome: None,
            last_success_at: None,
        }
    }
}

/// Snapshot of both job keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub one_shot: KeySnapshot,
    pub periodic: KeySnapshot,
}

impl SchedulerStatus {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            one_shot: KeySnapshot::idle(JobKey::OneShot),
            periodic: KeySnapshot::idle(JobKey::Periodic),
        }
    }

    #[must_use]
    pub const fn key(&self, key: JobKey) -> &KeySnapshot {
        match key {
            JobKey::OneShot => &self.one_shot,
            JobKey::Periodic => &self.periodic,
        }
    }
}

impl Default for SchedulerStatus {
    fn default() -> Self {
        Self::new()
    }
}
