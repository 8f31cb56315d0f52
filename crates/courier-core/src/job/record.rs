use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::traits::JobPriority;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job_{}", self.0.simple())
    }
}

/// Where a stored job sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting for its scheduled time.
    Scheduled,
    /// Eligible for dispatch.
    Ready,
    /// Out of attempts, kept until the retention window elapses.
    Exhausted,
}

/// A unit of deferred work held by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job ID.
    pub id: JobId,
    /// Job type, used to route to a handler.
    #[serde(rename = "type")]
    pub job_type: String,
    /// Opaque payload.
    pub data: serde_json::Value,
    /// Priority level.
    pub priority: JobPriority,
    /// Number of attempts made.
    pub attempts: u32,
    /// Maximum attempts allowed.
    pub max_attempts: u32,
    /// When the job was enqueued.
    pub created_at: DateTime<Utc>,
    /// Earliest dispatch time, if delayed.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Message from the most recent failed attempt.
    pub error: Option<String>,
}

impl Job {
    /// Create a new job record.
    pub fn new(
        job_type: impl Into<String>,
        data: serde_json::Value,
        priority: JobPriority,
        max_attempts: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::new(),
            job_type: job_type.into(),
            data,
            priority,
            attempts: 0,
            max_attempts,
            created_at,
            scheduled_at: None,
            error: None,
        }
    }

    /// Delay the job; a zero delay leaves it immediately eligible.
    ///
    /// Delays past the representable range pin the job to the far future.
    pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.scheduled_at = if delay.is_zero() {
            None
        } else {
            let at = Duration::from_std(delay)
                .ok()
                .and_then(|delay| self.created_at.checked_add_signed(delay))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            Some(at)
        };
        self
    }

    /// Check whether all attempts have been used.
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Check whether the job may be dispatched at `now`.
    pub fn is_ready(&self, now: DateTime<Utc>) -> bool {
        !self.is_exhausted() && self.scheduled_at.map_or(true, |at| at <= now)
    }

    /// Check whether an exhausted job has outlived the retention window.
    pub fn is_expired(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        self.is_exhausted()
            && now
                .checked_sub_signed(retention)
                .is_some_and(|cutoff| self.created_at < cutoff)
    }

    /// Lifecycle state at `now`.
    pub fn state(&self, now: DateTime<Utc>) -> JobState {
        if self.is_exhausted() {
            JobState::Exhausted
        } else if self.is_ready(now) {
            JobState::Ready
        } else {
            JobState::Scheduled
        }
    }
}
