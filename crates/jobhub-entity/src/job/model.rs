//! Job entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::JobState;

/// A background job.
///
/// Created by the client, mutated exclusively by the processor after
/// submission. `id` and `created_at` are immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier (client-generated, up to 36 bytes).
    pub id: String,
    /// Job type identifier resolved against the handler registry.
    pub job_type: String,
    /// Opaque serialized payload handed to the handler.
    pub payload: Option<String>,
    /// Current job state.
    pub state: JobState,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// Earliest time at which the job is eligible for dispatch.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// When a worker began processing the job.
    pub started_at: Option<DateTime<Utc>>,
    /// Number of failed attempts so far.
    pub retry_count: u32,
    /// Maximum number of retries before the job is abandoned.
    pub max_retry_count: u32,
    /// Error message from the most recent failure.
    pub error_message: Option<String>,
    /// Opaque serialized result written on success.
    pub result: Option<String>,
    /// Batch membership, when the job belongs to a batch.
    pub batch_id: Option<String>,
    /// Parent job id, when the job is a continuation.
    pub parent_id: Option<String>,
}

impl Job {
    /// Create a job in the given initial state with everything else unset.
    pub fn new(
        id: impl Into<String>,
        job_type: impl Into<String>,
        payload: Option<String>,
        state: JobState,
        max_retry_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            job_type: job_type.into(),
            payload,
            state,
            created_at: Utc::now(),
            scheduled_at: None,
            started_at: None,
            retry_count: 0,
            max_retry_count,
            error_message: None,
            result: None,
            batch_id: None,
            parent_id: None,
        }
    }

    /// Check if the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Check if the job is eligible for dispatch at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.state == JobState::Scheduled && self.scheduled_at.is_some_and(|at| at <= now)
    }
}
