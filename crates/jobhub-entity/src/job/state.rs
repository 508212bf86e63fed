//! Job state enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a background job.
///
/// The numeric discriminants are part of the persisted contract so that
/// storage backends which encode states as integers stay compatible.
/// `Failed` is reserved: backends must accept it but the engine never
/// produces it. The retry path goes through `Scheduled` and exhaustion
/// through `Abandoned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum JobState {
    /// Constructed but not yet submitted.
    Created = 0,
    /// Eligible for dispatch once `scheduled_at` has passed.
    Scheduled = 1,
    /// Currently being processed by a worker.
    Processing = 2,
    /// Completed successfully.
    Succeeded = 3,
    /// Reserved for forward compatibility; never written by the engine.
    Failed = 4,
    /// Cancelled before dispatch.
    Cancelled = 5,
    /// Gave up after exhausting retries or a non-retryable failure.
    Abandoned = 6,
    /// Waiting for its parent job to succeed.
    AwaitingContinuation = 7,
    /// Waiting for every sibling in its batch to terminate.
    AwaitingBatch = 8,
}

impl JobState {
    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Cancelled | Self::Abandoned)
    }

    /// Return the state as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Scheduled => "scheduled",
            Self::Processing => "processing",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Abandoned => "abandoned",
            Self::AwaitingContinuation => "awaiting_continuation",
            Self::AwaitingBatch => "awaiting_batch",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
