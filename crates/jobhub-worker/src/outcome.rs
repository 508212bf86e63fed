//! Handler execution outcomes.

use std::time::Duration;

/// The result a handler reports back to the processor.
///
/// A failure outcome decides the retry path: retryable failures are
/// rescheduled until the job's retry budget runs out, non-retryable ones
/// abandon the job immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job completed; `result` is persisted on the job row.
    Success {
        /// Opaque serialized result.
        result: Option<String>,
    },
    /// The job failed.
    Failure {
        /// Human-readable failure reason, persisted as the job's error
        /// message.
        error: String,
        /// Whether the processor may reschedule the job.
        retryable: bool,
        /// Delay before the retry; the processor's default applies when
        /// unset.
        retry_delay: Option<Duration>,
    },
}

impl JobOutcome {
    /// A success without a result value.
    pub fn success() -> Self {
        Self::Success { result: None }
    }

    /// A success carrying a serialized result.
    pub fn success_with(result: impl Into<String>) -> Self {
        Self::Success {
            result: Some(result.into()),
        }
    }

    /// A retryable failure.
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            retryable: true,
            retry_delay: None,
        }
    }

    /// A failure the processor must not retry.
    pub fn failure_no_retry(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
            retryable: false,
            retry_delay: None,
        }
    }

    /// A retryable failure built from an error value; its `Display` form
    /// becomes the job's error message.
    pub fn failure_from_error(error: impl std::fmt::Display) -> Self {
        Self::failure(error.to_string())
    }

    /// Attach an explicit retry delay. No-op on success outcomes.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        if let Self::Failure { retry_delay, .. } = &mut self {
            *retry_delay = Some(delay);
        }
        self
    }

    /// Check whether this outcome is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
