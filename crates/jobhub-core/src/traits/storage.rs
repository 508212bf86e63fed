//! The storage contract every JobHub backend must satisfy.

use async_trait::async_trait;

use jobhub_entity::job::{Job, JobState};
use jobhub_entity::recurring::RecurringJob;

use crate::result::AppResult;

/// Persistence operations for jobs and recurring-job definitions.
///
/// Backends are assumed thread-safe; the client and the processor share one
/// handle. All queries are best-effort read-committed: the processor
/// tolerates a job appearing more than once in its scheduled window by
/// re-checking the stored state inside the worker, so backends do not need
/// to serialize readers against writers.
#[async_trait]
pub trait JobStorage: Send + Sync + 'static {
    /// Insert a new job. The caller guarantees the id is unique.
    /// Returns the stored id.
    async fn store_job(&self, job: &Job) -> AppResult<String>;

    /// Overwrite the mutable fields of an existing job.
    ///
    /// Fails with a not-found error when no row matches the job's id.
    async fn update_job(&self, job: &Job) -> AppResult<()>;

    /// Fetch a job by id, or `None` when absent.
    async fn get_job(&self, id: &str) -> AppResult<Option<Job>>;

    /// Delete a job. Deleting a missing id is not an error.
    async fn delete_job(&self, id: &str) -> AppResult<()>;

    /// Fetch up to `batch_size` jobs in [`JobState::Scheduled`] whose
    /// `scheduled_at` has passed, ordered by `scheduled_at` ascending.
    async fn get_scheduled_jobs(&self, batch_size: usize) -> AppResult<Vec<Job>>;

    /// Fetch up to `batch_size` jobs in the given state, ordered by
    /// `created_at` ascending.
    async fn get_jobs_by_state(&self, state: JobState, batch_size: usize) -> AppResult<Vec<Job>>;

    /// Count jobs currently in the given state.
    async fn get_job_count(&self, state: JobState) -> AppResult<u64>;

    /// Bulk-insert jobs sharing one batch id.
    async fn store_batch(&self, batch_id: &str, jobs: &[Job]) -> AppResult<()>;

    /// Fetch every job belonging to a batch, in any state.
    async fn get_batch_jobs(&self, batch_id: &str) -> AppResult<Vec<Job>>;

    /// Persist a continuation job attached to a parent. Returns the stored id.
    async fn store_continuation(&self, parent_id: &str, job: &Job) -> AppResult<String>;

    /// Fetch the continuations of a parent that are still awaiting it.
    async fn get_continuations(&self, parent_id: &str) -> AppResult<Vec<Job>>;

    /// Insert or update a recurring-job definition, keyed on its id.
    async fn store_recurring_job(&self, recurring: &RecurringJob) -> AppResult<()>;

    /// Fetch a recurring-job definition by id regardless of enablement, or
    /// `None` when absent.
    async fn get_recurring_job(&self, id: &str) -> AppResult<Option<RecurringJob>>;

    /// Fetch all enabled recurring-job definitions.
    async fn get_recurring_jobs(&self) -> AppResult<Vec<RecurringJob>>;

    /// Delete a recurring-job definition. Removing a missing id is not an
    /// error.
    async fn remove_recurring_job(&self, id: &str) -> AppResult<()>;
}
