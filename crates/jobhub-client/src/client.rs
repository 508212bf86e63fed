//! Job submission client.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use jobhub_core::batch;
use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::traits::storage::JobStorage;
use jobhub_cron::CronSchedule;
use jobhub_entity::job::{Job, JobState};
use jobhub_entity::recurring::RecurringJob;

/// Client for submitting work to a JobHub storage backend.
///
/// The client only ever creates rows and performs the cancel/delete
/// operations; every other mutation belongs to the processor. Payloads are
/// serialized to JSON and treated as opaque strings from then on.
#[derive(Clone)]
pub struct JobClient {
    /// Storage backend shared with the processor.
    storage: Arc<dyn JobStorage>,
}

impl std::fmt::Debug for JobClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobClient").finish()
    }
}

impl JobClient {
    /// Create a client on top of a storage backend.
    pub fn new(storage: Arc<dyn JobStorage>) -> Self {
        Self { storage }
    }

    /// Enqueue a job for immediate execution. Returns the new job id.
    pub async fn enqueue<T: Serialize>(
        &self,
        job_type: &str,
        args: &T,
        max_retry_count: u32,
    ) -> AppResult<String> {
        self.submit_scheduled(job_type, args, Utc::now(), max_retry_count)
            .await
    }

    /// Enqueue a job to run after the given delay. Returns the new job id.
    pub async fn schedule_in<T: Serialize>(
        &self,
        job_type: &str,
        args: &T,
        delay: Duration,
        max_retry_count: u32,
    ) -> AppResult<String> {
        let delay = chrono::Duration::from_std(delay)
            .map_err(|e| AppError::validation(format!("delay out of range: {e}")))?;
        self.submit_scheduled(job_type, args, Utc::now() + delay, max_retry_count)
            .await
    }

    /// Enqueue a job to run at the given instant. Returns the new job id.
    pub async fn schedule_at<T: Serialize>(
        &self,
        job_type: &str,
        args: &T,
        at: DateTime<Utc>,
        max_retry_count: u32,
    ) -> AppResult<String> {
        self.submit_scheduled(job_type, args, at, max_retry_count).await
    }

    /// Enqueue a continuation that becomes eligible once the parent job
    /// succeeds.
    ///
    /// The continuation is stored in `awaiting_continuation` unconditionally;
    /// it is released by the processor when it writes the parent's success.
    /// Callers attaching continuations to a job that may already have
    /// finished should check the parent state first.
    pub async fn continue_with<T: Serialize>(
        &self,
        parent_id: &str,
        job_type: &str,
        args: &T,
        max_retry_count: u32,
    ) -> AppResult<String> {
        let job = Job::new(
            fresh_id(),
            job_type,
            encode(args)?,
            JobState::AwaitingContinuation,
            max_retry_count,
        );
        let id = self.storage.store_continuation(parent_id, &job).await?;
        tracing::debug!(job_id = %id, parent_id, job_type, "Continuation enqueued");
        Ok(id)
    }

    /// Enqueue a batch of jobs sharing one batch id.
    ///
    /// Members are stored `scheduled` and run immediately; only batch
    /// continuations created with [`continue_batch_with`] wait for the
    /// batch. Returns the batch id and the member job ids.
    ///
    /// [`continue_batch_with`]: JobClient::continue_batch_with
    pub async fn enqueue_batch<T: Serialize>(
        &self,
        job_type: &str,
        args_list: &[T],
        max_retry_count: u32,
    ) -> AppResult<(String, Vec<String>)> {
        let batch_id = fresh_id();
        let now = Utc::now();

        let mut jobs = Vec::with_capacity(args_list.len());
        for args in args_list {
            let mut job = Job::new(
                fresh_id(),
                job_type,
                encode(args)?,
                JobState::Scheduled,
                max_retry_count,
            );
            job.scheduled_at = Some(now);
            jobs.push(job);
        }

        let ids: Vec<String> = jobs.iter().map(|job| job.id.clone()).collect();
        self.storage.store_batch(&batch_id, &jobs).await?;

        tracing::debug!(batch_id = %batch_id, count = ids.len(), job_type, "Batch enqueued");
        Ok((batch_id, ids))
    }

    /// Enqueue a continuation that fires once every regular member of the
    /// batch has reached a terminal state.
    pub async fn continue_batch_with<T: Serialize>(
        &self,
        batch_id: &str,
        job_type: &str,
        args: &T,
        max_retry_count: u32,
    ) -> AppResult<String> {
        let mut job = Job::new(
            fresh_id(),
            job_type,
            encode(args)?,
            JobState::AwaitingBatch,
            max_retry_count,
        );
        job.batch_id = Some(batch_id.to_string());
        let id = self.storage.store_job(&job).await?;
        tracing::debug!(job_id = %id, batch_id, job_type, "Batch continuation enqueued");
        Ok(id)
    }

    /// Register or replace a recurring job definition.
    ///
    /// The cron expression is validated before anything is written; an
    /// invalid expression propagates to the caller. Re-registering an
    /// existing id replaces the schedule and template in place while
    /// keeping the processor's firing bookkeeping (`last_execution`) and
    /// `created_at` intact.
    pub async fn add_or_update_recurring<T: Serialize>(
        &self,
        id: &str,
        job_type: &str,
        args: &T,
        cron_expression: &str,
        max_retry_count: u32,
    ) -> AppResult<()> {
        let schedule = CronSchedule::parse(cron_expression)
            .map_err(|e| AppError::cron(e.to_string()))?;

        let now = Utc::now();
        let existing = self.storage.get_recurring_job(id).await?;
        let (last_execution, created_at) = match &existing {
            Some(row) => (row.last_execution, row.created_at),
            None => (None, now),
        };

        let recurring = RecurringJob {
            id: id.to_string(),
            cron_expression: cron_expression.to_string(),
            job_type: job_type.to_string(),
            payload: encode(args)?,
            max_retry_count,
            next_execution: schedule.next_occurrence(now).ok(),
            last_execution,
            enabled: true,
            created_at,
        };

        self.storage.store_recurring_job(&recurring).await?;
        tracing::debug!(recurring_id = id, cron = cron_expression, "Recurring job registered");
        Ok(())
    }

    /// Remove a recurring job definition. Removing a missing id is a no-op.
    pub async fn remove_recurring(&self, id: &str) -> AppResult<()> {
        self.storage.remove_recurring_job(id).await
    }

    /// Cancel a job that has not been dispatched yet.
    ///
    /// Returns `true` when the stored state was `scheduled` and the job is
    /// now `cancelled`; `false` for any other state (including a missing
    /// job), in which case nothing is written.
    pub async fn cancel_job(&self, id: &str) -> AppResult<bool> {
        let Some(mut job) = self.storage.get_job(id).await? else {
            return Ok(false);
        };
        if job.state != JobState::Scheduled {
            return Ok(false);
        }

        job.state = JobState::Cancelled;
        match self.storage.update_job(&job).await {
            Ok(()) => {
                tracing::debug!(job_id = id, "Job cancelled");
                // A cancelled member can be the batch's last terminal write.
                if let Some(batch_id) = job.batch_id.as_deref() {
                    if let Err(e) =
                        batch::release_completed_batch(self.storage.as_ref(), batch_id).await
                    {
                        tracing::error!(
                            batch_id,
                            error = %e,
                            "Failed to evaluate batch completion after cancel"
                        );
                    }
                }
                Ok(true)
            }
            // Deleted out from under us; nothing to cancel.
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete a job. Deleting a missing id is a no-op.
    pub async fn delete_job(&self, id: &str) -> AppResult<()> {
        self.storage.delete_job(id).await
    }

    /// Fetch a job by id.
    pub async fn get_job(&self, id: &str) -> AppResult<Option<Job>> {
        self.storage.get_job(id).await
    }

    /// Count jobs currently in the given state.
    pub async fn get_job_count(&self, state: JobState) -> AppResult<u64> {
        self.storage.get_job_count(state).await
    }

    async fn submit_scheduled<T: Serialize>(
        &self,
        job_type: &str,
        args: &T,
        at: DateTime<Utc>,
        max_retry_count: u32,
    ) -> AppResult<String> {
        let mut job = Job::new(
            fresh_id(),
            job_type,
            encode(args)?,
            JobState::Scheduled,
            max_retry_count,
        );
        job.scheduled_at = Some(at);

        let id = self.storage.store_job(&job).await?;
        tracing::debug!(job_id = %id, job_type, scheduled_at = %at, "Job enqueued");
        Ok(id)
    }
}

/// Generate a fresh job/batch id.
fn fresh_id() -> String {
    Uuid::new_v4().to_string()
}

/// Serialize caller arguments into the opaque payload string.
fn encode<T: Serialize>(args: &T) -> AppResult<Option<String>> {
    Ok(Some(serde_json::to_string(args)?))
}
