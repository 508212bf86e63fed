//! In-memory storage implementation using dashmap.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_core::traits::storage::JobStorage;
use jobhub_entity::job::{Job, JobState};
use jobhub_entity::recurring::RecurringJob;

/// In-memory storage backend.
///
/// Satisfies the full [`JobStorage`] contract except durability: rows live
/// only as long as the process. Intended for tests and for embedded hosts
/// that accept losing queued work on restart.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    /// Jobs keyed by id.
    jobs: DashMap<String, Job>,
    /// Recurring definitions keyed by id.
    recurring: DashMap<String, RecurringJob>,
}

impl MemoryStorage {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStorage for MemoryStorage {
    async fn store_job(&self, job: &Job) -> AppResult<String> {
        if self.jobs.contains_key(&job.id) {
            return Err(AppError::validation(format!(
                "job '{}' already exists",
                job.id
            )));
        }
        self.jobs.insert(job.id.clone(), job.clone());
        Ok(job.id.clone())
    }

    async fn update_job(&self, job: &Job) -> AppResult<()> {
        match self.jobs.get_mut(&job.id) {
            Some(mut stored) => {
                let mut updated = job.clone();
                // Immutable after creation.
                updated.created_at = stored.created_at;
                *stored = updated;
                Ok(())
            }
            None => Err(AppError::not_found(format!(
                "job '{}' does not exist",
                job.id
            ))),
        }
    }

    async fn get_job(&self, id: &str) -> AppResult<Option<Job>> {
        Ok(self.jobs.get(id).map(|entry| entry.value().clone()))
    }

    async fn delete_job(&self, id: &str) -> AppResult<()> {
        self.jobs.remove(id);
        Ok(())
    }

    async fn get_scheduled_jobs(&self, batch_size: usize) -> AppResult<Vec<Job>> {
        let now = Utc::now();
        let mut due: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| entry.is_due(now))
            .map(|entry| entry.value().clone())
            .collect();
        due.sort_by_key(|job| job.scheduled_at);
        due.truncate(batch_size);
        Ok(due)
    }

    async fn get_jobs_by_state(&self, state: JobState, batch_size: usize) -> AppResult<Vec<Job>> {
        let mut matching: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| entry.state == state)
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by_key(|job| job.created_at);
        matching.truncate(batch_size);
        Ok(matching)
    }

    async fn get_job_count(&self, state: JobState) -> AppResult<u64> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| entry.state == state)
            .count() as u64)
    }

    async fn store_batch(&self, batch_id: &str, jobs: &[Job]) -> AppResult<()> {
        for job in jobs {
            let mut member = job.clone();
            member.batch_id = Some(batch_id.to_string());
            self.store_job(&member).await?;
        }
        Ok(())
    }

    async fn get_batch_jobs(&self, batch_id: &str) -> AppResult<Vec<Job>> {
        let mut members: Vec<Job> = self
            .jobs
            .iter()
            .filter(|entry| entry.batch_id.as_deref() == Some(batch_id))
            .map(|entry| entry.value().clone())
            .collect();
        members.sort_by_key(|job| job.created_at);
        Ok(members)
    }

    async fn store_continuation(&self, parent_id: &str, job: &Job) -> AppResult<String> {
        let mut continuation = job.clone();
        continuation.parent_id = Some(parent_id.to_string());
        self.store_job(&continuation).await
    }

    async fn get_continuations(&self, parent_id: &str) -> AppResult<Vec<Job>> {
        Ok(self
            .jobs
            .iter()
            .filter(|entry| {
                entry.parent_id.as_deref() == Some(parent_id)
                    && entry.state == JobState::AwaitingContinuation
            })
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn store_recurring_job(&self, recurring: &RecurringJob) -> AppResult<()> {
        self.recurring
            .insert(recurring.id.clone(), recurring.clone());
        Ok(())
    }

    async fn get_recurring_job(&self, id: &str) -> AppResult<Option<RecurringJob>> {
        Ok(self.recurring.get(id).map(|entry| entry.value().clone()))
    }

    async fn get_recurring_jobs(&self) -> AppResult<Vec<RecurringJob>> {
        Ok(self
            .recurring
            .iter()
            .filter(|entry| entry.enabled)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn remove_recurring_job(&self, id: &str) -> AppResult<()> {
        self.recurring.remove(id);
        Ok(())
    }
}
