//! Recurring-jobs loop — materializes job instances from cron schedules.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};
use uuid::Uuid;

use jobhub_core::error::AppError;
use jobhub_core::result::AppResult;
use jobhub_cron::CronSchedule;
use jobhub_entity::job::{Job, JobState};
use jobhub_entity::recurring::RecurringJob;

use crate::processor::ProcessorInner;

/// The recurring-jobs loop: evaluate every enabled definition each tick.
pub(crate) async fn run_recurring_loop(
    inner: Arc<ProcessorInner>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(inner.config.recurring_polling_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                poll_recurring(&inner).await;
            }
        }
    }

    tracing::debug!("Recurring-jobs loop stopped");
}

/// One tick: fire each due definition. Per-definition failures are logged
/// and do not abort the tick.
async fn poll_recurring(inner: &Arc<ProcessorInner>) {
    let definitions = match inner.storage.get_recurring_jobs().await {
        Ok(definitions) => definitions,
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch recurring jobs");
            return;
        }
    };

    let now = Utc::now();
    for definition in definitions {
        let id = definition.id.clone();
        if let Err(e) = fire_if_due(inner, definition, now).await {
            tracing::error!(recurring_id = %id, error = %e, "Recurring job tick failed");
        }
    }
}

/// Materialize one job instance when the definition's schedule has fired.
///
/// The anchor is the last materialization, or one minute back for a
/// definition that has never fired. Missed occurrences during downtime are
/// not backfilled; at most one instance materializes per tick.
async fn fire_if_due(
    inner: &Arc<ProcessorInner>,
    mut definition: RecurringJob,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let schedule = CronSchedule::parse(&definition.cron_expression)
        .map_err(|e| AppError::cron(e.to_string()))?;

    let anchor = definition
        .last_execution
        .unwrap_or(now - Duration::minutes(1));
    let next = schedule
        .next_occurrence(anchor)
        .map_err(|e| AppError::cron(e.to_string()))?;
    if next > now {
        return Ok(());
    }

    let mut job = Job::new(
        Uuid::new_v4().to_string(),
        definition.job_type.clone(),
        definition.payload.clone(),
        JobState::Scheduled,
        definition.max_retry_count,
    );
    job.scheduled_at = Some(now);
    inner.storage.store_job(&job).await?;

    tracing::info!(
        recurring_id = %definition.id,
        job_id = %job.id,
        job_type = %job.job_type,
        "Recurring job materialized"
    );

    definition.last_execution = Some(now);
    definition.next_execution = schedule.next_occurrence(now).ok();
    inner.storage.store_recurring_job(&definition).await?;
    Ok(())
}
