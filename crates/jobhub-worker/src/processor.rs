//! Job processor — drives due jobs through the state machine on a bounded
//! worker pool.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Semaphore, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use jobhub_core::batch;
use jobhub_core::config::ProcessorConfig;
use jobhub_core::traits::storage::JobStorage;
use jobhub_entity::job::{Job, JobState};

use crate::executor::HandlerRegistry;
use crate::outcome::JobOutcome;
use crate::recurring;

/// Shared state handed to the loops and worker tasks.
pub(crate) struct ProcessorInner {
    /// Storage backend shared with the client.
    pub(crate) storage: Arc<dyn JobStorage>,
    /// Handler map, read-only after startup.
    pub(crate) registry: Arc<HandlerRegistry>,
    /// Processor configuration.
    pub(crate) config: ProcessorConfig,
    /// Worker-pool capacity.
    pub(crate) semaphore: Arc<Semaphore>,
    /// Root cancellation token; handlers receive child tokens.
    pub(crate) cancel: CancellationToken,
}

/// The background engine: a scheduled-jobs loop, a recurring-jobs loop, and
/// a worker pool bounded by `max_concurrent_jobs`.
///
/// [`start`](JobProcessor::start) is idempotent while running and returns
/// immediately; a processor that has been [`stop`](JobProcessor::stop)ped
/// stays stopped. Construct a new one to resume processing.
pub struct JobProcessor {
    inner: Arc<ProcessorInner>,
    shutdown_tx: watch::Sender<bool>,
    running: AtomicBool,
    loop_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for JobProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobProcessor")
            .field("running", &self.running.load(Ordering::SeqCst))
            .finish()
    }
}

impl JobProcessor {
    /// Create a processor over a storage backend and a populated registry.
    pub fn new(
        storage: Arc<dyn JobStorage>,
        registry: HandlerRegistry,
        config: ProcessorConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));

        Self {
            inner: Arc::new(ProcessorInner {
                storage,
                registry: Arc::new(registry),
                config,
                semaphore,
                cancel: CancellationToken::new(),
            }),
            shutdown_tx,
            running: AtomicBool::new(false),
            loop_handles: Mutex::new(Vec::new()),
        }
    }

    /// Launch the scheduled-jobs and recurring-jobs loops.
    ///
    /// Returns immediately; repeated calls while running are no-ops.
    pub async fn start(&self) {
        if self.inner.cancel.is_cancelled() {
            tracing::warn!("Processor has been stopped and cannot be restarted");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::debug!("Processor already running");
            return;
        }

        tracing::info!(
            max_concurrent_jobs = self.inner.config.max_concurrent_jobs,
            polling_interval_ms = self.inner.config.polling_interval_ms,
            recurring_polling_interval_ms = self.inner.config.recurring_polling_interval_ms,
            handlers = self.inner.registry.len(),
            "Processor starting"
        );

        let scheduled = tokio::spawn(run_scheduled_loop(
            Arc::clone(&self.inner),
            self.shutdown_tx.subscribe(),
        ));
        let recurring = tokio::spawn(recurring::run_recurring_loop(
            Arc::clone(&self.inner),
            self.shutdown_tx.subscribe(),
        ));

        self.loop_handles.lock().await.extend([scheduled, recurring]);
    }

    /// Stop both loops and wait for in-flight workers.
    ///
    /// New dispatches cease immediately and every handler's cancellation
    /// token fires; workers already running are awaited up to the configured
    /// shutdown timeout, after which this returns regardless.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        tracing::info!("Processor stopping");
        let _ = self.shutdown_tx.send(true);
        self.inner.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = self.loop_handles.lock().await.drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }

        let max_permits = self.inner.config.max_concurrent_jobs as u32;
        let drained = time::timeout(
            self.inner.config.shutdown_timeout(),
            self.inner.semaphore.acquire_many(max_permits),
        )
        .await;

        match drained {
            Ok(_) => tracing::info!("Processor stopped"),
            Err(_) => {
                tracing::warn!("Shutdown timeout elapsed with workers still in flight");
            }
        }
    }

    /// Check whether the loops are currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// The scheduled-jobs loop: poll for due jobs every tick and hand them to
/// workers.
async fn run_scheduled_loop(inner: Arc<ProcessorInner>, mut shutdown: watch::Receiver<bool>) {
    let mut ticker = time::interval(inner.config.polling_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                poll_scheduled(&inner, &shutdown).await;
            }
        }
    }

    tracing::debug!("Scheduled-jobs loop stopped");
}

/// One tick: fetch due jobs and dispatch each onto the worker pool.
///
/// Acquiring a permit awaits when the pool is full, so a saturated pool
/// stalls the tick instead of piling up tasks; leftovers are picked up by
/// later ticks.
async fn poll_scheduled(inner: &Arc<ProcessorInner>, shutdown: &watch::Receiver<bool>) {
    let jobs = match inner.storage.get_scheduled_jobs(inner.config.batch_size).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(error = %e, "Failed to fetch scheduled jobs");
            return;
        }
    };

    for job in jobs {
        if *shutdown.borrow() {
            return;
        }

        let permit = match Arc::clone(&inner.semaphore).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            let _permit = permit;
            execute_job(inner, job).await;
        });
    }
}

/// Run one job through dispatch, handler invocation, and outcome handling.
async fn execute_job(inner: Arc<ProcessorInner>, job: Job) {
    // The fetch window is read-committed: the job may have been cancelled,
    // deleted, or picked up by another worker since. Drop it silently unless
    // it is still scheduled.
    let current = match inner.storage.get_job(&job.id).await {
        Ok(Some(current)) => current,
        Ok(None) => return,
        Err(e) => {
            tracing::error!(job_id = %job.id, error = %e, "Failed to re-check job before dispatch");
            return;
        }
    };
    if current.state != JobState::Scheduled {
        tracing::debug!(job_id = %current.id, state = %current.state, "Dropping job no longer scheduled");
        return;
    }

    let mut job = current;
    job.state = JobState::Processing;
    job.started_at = Some(Utc::now());
    if let Err(e) = inner.storage.update_job(&job).await {
        tracing::error!(job_id = %job.id, error = %e, "Failed to mark job as processing");
        return;
    }

    tracing::info!(
        job_id = %job.id,
        job_type = %job.job_type,
        attempt = job.retry_count + 1,
        "Processing job"
    );

    let outcome = run_handler(&inner, &job).await;
    apply_outcome(&inner, job, outcome).await;
}

/// Resolve and invoke the handler, containing panics.
async fn run_handler(inner: &Arc<ProcessorInner>, job: &Job) -> JobOutcome {
    let Some(handler) = inner.registry.get(&job.job_type) else {
        return JobOutcome::failure_no_retry(format!(
            "no handler registered for job type '{}'",
            job.job_type
        ));
    };

    let payload = job.payload.clone();
    let cancel = inner.cancel.child_token();

    // The handler runs on its own task so a panic surfaces as a JoinError
    // and becomes a failure outcome instead of killing the worker.
    let invocation =
        tokio::spawn(async move { handler.execute(payload.as_deref(), cancel).await });

    match invocation.await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            let panic = e.into_panic();
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "opaque panic payload".to_string());
            JobOutcome::failure(format!("handler panicked: {message}"))
        }
        Err(_) => JobOutcome::failure("handler task was aborted"),
    }
}

/// Write the outcome back and cascade to continuations and batches.
async fn apply_outcome(inner: &Arc<ProcessorInner>, mut job: Job, outcome: JobOutcome) {
    match outcome {
        JobOutcome::Success { result } => {
            job.state = JobState::Succeeded;
            job.result = result;
            job.error_message = None;
            if let Err(e) = inner.storage.update_job(&job).await {
                tracing::error!(job_id = %job.id, error = %e, "Failed to record job success");
                return;
            }
            tracing::info!(job_id = %job.id, "Job succeeded");

            release_continuations(inner, &job.id).await;
            if let Some(batch_id) = job.batch_id.as_deref() {
                check_batch_completion(inner, batch_id).await;
            }
        }
        JobOutcome::Failure {
            error,
            retryable,
            retry_delay,
        } => {
            job.retry_count += 1;
            job.error_message = Some(error.clone());

            if retryable && job.retry_count <= job.max_retry_count {
                let delay = retry_delay.unwrap_or_else(|| inner.config.default_retry_delay());
                job.state = JobState::Scheduled;
                job.scheduled_at = Some(delayed_from_now(delay));
                if let Err(e) = inner.storage.update_job(&job).await {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to reschedule failed job");
                    return;
                }
                tracing::warn!(
                    job_id = %job.id,
                    error = %error,
                    retry = job.retry_count,
                    max_retries = job.max_retry_count,
                    "Job failed, retry scheduled"
                );
            } else {
                job.state = JobState::Abandoned;
                if let Err(e) = inner.storage.update_job(&job).await {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to abandon job");
                    return;
                }
                tracing::error!(
                    job_id = %job.id,
                    error = %error,
                    retries = job.retry_count,
                    "Job abandoned"
                );

                // An abandoned member still counts toward batch completion.
                if let Some(batch_id) = job.batch_id.as_deref() {
                    check_batch_completion(inner, batch_id).await;
                }
            }
        }
    }
}

/// Release every continuation awaiting the given parent.
async fn release_continuations(inner: &Arc<ProcessorInner>, parent_id: &str) {
    let children = match inner.storage.get_continuations(parent_id).await {
        Ok(children) => children,
        Err(e) => {
            tracing::error!(parent_id, error = %e, "Failed to fetch continuations");
            return;
        }
    };

    let now = Utc::now();
    for mut child in children {
        child.state = JobState::Scheduled;
        child.scheduled_at = Some(now);
        match inner.storage.update_job(&child).await {
            Ok(()) => {
                tracing::debug!(job_id = %child.id, parent_id, "Continuation released");
            }
            Err(e) => {
                tracing::error!(job_id = %child.id, parent_id, error = %e, "Failed to release continuation");
            }
        }
    }
}

/// Release the batch continuations once every regular member has terminated.
async fn check_batch_completion(inner: &Arc<ProcessorInner>, batch_id: &str) {
    match batch::release_completed_batch(inner.storage.as_ref(), batch_id).await {
        Ok(released) => {
            for job_id in released {
                tracing::debug!(job_id = %job_id, batch_id, "Batch continuation released");
            }
        }
        Err(e) => {
            tracing::error!(batch_id, error = %e, "Failed to evaluate batch completion");
        }
    }
}

/// `now + delay`, saturating at the far end of the calendar.
fn delayed_from_now(delay: std::time::Duration) -> DateTime<Utc> {
    let delay = chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::MAX);
    Utc::now()
        .checked_add_signed(delay)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
