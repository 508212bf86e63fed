//! Shared test helpers for integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use jobhub::{
    HandlerRegistry, Job, JobClient, JobHandler, JobOutcome, JobProcessor, JobState, JobStorage,
    MemoryStorage, ProcessorConfig,
};

/// Test engine context: shared storage, a client, and a running processor.
pub struct TestEngine {
    /// In-memory backend shared by the client and the processor.
    pub storage: Arc<MemoryStorage>,
    /// Submission client.
    pub client: JobClient,
    /// The processor under test.
    pub processor: JobProcessor,
}

impl TestEngine {
    /// Build an engine with millisecond polling cadence, without starting
    /// the processor. Use when submissions must land before the first poll.
    pub fn new(registry: HandlerRegistry) -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let client = JobClient::new(storage.clone());
        let processor = JobProcessor::new(storage.clone(), registry, fast_config());

        Self {
            storage,
            client,
            processor,
        }
    }

    /// Build an engine and start the processor immediately.
    pub async fn start(registry: HandlerRegistry) -> Self {
        let engine = Self::new(registry);
        engine.processor.start().await;
        engine
    }

    /// Poll until the job reaches the given state, panicking on timeout.
    pub async fn wait_for_state(&self, id: &str, state: JobState) -> Job {
        wait_for_state(&self.storage, id, state).await
    }
}

/// Processor configuration tightened for tests.
pub fn fast_config() -> ProcessorConfig {
    ProcessorConfig {
        max_concurrent_jobs: 4,
        polling_interval_ms: 20,
        recurring_polling_interval_ms: 25,
        batch_size: 100,
        default_retry_delay_ms: 10,
        shutdown_timeout_ms: 2_000,
    }
}

/// Poll the store until the job reaches the given state, panicking after
/// five seconds.
pub async fn wait_for_state(storage: &MemoryStorage, id: &str, state: JobState) -> Job {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(job) = storage.get_job(id).await.expect("storage read failed") {
            if job.state == state {
                return job;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job '{id}' did not reach state '{state}' in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Handler that always succeeds with `"ok"`.
#[derive(Debug)]
pub struct EchoHandler;

#[async_trait]
impl JobHandler for EchoHandler {
    fn job_type(&self) -> &str {
        "echo"
    }

    async fn execute(&self, _payload: Option<&str>, _cancel: CancellationToken) -> JobOutcome {
        JobOutcome::success_with("ok")
    }
}

/// Handler that always fails with a configurable retry policy.
#[derive(Debug)]
pub struct FailingHandler {
    pub error: String,
    pub retryable: bool,
    pub retry_delay: Option<Duration>,
}

impl FailingHandler {
    pub fn retryable(error: &str, retry_delay: Duration) -> Self {
        Self {
            error: error.to_string(),
            retryable: true,
            retry_delay: Some(retry_delay),
        }
    }

    pub fn fatal(error: &str) -> Self {
        Self {
            error: error.to_string(),
            retryable: false,
            retry_delay: None,
        }
    }
}

#[async_trait]
impl JobHandler for FailingHandler {
    fn job_type(&self) -> &str {
        "failing"
    }

    async fn execute(&self, _payload: Option<&str>, _cancel: CancellationToken) -> JobOutcome {
        let mut outcome = if self.retryable {
            JobOutcome::failure(&self.error)
        } else {
            JobOutcome::failure_no_retry(&self.error)
        };
        if let Some(delay) = self.retry_delay {
            outcome = outcome.with_retry_delay(delay);
        }
        outcome
    }
}

/// Handler that sleeps before succeeding, for in-flight observations.
#[derive(Debug)]
pub struct SlowHandler {
    pub duration: Duration,
}

#[async_trait]
impl JobHandler for SlowHandler {
    fn job_type(&self) -> &str {
        "slow"
    }

    async fn execute(&self, _payload: Option<&str>, _cancel: CancellationToken) -> JobOutcome {
        tokio::time::sleep(self.duration).await;
        JobOutcome::success()
    }
}

/// Registry preloaded with the echo handler.
pub fn echo_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(EchoHandler));
    registry
}
