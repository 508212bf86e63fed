//! Integration tests for job execution, retry policy, and continuations.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use jobhub::{
    HandlerRegistry, JobOutcome, JobState, JobStorage, PayloadHandler, TypedHandler,
};

use helpers::{FailingHandler, TestEngine, echo_registry};

#[tokio::test]
async fn fire_and_forget_job_succeeds() {
    let engine = TestEngine::start(echo_registry()).await;

    let id = engine.client.enqueue("echo", &"x", 3).await.unwrap();
    let job = engine.wait_for_state(&id, JobState::Succeeded).await;

    assert_eq!(job.result.as_deref(), Some("ok"));
    assert_eq!(job.retry_count, 0);
    assert!(job.started_at.is_some());

    engine.processor.stop().await;
}

#[tokio::test]
async fn retryable_failure_exhausts_its_budget() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(FailingHandler::retryable(
        "boom",
        Duration::from_millis(10),
    )));
    let engine = TestEngine::start(registry).await;

    let id = engine.client.enqueue("failing", &"x", 2).await.unwrap();
    let job = engine.wait_for_state(&id, JobState::Abandoned).await;

    assert_eq!(job.retry_count, 3);
    assert_eq!(job.error_message.as_deref(), Some("boom"));

    engine.processor.stop().await;
}

#[tokio::test]
async fn non_retryable_failure_abandons_on_the_first_attempt() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(FailingHandler::fatal("bad")));
    let engine = TestEngine::start(registry).await;

    let id = engine.client.enqueue("failing", &"x", 5).await.unwrap();
    let job = engine.wait_for_state(&id, JobState::Abandoned).await;

    assert_eq!(job.retry_count, 1);
    assert_eq!(job.error_message.as_deref(), Some("bad"));

    engine.processor.stop().await;
}

#[tokio::test]
async fn continuation_fires_after_its_parent() {
    let engine = TestEngine::new(echo_registry());

    // Both jobs are persisted before the first poll so the parent cannot
    // succeed before its continuation exists.
    let parent = engine.client.enqueue("echo", &"p", 0).await.unwrap();
    let child = engine
        .client
        .continue_with(&parent, "echo", &"c", 0)
        .await
        .unwrap();
    engine.processor.start().await;

    engine.wait_for_state(&parent, JobState::Succeeded).await;
    let child_job = engine.wait_for_state(&child, JobState::Succeeded).await;

    assert_eq!(child_job.parent_id.as_deref(), Some(parent.as_str()));

    engine.processor.stop().await;
}

#[tokio::test]
async fn cancelled_job_is_never_dispatched() {
    let engine = TestEngine::start(echo_registry()).await;

    let id = engine
        .client
        .schedule_in("echo", &"x", Duration::from_secs(3600), 0)
        .await
        .unwrap();
    assert!(engine.client.cancel_job(&id).await.unwrap());

    // Give the polling loop a few ticks to prove it leaves the job alone.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let job = engine.storage.get_job(&id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Cancelled);
    assert!(job.started_at.is_none());

    engine.processor.stop().await;
}

#[tokio::test]
async fn missing_handler_abandons_the_job() {
    let engine = TestEngine::start(echo_registry()).await;

    let id = engine.client.enqueue("unregistered", &"x", 4).await.unwrap();
    let job = engine.wait_for_state(&id, JobState::Abandoned).await;

    assert_eq!(job.retry_count, 1);
    assert!(job
        .error_message
        .as_deref()
        .unwrap()
        .contains("no handler registered"));

    engine.processor.stop().await;
}

#[derive(Debug, Deserialize)]
struct ReportArgs {
    region: String,
    week: u32,
}

#[derive(Debug)]
struct ReportHandler;

#[async_trait]
impl PayloadHandler for ReportHandler {
    type Args = ReportArgs;

    fn job_type(&self) -> &str {
        "report"
    }

    async fn handle(&self, args: ReportArgs, _cancel: CancellationToken) -> JobOutcome {
        JobOutcome::success_with(format!("{}-{}", args.region, args.week))
    }
}

#[tokio::test]
async fn typed_handler_receives_decoded_arguments() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(TypedHandler::new(ReportHandler)));
    let engine = TestEngine::start(registry).await;

    let id = engine
        .client
        .enqueue(
            "report",
            &serde_json::json!({"region": "emea", "week": 12}),
            0,
        )
        .await
        .unwrap();
    let job = engine.wait_for_state(&id, JobState::Succeeded).await;

    assert_eq!(job.result.as_deref(), Some("emea-12"));

    engine.processor.stop().await;
}

#[tokio::test]
async fn mismatched_payload_is_not_retried() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(TypedHandler::new(ReportHandler)));
    let engine = TestEngine::start(registry).await;

    let id = engine
        .client
        .enqueue("report", &serde_json::json!({"unexpected": true}), 5)
        .await
        .unwrap();
    let job = engine.wait_for_state(&id, JobState::Abandoned).await;

    // One attempt only: a malformed payload never becomes valid by retrying.
    assert_eq!(job.retry_count, 1);

    engine.processor.stop().await;
}

#[tokio::test]
async fn start_is_idempotent_and_stop_halts_dispatch() {
    let engine = TestEngine::start(echo_registry()).await;

    // A second start while running is a no-op.
    engine.processor.start().await;
    assert!(engine.processor.is_running());

    engine.processor.stop().await;
    assert!(!engine.processor.is_running());

    // Jobs submitted after stop stay scheduled.
    let id = engine.client.enqueue("echo", &"x", 0).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let job = engine.storage.get_job(&id).await.unwrap().unwrap();
    assert_eq!(job.state, JobState::Scheduled);
}

#[tokio::test]
async fn jobs_processed_before_stop_complete() {
    let engine = TestEngine::start(echo_registry()).await;

    let mut ids = Vec::new();
    for i in 0..8 {
        ids.push(engine.client.enqueue("echo", &i, 0).await.unwrap());
    }
    for id in &ids {
        engine.wait_for_state(id, JobState::Succeeded).await;
    }

    engine.processor.stop().await;
    assert_eq!(
        engine
            .storage
            .get_job_count(JobState::Succeeded)
            .await
            .unwrap(),
        8
    );
}
