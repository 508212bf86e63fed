//! Integration tests for batches and batch continuations.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jobhub::{HandlerRegistry, Job, JobState, JobStorage};

use helpers::{EchoHandler, FailingHandler, SlowHandler, TestEngine, echo_registry};

#[tokio::test]
async fn batch_continuation_fires_after_every_member() {
    let engine = TestEngine::new(echo_registry());

    // Batch and continuation land before the first poll.
    let (batch_id, member_ids) = engine
        .client
        .enqueue_batch("echo", &["a", "b", "c"], 1)
        .await
        .unwrap();
    let continuation = engine
        .client
        .continue_batch_with(&batch_id, "echo", &"summary", 1)
        .await
        .unwrap();
    engine.processor.start().await;

    for id in &member_ids {
        engine.wait_for_state(id, JobState::Succeeded).await;
    }
    let continuation_job = engine
        .wait_for_state(&continuation, JobState::Succeeded)
        .await;

    // Released once, processed once.
    assert_eq!(continuation_job.retry_count, 0);
    assert_eq!(continuation_job.result.as_deref(), Some("ok"));
    assert_eq!(continuation_job.batch_id.as_deref(), Some(batch_id.as_str()));

    engine.processor.stop().await;
}

#[tokio::test]
async fn continuation_waits_while_members_are_in_flight() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(SlowHandler {
        duration: Duration::from_millis(300),
    }));
    let engine = TestEngine::new(registry);

    let (batch_id, member_ids) = engine
        .client
        .enqueue_batch("slow", &["a"], 0)
        .await
        .unwrap();
    let continuation = engine
        .client
        .continue_batch_with(&batch_id, "slow", &"summary", 0)
        .await
        .unwrap();
    engine.processor.start().await;

    // While the member sleeps, the continuation must still be waiting.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let waiting = engine.storage.get_job(&continuation).await.unwrap().unwrap();
    assert_eq!(waiting.state, JobState::AwaitingBatch);

    engine.wait_for_state(&member_ids[0], JobState::Succeeded).await;
    engine
        .wait_for_state(&continuation, JobState::Succeeded)
        .await;

    engine.processor.stop().await;
}

#[tokio::test]
async fn abandoned_member_still_completes_the_batch() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(EchoHandler));
    registry.register(Arc::new(FailingHandler::fatal("member down")));
    let engine = TestEngine::new(registry);

    // A mixed batch: two members that succeed and one that abandons.
    let now = Utc::now();
    let mut members = vec![
        Job::new("m-ok-1", "echo", None, JobState::Scheduled, 0),
        Job::new("m-ok-2", "echo", None, JobState::Scheduled, 0),
        Job::new("m-fail", "failing", None, JobState::Scheduled, 0),
    ];
    for member in &mut members {
        member.scheduled_at = Some(now);
    }
    engine
        .storage
        .store_batch("mixed-batch", &members)
        .await
        .unwrap();

    let continuation = engine
        .client
        .continue_batch_with("mixed-batch", "echo", &"summary", 0)
        .await
        .unwrap();
    engine.processor.start().await;

    engine.wait_for_state("m-ok-1", JobState::Succeeded).await;
    engine.wait_for_state("m-ok-2", JobState::Succeeded).await;
    engine.wait_for_state("m-fail", JobState::Abandoned).await;
    engine
        .wait_for_state(&continuation, JobState::Succeeded)
        .await;

    engine.processor.stop().await;
}

#[tokio::test]
async fn cancelling_the_last_pending_member_releases_the_continuation() {
    let engine = TestEngine::new(echo_registry());

    // One member runs immediately; the other is scheduled far out so it can
    // only leave the batch through cancellation.
    let now = Utc::now();
    let mut prompt = Job::new("m-prompt", "echo", None, JobState::Scheduled, 0);
    prompt.scheduled_at = Some(now);
    let mut deferred = Job::new("m-deferred", "echo", None, JobState::Scheduled, 0);
    deferred.scheduled_at = Some(now + chrono::Duration::hours(1));
    engine
        .storage
        .store_batch("cancel-batch", &[prompt, deferred])
        .await
        .unwrap();

    let continuation = engine
        .client
        .continue_batch_with("cancel-batch", "echo", &"summary", 0)
        .await
        .unwrap();
    engine.processor.start().await;

    engine.wait_for_state("m-prompt", JobState::Succeeded).await;
    let waiting = engine.storage.get_job(&continuation).await.unwrap().unwrap();
    assert_eq!(waiting.state, JobState::AwaitingBatch);

    // The cancel writes the batch's last terminal state.
    assert!(engine.client.cancel_job("m-deferred").await.unwrap());

    engine
        .wait_for_state(&continuation, JobState::Succeeded)
        .await;
    let cancelled = engine.storage.get_job("m-deferred").await.unwrap().unwrap();
    assert_eq!(cancelled.state, JobState::Cancelled);

    engine.processor.stop().await;
}

#[tokio::test]
async fn batch_member_jobs_carry_the_batch_id() {
    let engine = TestEngine::start(echo_registry()).await;

    let (batch_id, member_ids) = engine
        .client
        .enqueue_batch("echo", &["a", "b", "c"], 0)
        .await
        .unwrap();

    let members = engine.storage.get_batch_jobs(&batch_id).await.unwrap();
    assert_eq!(members.len(), 3);
    for id in &member_ids {
        assert!(members.iter().any(|job| &job.id == id));
    }

    engine.processor.stop().await;
}
