//! Integration tests for the client surface against a live engine.

mod helpers;

use std::time::Duration;

use jobhub::{JobState, JobStorage};

use helpers::{TestEngine, echo_registry};

#[tokio::test]
async fn cancel_succeeds_only_while_scheduled() {
    let engine = TestEngine::start(echo_registry()).await;

    // Far-future job: cancellable.
    let pending = engine
        .client
        .schedule_in("echo", &"x", Duration::from_secs(3600), 0)
        .await
        .unwrap();
    assert!(engine.client.cancel_job(&pending).await.unwrap());

    // Completed job: not cancellable.
    let done = engine.client.enqueue("echo", &"x", 0).await.unwrap();
    engine.wait_for_state(&done, JobState::Succeeded).await;
    assert!(!engine.client.cancel_job(&done).await.unwrap());

    // Missing job: not cancellable.
    assert!(!engine.client.cancel_job("no-such-job").await.unwrap());

    engine.processor.stop().await;
}

#[tokio::test]
async fn job_counts_track_the_lifecycle() {
    let engine = TestEngine::start(echo_registry()).await;

    for i in 0..3 {
        let id = engine.client.enqueue("echo", &i, 0).await.unwrap();
        engine.wait_for_state(&id, JobState::Succeeded).await;
    }

    assert_eq!(
        engine.client.get_job_count(JobState::Succeeded).await.unwrap(),
        3
    );
    assert_eq!(
        engine.client.get_job_count(JobState::Scheduled).await.unwrap(),
        0
    );

    engine.processor.stop().await;
}

#[tokio::test]
async fn delete_job_is_idempotent_and_final() {
    let engine = TestEngine::start(echo_registry()).await;

    let id = engine.client.enqueue("echo", &"x", 0).await.unwrap();
    engine.wait_for_state(&id, JobState::Succeeded).await;

    engine.client.delete_job(&id).await.unwrap();
    engine.client.delete_job(&id).await.unwrap();
    assert!(engine.client.get_job(&id).await.unwrap().is_none());

    engine.processor.stop().await;
}

#[tokio::test]
async fn recurring_registration_upserts_in_place() {
    let engine = TestEngine::start(echo_registry()).await;

    engine
        .client
        .add_or_update_recurring("weekly", "echo", &"v1", "0 8 * * 1", 2)
        .await
        .unwrap();
    engine
        .client
        .add_or_update_recurring("weekly", "echo", &"v2", "0 9 * * 2", 5)
        .await
        .unwrap();

    let definitions = engine.storage.get_recurring_jobs().await.unwrap();
    assert_eq!(definitions.len(), 1);
    assert_eq!(definitions[0].cron_expression, "0 9 * * 2");
    assert_eq!(definitions[0].payload.as_deref(), Some(r#""v2""#));
    assert_eq!(definitions[0].max_retry_count, 5);

    engine.processor.stop().await;
}

#[tokio::test]
async fn scheduled_payloads_round_trip_through_storage() {
    let engine = TestEngine::start(echo_registry()).await;

    #[derive(serde::Serialize)]
    struct Invoice {
        number: u32,
        customer: String,
    }

    let id = engine
        .client
        .schedule_in(
            "echo",
            &Invoice {
                number: 17,
                customer: "acme".to_string(),
            },
            Duration::from_secs(3600),
            0,
        )
        .await
        .unwrap();

    let job = engine.client.get_job(&id).await.unwrap().unwrap();
    assert_eq!(
        job.payload.as_deref(),
        Some(r#"{"number":17,"customer":"acme"}"#)
    );
    assert_eq!(job.state, JobState::Scheduled);

    engine.processor.stop().await;
}
