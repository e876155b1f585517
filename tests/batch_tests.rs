//! Batch runner integration tests: background generation over the fixture
//! story, progress fan-out, cancellation and archiving.
#![cfg(feature = "batch")]

use screenplay_engine::core::batch::{
    BatchError, BatchRequest, BatchRunner, BatchState, EpisodeOutcome, ProgressEvent,
};
use screenplay_engine::core::config::EngineConfig;
use screenplay_engine::core::pipeline::ScriptEngine;
use screenplay_engine::core::tracker::MemoryStore;

const STORY: &str = "tests/fixtures/story.json";

fn make_runner(store: MemoryStore) -> BatchRunner {
    let engine = ScriptEngine::builder()
        .story_path(STORY)
        .with_store(Box::new(store))
        .build()
        .unwrap();
    BatchRunner::new(engine)
}

#[tokio::test]
async fn missing_outline_fails_only_its_episode() {
    let store = MemoryStore::new();
    let runner = make_runner(store.clone());
    let mut handle = runner.start(BatchRequest::new(3, 5)).await.unwrap();
    let status = handle.task.await.unwrap();

    assert_eq!(status.state, BatchState::Completed);
    assert_eq!(status.total_episodes, 3);
    assert_eq!(status.completed_episodes, 2);
    assert_eq!(status.failed_episodes(), vec![4]);
    let outcomes: Vec<(u32, EpisodeOutcome)> =
        status.episodes.iter().map(|r| (r.episode, r.status)).collect();
    assert_eq!(
        outcomes,
        vec![
            (3, EpisodeOutcome::Completed),
            (4, EpisodeOutcome::Failed),
            (5, EpisodeOutcome::Completed),
        ]
    );
    assert!(status.episodes[1]
        .error
        .as_deref()
        .is_some_and(|e| e.contains('4')));

    // every episode produced a snapshot, then one final event
    let mut events = Vec::new();
    while let Ok(event) = handle.subscription.receiver.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 4);
    let last = events.last().unwrap();
    assert!(matches!(last, ProgressEvent::Completed(_)));
    assert_eq!(last.status().completed_episodes, 2);
    assert!((last.status().progress - 200.0 / 3.0).abs() < 1e-9);

    assert_eq!(runner.registry().get(&handle.batch_id).await, Some(status));

    // ledger saved once at the end with the highlights of both episodes
    let saved = store.contents().unwrap();
    assert!(saved.contains("立下一统百朝之志"));
    assert!(saved.contains("解锁气运画技"));
}

#[tokio::test]
async fn invalid_range_is_rejected() {
    let runner = make_runner(MemoryStore::new());
    assert!(matches!(
        runner.start(BatchRequest::new(5, 3)).await,
        Err(BatchError::InvalidRange(5, 3))
    ));
    assert!(runner.registry().ids().await.is_empty());
}

#[tokio::test]
async fn cancel_stops_between_episodes() {
    let runner = make_runner(MemoryStore::new());
    let engine = runner.engine();
    let guard = engine.lock().await;

    let handle = runner.start(BatchRequest::new(1, 5)).await.unwrap();
    assert!(runner.cancel(&handle.batch_id).await);
    drop(guard);

    let status = handle.task.await.unwrap();
    assert_eq!(status.state, BatchState::Cancelled);
    assert!(status.episodes.len() <= 1);
    assert!(!runner.cancel(&handle.batch_id).await);
}

#[tokio::test]
async fn archived_batch_writes_scripts() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        output_dir: dir.path().join("output"),
        ..EngineConfig::default()
    };
    let engine = ScriptEngine::builder()
        .config(config)
        .story_path(STORY)
        .with_store(Box::new(MemoryStore::new()))
        .build()
        .unwrap();
    let runner = BatchRunner::new(engine);

    let handle = runner.start(BatchRequest::new(1, 3).archived()).await.unwrap();
    let status = handle.task.await.unwrap();
    assert_eq!(status.completed_episodes, 3);

    let engine = runner.engine();
    let engine = engine.lock().await;
    assert_eq!(engine.archive().list().unwrap(), vec![1, 2, 3]);
    assert!(engine.validate_archived(2).is_valid());
}

#[tokio::test]
async fn late_subscriber_sees_final_event() {
    let runner = make_runner(MemoryStore::new());
    let engine = runner.engine();
    let guard = engine.lock().await;

    let handle = runner.start(BatchRequest::new(3, 3)).await.unwrap();
    let mut late = runner.hub().subscribe(&handle.batch_id).await;
    drop(guard);

    let status = handle.task.await.unwrap();
    let mut last = None;
    while let Ok(event) = late.receiver.try_recv() {
        last = Some(event);
    }
    let last = last.unwrap();
    assert!(last.is_final());
    assert_eq!(last.status(), &status);
}

#[tokio::test]
async fn finished_batch_releases_its_subscribers() {
    let runner = make_runner(MemoryStore::new());
    let mut handle = runner.start(BatchRequest::new(1, 2)).await.unwrap();
    assert_eq!(runner.hub().subscriber_count(&handle.batch_id).await, 1);
    handle.task.await.unwrap();

    assert_eq!(runner.hub().subscriber_count(&handle.batch_id).await, 0);
    let mut last = None;
    while let Some(event) = handle.subscription.receiver.recv().await {
        last = Some(event);
    }
    assert!(last.is_some_and(|e| e.is_final()));
}
