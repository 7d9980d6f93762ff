//! Worker server lifecycle tests.

mod test_utils;

use fabula_cache::{CacheConfig, InMemoryTranslationStore, TranslationCache};
use fabula_core::JobStatus;
use fabula_error::{FabulaErrorKind, WorkerErrorKind};
use fabula_interface::JobStore;
use fabula_worker::{
    ChapterQueue, ImageConfig, ImageScheduler, InMemoryJobStore, InMemoryStoryStore,
    QueueConfig, WorkerServer,
};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{CountingJobStore, MockGenerator, MockImageService, eventually, new_story};
use tokio::sync::Semaphore;

fn queue(jobs: &InMemoryJobStore, stories: &InMemoryStoryStore, generator: MockGenerator) -> Arc<ChapterQueue> {
    // Long idle interval: only an enqueue wakes the loop
    let config = QueueConfig::default()
        .with_idle_interval_secs(60)
        .with_busy_interval_secs(0);
    Arc::new(ChapterQueue::new(
        Arc::new(jobs.clone()),
        Arc::new(stories.clone()),
        Arc::new(generator),
        config,
    ))
}

fn is_worker_error(err: &fabula_error::FabulaError, expected: WorkerErrorKind) -> bool {
    matches!(err.kind(), FabulaErrorKind::Worker(e) if e.kind == expected)
}

#[tokio::test]
async fn start_and_stop_transitions() {
    let jobs = InMemoryJobStore::new();
    let stories = InMemoryStoryStore::new();
    let mut server = WorkerServer::new(queue(&jobs, &stories, MockGenerator::new()));

    assert!(!server.is_running());
    let err = server.stop().await.unwrap_err();
    assert!(is_worker_error(&err, WorkerErrorKind::NotRunning));

    server.start().await.unwrap();
    assert!(server.is_running());
    let err = server.start().await.unwrap_err();
    assert!(is_worker_error(&err, WorkerErrorKind::AlreadyRunning));

    server.stop().await.unwrap();
    assert!(!server.is_running());

    // Restartable after a clean stop
    server.start().await.unwrap();
    server.stop().await.unwrap();
}

#[tokio::test]
async fn enqueue_wakes_running_server() {
    let jobs = InMemoryJobStore::new();
    let stories = InMemoryStoryStore::new();
    let queue = queue(&jobs, &stories, MockGenerator::new());
    let images = Arc::new(ImageScheduler::new(
        Arc::new(stories.clone()),
        Arc::new(MockImageService::new()),
        ImageConfig::default(),
    ));
    let cache = TranslationCache::new(
        Arc::new(InMemoryTranslationStore::new()),
        CacheConfig::default(),
    );
    let mut server = WorkerServer::new(queue.clone())
        .with_images(images)
        .with_cache_sweep(cache);
    server.start().await.unwrap();

    let story = new_story(&stories).await;
    let job = queue.enqueue_creation(story.id).await.unwrap();

    let completed = eventually(|| {
        let jobs = jobs.clone();
        async move {
            jobs.get_job(job.id)
                .await
                .unwrap()
                .is_some_and(|j| j.status == JobStatus::Completed)
        }
    })
    .await;
    assert!(completed);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn stop_waits_for_in_flight_job() {
    let jobs = InMemoryJobStore::new();
    let stories = InMemoryStoryStore::new();
    let gate = Arc::new(Semaphore::new(0));
    let queue = queue(&jobs, &stories, MockGenerator::new().gated(gate.clone()));
    let mut server = WorkerServer::new(queue.clone());

    let story = new_story(&stories).await;
    let job = queue.enqueue_creation(story.id).await.unwrap();
    server.start().await.unwrap();

    let watched = queue.clone();
    assert!(
        eventually(|| {
            let watched = watched.clone();
            async move { watched.is_busy() }
        })
        .await
    );

    let stopping = tokio::spawn(async move {
        let result = server.stop().await;
        (server, result)
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(!stopping.is_finished());

    gate.add_permits(1);
    let (server, result) = stopping.await.unwrap();
    result.unwrap();
    assert!(!server.is_running());

    let job = jobs.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
}

#[tokio::test]
async fn start_recovers_interrupted_jobs() {
    let jobs = InMemoryJobStore::new();
    let stories = InMemoryStoryStore::new();
    let queue = queue(&jobs, &stories, MockGenerator::new());
    let story = new_story(&stories).await;
    let job = queue.enqueue_creation(story.id).await.unwrap();
    jobs.claim_next(3).await.unwrap();

    let mut server = WorkerServer::new(queue);
    server.start().await.unwrap();

    let completed = eventually(|| {
        let jobs = jobs.clone();
        async move {
            jobs.get_job(job.id)
                .await
                .unwrap()
                .is_some_and(|j| j.status == JobStatus::Completed)
        }
    })
    .await;
    assert!(completed);
    server.stop().await.unwrap();
}

#[tokio::test]
async fn dropping_a_running_server_stops_its_loops() {
    let jobs = Arc::new(CountingJobStore::new(InMemoryJobStore::new()));
    let stories = InMemoryStoryStore::new();
    let queue = Arc::new(ChapterQueue::new(
        jobs.clone(),
        Arc::new(stories.clone()),
        Arc::new(MockGenerator::new()),
        QueueConfig::default()
            .with_idle_interval_secs(60)
            .with_busy_interval_secs(0),
    ));
    let mut server = WorkerServer::new(queue);
    server.start().await.unwrap();

    let claimed = jobs.clone();
    assert!(eventually(move || {
        let claimed = claimed.clone();
        async move { claimed.claims() >= 1 }
    })
    .await);

    drop(server);
    tokio::time::sleep(Duration::from_millis(200)).await;
    let settled = jobs.claims();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(jobs.claims(), settled);
    assert!(settled <= 2);
}
