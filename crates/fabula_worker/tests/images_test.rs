//! Image retry scheduler tests.

mod test_utils;

use chrono::{Duration, Utc};
use fabula_core::{ImageJobStatus, ImagePipelineState, ImageStatus};
use fabula_interface::StoryStore;
use fabula_storage::FileSystemStorage;
use fabula_worker::{ImageConfig, ImageScheduler, ImageTickReport, InMemoryStoryStore};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use test_utils::{FlakyStoryStore, MockImageService, new_story, story_with_image};
use tokio::sync::watch;
use uuid::Uuid;

fn scheduler(stories: &InMemoryStoryStore, service: &Arc<MockImageService>) -> ImageScheduler {
    ImageScheduler::new(
        Arc::new(stories.clone()),
        service.clone(),
        ImageConfig::default(),
    )
}

fn stalled(retry_count: i32, minutes_ago: i64) -> ImagePipelineState {
    ImagePipelineState {
        retry_count,
        last_attempt_at: Some(Utc::now() - Duration::minutes(minutes_ago)),
        generation_prompt: Some("lanterns over a moving bridge".to_string()),
        ..Default::default()
    }
}

fn in_flight(job_id: &str) -> ImagePipelineState {
    ImagePipelineState {
        status: ImageStatus::Generating,
        external_job_id: Some(job_id.to_string()),
        last_attempt_at: Some(Utc::now()),
        generation_prompt: Some("lanterns over a moving bridge".to_string()),
        ..Default::default()
    }
}

fn finished(url: Option<&str>) -> ImageJobStatus {
    ImageJobStatus {
        done: true,
        faulted: false,
        queue_position: None,
        image_url: url.map(str::to_string),
    }
}

#[tokio::test]
async fn stalled_image_past_backoff_is_resubmitted() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new());
    let story = story_with_image(&stories, stalled(2, 90), 600).await;

    let report = scheduler(&stories, &service).tick().await.unwrap().unwrap();
    assert_eq!(report.resubmitted, 1);

    let story = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(story.image.status, ImageStatus::Generating);
    assert_eq!(story.image.retry_count, 3);
    assert!(story.image.external_job_id.is_some());
    assert_eq!(service.submitted(), vec!["lanterns over a moving bridge"]);
}

#[tokio::test]
async fn stalled_image_inside_backoff_waits() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new());
    let story = story_with_image(&stories, stalled(2, 30), 600).await;

    let report = scheduler(&stories, &service).tick().await.unwrap().unwrap();
    assert_eq!(report, ImageTickReport::default());

    let story = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(story.image.status, ImageStatus::None);
    assert_eq!(story.image.retry_count, 2);
    assert!(service.submitted().is_empty());
}

#[tokio::test]
async fn exhausted_retries_are_never_resubmitted() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new());
    story_with_image(&stories, stalled(5, 10_000), 20_000).await;

    let report = scheduler(&stories, &service).tick().await.unwrap().unwrap();
    assert_eq!(report.resubmitted, 0);
    assert!(service.submitted().is_empty());
}

#[tokio::test]
async fn unattempted_image_uses_creation_time() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new());
    let mut state = stalled(0, 0);
    state.last_attempt_at = None;
    let old = story_with_image(&stories, state.clone(), 15).await;
    let fresh = story_with_image(&stories, state, 5).await;

    let report = scheduler(&stories, &service).tick().await.unwrap().unwrap();
    assert_eq!(report.resubmitted, 1);

    let old = stories.get_story(old.id).await.unwrap().unwrap();
    let fresh = stories.get_story(fresh.id).await.unwrap().unwrap();
    assert_eq!(old.image.status, ImageStatus::Generating);
    assert_eq!(fresh.image.status, ImageStatus::None);
}

#[tokio::test]
async fn story_without_prompt_is_ignored() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new());
    let mut state = stalled(0, 600);
    state.generation_prompt = None;
    story_with_image(&stories, state, 600).await;

    let report = scheduler(&stories, &service).tick().await.unwrap().unwrap();
    assert_eq!(report.resubmitted, 0);
}

#[tokio::test]
async fn rejected_resubmission_stays_none_and_restarts_backoff() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new().rejecting_next());
    let story = story_with_image(&stories, stalled(1, 45), 600).await;
    let images = scheduler(&stories, &service);

    let report = images.tick().await.unwrap().unwrap();
    assert_eq!(report.resubmitted, 1);

    let after = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(after.image.status, ImageStatus::None);
    assert_eq!(after.image.retry_count, 2);
    assert!(after.image.last_attempt_at.unwrap() > Utc::now() - Duration::minutes(1));

    // The next step of the table (60 minutes) has not elapsed
    let report = images.tick().await.unwrap().unwrap();
    assert_eq!(report.resubmitted, 0);
}

#[tokio::test]
async fn submit_records_prompt_even_when_rejected() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new().rejecting_next());
    let story = new_story(&stories).await;

    let status = scheduler(&stories, &service)
        .submit(story.id, "a cartographer's desk")
        .await
        .unwrap();
    assert_eq!(status, ImageStatus::None);

    let story = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(
        story.image.generation_prompt.as_deref(),
        Some("a cartographer's desk")
    );
    assert_eq!(story.image.retry_count, 0);
    assert!(story.image.last_attempt_at.is_some());
}

#[tokio::test]
async fn submit_never_moves_generating_back() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new());
    let story = story_with_image(&stories, in_flight("img-9"), 5).await;

    let status = scheduler(&stories, &service)
        .submit(story.id, "another prompt")
        .await
        .unwrap();
    assert_eq!(status, ImageStatus::Generating);
    assert!(service.submitted().is_empty());

    let story = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(story.image.external_job_id.as_deref(), Some("img-9"));
}

#[tokio::test]
async fn finished_image_is_copied_to_durable_storage() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileSystemStorage::new(dir.path())
        .unwrap()
        .with_public_base_url("https://cdn.example.test/media/");
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(
        MockImageService::new().with_status(Some(finished(Some("https://tmp.example/x.png")))),
    );
    let story = story_with_image(&stories, in_flight("img-1"), 5).await;

    let report = scheduler(&stories, &service)
        .with_storage(Arc::new(storage))
        .tick()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(report.polled, 1);
    assert_eq!(report.completed, 1);

    let story = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(story.image.status, ImageStatus::Completed);
    let url = story.image.image_url.unwrap();
    assert!(url.starts_with("https://cdn.example.test/media/covers/"));
    assert!(url.ends_with(".png"));
}

#[tokio::test]
async fn transfer_failure_keeps_transient_url() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileSystemStorage::new(dir.path()).unwrap();
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(
        MockImageService::new()
            .with_status(Some(finished(Some("https://tmp.example/x.png"))))
            .with_failing_fetch(),
    );
    let story = story_with_image(&stories, in_flight("img-1"), 5).await;

    scheduler(&stories, &service)
        .with_storage(Arc::new(storage))
        .tick()
        .await
        .unwrap();

    let story = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(story.image.status, ImageStatus::Completed);
    assert_eq!(
        story.image.image_url.as_deref(),
        Some("https://tmp.example/x.png")
    );
}

#[tokio::test]
async fn done_without_result_fails() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new().with_status(Some(finished(None))));
    let story = story_with_image(&stories, in_flight("img-1"), 5).await;

    let report = scheduler(&stories, &service).tick().await.unwrap().unwrap();
    assert_eq!(report.failed, 1);

    let story = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(story.image.status, ImageStatus::Failed);
    assert!(story.image.image_url.is_none());
}

#[tokio::test]
async fn faulted_job_fails() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new().with_status(Some(ImageJobStatus {
        faulted: true,
        ..Default::default()
    })));
    let story = story_with_image(&stories, in_flight("img-1"), 5).await;

    scheduler(&stories, &service).tick().await.unwrap();

    let story = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(story.image.status, ImageStatus::Failed);
}

#[tokio::test]
async fn queued_job_stays_generating() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new().with_status(Some(ImageJobStatus {
        queue_position: Some(4),
        ..Default::default()
    })));
    let story = story_with_image(&stories, in_flight("img-1"), 5).await;

    let report = scheduler(&stories, &service).tick().await.unwrap().unwrap();
    assert_eq!(report.polled, 1);
    assert_eq!(report.completed + report.failed, 0);

    let after = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(after.image, story.image);
}

#[tokio::test]
async fn poll_error_leaves_state_unchanged() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new().with_status(None));
    let story = story_with_image(&stories, in_flight("img-1"), 5).await;

    scheduler(&stories, &service).tick().await.unwrap();

    let after = stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(after.image.status, ImageStatus::Generating);
}

#[tokio::test]
async fn submit_for_unknown_story_is_an_error() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new());
    let result = scheduler(&stories, &service)
        .submit(Uuid::new_v4(), "prompt")
        .await;
    assert!(result.is_err());
    assert!(service.submitted().is_empty());
}

#[tokio::test]
async fn one_unsaved_story_does_not_abort_the_tick() {
    let stories = InMemoryStoryStore::new();
    let flaky = Arc::new(FlakyStoryStore::new(stories.clone()));
    let service = Arc::new(
        MockImageService::new().with_status(Some(finished(Some("https://img.test/tmp.png")))),
    );

    let stuck_in_flight = story_with_image(&stories, in_flight("img-a"), 600).await;
    let in_flight_ok = story_with_image(&stories, in_flight("img-b"), 600).await;
    let stuck_stalled = story_with_image(&stories, stalled(2, 90), 600).await;
    let stalled_ok = story_with_image(&stories, stalled(2, 90), 600).await;
    flaky.break_image_updates(stuck_in_flight.id);
    flaky.break_image_updates(stuck_stalled.id);

    let scheduler = ImageScheduler::new(flaky.clone(), service.clone(), ImageConfig::default());
    let report = scheduler.tick().await.unwrap().unwrap();

    assert_eq!(report.polled, 2);
    assert_eq!(report.completed, 1);
    assert_eq!(report.resubmitted, 1);

    let status = |id| {
        let stories = stories.clone();
        async move { stories.get_story(id).await.unwrap().unwrap().image.status }
    };
    assert_eq!(status(stuck_in_flight.id).await, ImageStatus::Generating);
    assert_eq!(status(in_flight_ok.id).await, ImageStatus::Completed);
    assert_eq!(status(stuck_stalled.id).await, ImageStatus::None);
    assert_eq!(status(stalled_ok.id).await, ImageStatus::Generating);
}

#[tokio::test]
async fn run_exits_when_shutdown_sender_is_dropped() {
    let stories = InMemoryStoryStore::new();
    let service = Arc::new(MockImageService::new());
    let scheduler = Arc::new(scheduler(&stories, &service));

    let (tx, rx) = watch::channel(false);
    drop(tx);

    let finished = tokio::time::timeout(StdDuration::from_secs(1), scheduler.run(rx)).await;
    assert!(finished.is_ok(), "image loop kept running without a sender");
}
