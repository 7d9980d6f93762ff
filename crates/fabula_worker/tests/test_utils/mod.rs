//! Test utilities for worker tests.
//!
//! Mock model and image clients plus helpers for seeding the in-memory stores.

#![allow(dead_code)]

pub mod mocks;
pub mod stores;

pub use mocks::{MockGenerator, MockImageService, MockTranslator};
pub use stores::{CountingJobStore, FlakyStoryStore};

use chrono::{Duration, Utc};
use fabula_core::{
    Chapter, ImagePipelineState, Message, NewChapter, NewStoryBuilder, Story, StoryProgress,
};
use fabula_interface::StoryStore;
use fabula_worker::InMemoryStoryStore;

/// Create an English story with no chapters.
pub async fn new_story(stories: &InMemoryStoryStore) -> Story {
    stories
        .create_story(
            NewStoryBuilder::default()
                .premise("A cartographer maps a city that rearranges itself at night")
                .genre(Some("fantasy".to_string()))
                .build()
                .unwrap(),
        )
        .await
        .unwrap()
}

/// Create a story whose image pipeline is in `image`, created `age_minutes` ago.
pub async fn story_with_image(
    stories: &InMemoryStoryStore,
    image: ImagePipelineState,
    age_minutes: i64,
) -> Story {
    let mut story = new_story(stories).await;
    story.image = image;
    story.created_at = Utc::now() - Duration::minutes(age_minutes);
    stories.replace(story.clone()).await;
    story
}

/// Persist chapter 1 of `story` with `body`.
pub async fn seed_chapter(stories: &InMemoryStoryStore, story: &Story, body: &str) -> Chapter {
    stories
        .record_chapter(
            NewChapter {
                story_id: story.id,
                chapter_number: 1,
                title: "The First Night".to_string(),
                body: body.to_string(),
                metadata: None,
            },
            StoryProgress {
                history: vec![Message::user("begin"), Message::assistant(body)],
                chapter_count: 1,
                title: Some("The Shifting City".to_string()),
            },
        )
        .await
        .unwrap()
}

/// Poll `check` every 10ms for up to two seconds.
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    false
}
