//! Store wrappers that count calls or fail on demand.

use async_trait::async_trait;
use fabula_core::{
    Chapter, GenerationJob, ImagePipelineState, ImageStatus, NewChapter, NewGenerationJob,
    NewStory, Story, StoryProgress,
};
use fabula_error::{DatabaseError, DatabaseErrorKind, FabulaResult};
use fabula_interface::{JobStore, StoryStore};
use fabula_worker::{InMemoryJobStore, InMemoryStoryStore};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Job store that counts claims and can refuse completions.
#[derive(Default)]
pub struct CountingJobStore {
    inner: InMemoryJobStore,
    claims: AtomicUsize,
    failing_completions: AtomicUsize,
}

impl CountingJobStore {
    /// Wrap `inner`.
    pub fn new(inner: InMemoryJobStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    /// Reject the next `count` completions with a query error.
    pub fn failing_completions(self, count: usize) -> Self {
        self.failing_completions.store(count, Ordering::SeqCst);
        self
    }

    /// Number of `claim_next` calls so far.
    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for CountingJobStore {
    async fn create_job(&self, job: NewGenerationJob) -> FabulaResult<GenerationJob> {
        self.inner.create_job(job).await
    }

    async fn claim_next(&self, max_attempts: i32) -> FabulaResult<Option<GenerationJob>> {
        self.claims.fetch_add(1, Ordering::SeqCst);
        self.inner.claim_next(max_attempts).await
    }

    async fn complete_job(&self, id: Uuid) -> FabulaResult<GenerationJob> {
        if self
            .failing_completions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(DatabaseError::new(DatabaseErrorKind::Connection(
                "connection reset".to_string(),
            ))
            .into());
        }
        self.inner.complete_job(id).await
    }

    async fn fail_job(&self, id: Uuid, error: &str, requeue: bool) -> FabulaResult<GenerationJob> {
        self.inner.fail_job(id, error, requeue).await
    }

    async fn get_job(&self, id: Uuid) -> FabulaResult<Option<GenerationJob>> {
        self.inner.get_job(id).await
    }

    async fn jobs_for_story(&self, story_id: Uuid) -> FabulaResult<Vec<GenerationJob>> {
        self.inner.jobs_for_story(story_id).await
    }

    async fn release_interrupted(&self, max_attempts: i32) -> FabulaResult<usize> {
        self.inner.release_interrupted(max_attempts).await
    }
}

/// Story store that refuses image updates for chosen stories.
pub struct FlakyStoryStore {
    inner: InMemoryStoryStore,
    broken: Mutex<Vec<Uuid>>,
}

impl FlakyStoryStore {
    /// Wrap `inner`.
    pub fn new(inner: InMemoryStoryStore) -> Self {
        Self {
            inner,
            broken: Mutex::new(Vec::new()),
        }
    }

    /// Fail every image update of `story_id`.
    pub fn break_image_updates(&self, story_id: Uuid) {
        self.broken.lock().unwrap().push(story_id);
    }
}

#[async_trait]
impl StoryStore for FlakyStoryStore {
    async fn create_story(&self, story: NewStory) -> FabulaResult<Story> {
        self.inner.create_story(story).await
    }

    async fn get_story(&self, id: Uuid) -> FabulaResult<Option<Story>> {
        self.inner.get_story(id).await
    }

    async fn record_chapter(
        &self,
        chapter: NewChapter,
        progress: StoryProgress,
    ) -> FabulaResult<Chapter> {
        self.inner.record_chapter(chapter, progress).await
    }

    async fn get_chapter(
        &self,
        story_id: Uuid,
        chapter_number: i32,
    ) -> FabulaResult<Option<Chapter>> {
        self.inner.get_chapter(story_id, chapter_number).await
    }

    async fn chapters(&self, story_id: Uuid) -> FabulaResult<Vec<Chapter>> {
        self.inner.chapters(story_id).await
    }

    async fn update_image_state(
        &self,
        story_id: Uuid,
        state: &ImagePipelineState,
    ) -> FabulaResult<()> {
        if self.broken.lock().unwrap().contains(&story_id) {
            return Err(
                DatabaseError::new(DatabaseErrorKind::Query("row locked".to_string())).into(),
            );
        }
        self.inner.update_image_state(story_id, state).await
    }

    async fn stories_with_image_status(&self, status: ImageStatus) -> FabulaResult<Vec<Story>> {
        self.inner.stories_with_image_status(status).await
    }
}
