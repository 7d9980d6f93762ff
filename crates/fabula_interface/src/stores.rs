//! Persistence traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabula_core::{
    CachedHash, Chapter, ConversationLog, GenerationJob, ImagePipelineState, ImageStatus,
    NewChapter, NewConversationLog, NewGenerationJob, NewStory, NewTranslationEntry, Story,
    StoryProgress, TranslationEntry, TranslationKey,
};
use fabula_error::FabulaResult;
use uuid::Uuid;

/// Durable queue of chapter generation jobs.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a `pending` job.
    ///
    /// At most one non-failed job exists per (story, chapter number): when one
    /// is already present it is returned instead of creating a duplicate.
    async fn create_job(&self, job: NewGenerationJob) -> FabulaResult<GenerationJob>;

    /// Atomically claim the oldest `pending` job with `attempts < max_attempts`.
    ///
    /// The returned job is `processing` with `attempts` incremented. Two
    /// concurrent callers never receive the same job.
    async fn claim_next(&self, max_attempts: i32) -> FabulaResult<Option<GenerationJob>>;

    /// `processing → completed`.
    async fn complete_job(&self, id: Uuid) -> FabulaResult<GenerationJob>;

    /// Record a failed attempt.
    ///
    /// With `requeue` the job returns to `pending` for another attempt,
    /// otherwise it becomes `failed`. The message is stored either way.
    async fn fail_job(&self, id: Uuid, error: &str, requeue: bool) -> FabulaResult<GenerationJob>;

    /// Look up a job.
    async fn get_job(&self, id: Uuid) -> FabulaResult<Option<GenerationJob>>;

    /// All jobs of a story, oldest first.
    async fn jobs_for_story(&self, story_id: Uuid) -> FabulaResult<Vec<GenerationJob>>;

    /// Return jobs stuck in `processing` to `pending`, or fail those out of
    /// attempts. Returns how many rows were touched.
    async fn release_interrupted(&self, max_attempts: i32) -> FabulaResult<usize>;
}

/// Stories, their chapters and their embedded image pipeline state.
#[async_trait]
pub trait StoryStore: Send + Sync {
    /// Create an empty story.
    async fn create_story(&self, story: NewStory) -> FabulaResult<Story>;

    /// Look up a story.
    async fn get_story(&self, id: Uuid) -> FabulaResult<Option<Story>>;

    /// Persist a chapter and the story aggregates in one unit of work.
    async fn record_chapter(
        &self,
        chapter: NewChapter,
        progress: StoryProgress,
    ) -> FabulaResult<Chapter>;

    /// Look up one chapter.
    async fn get_chapter(&self, story_id: Uuid, chapter_number: i32)
    -> FabulaResult<Option<Chapter>>;

    /// All chapters of a story in order.
    async fn chapters(&self, story_id: Uuid) -> FabulaResult<Vec<Chapter>>;

    /// Overwrite the image pipeline fields of a story.
    async fn update_image_state(&self, story_id: Uuid, state: &ImagePipelineState)
    -> FabulaResult<()>;

    /// Stories whose image pipeline is in `status`.
    async fn stories_with_image_status(&self, status: ImageStatus) -> FabulaResult<Vec<Story>>;
}

/// Backing table of the translation cache.
#[async_trait]
pub trait TranslationCacheStore: Send + Sync {
    /// The entry stored under `key`, expired or not.
    async fn find(&self, key: &TranslationKey) -> FabulaResult<Option<TranslationEntry>>;

    /// Hash and expiry of the entry under `key`, without the payload.
    async fn find_hash(&self, key: &TranslationKey) -> FabulaResult<Option<CachedHash>>;

    /// Insert or overwrite the entry under its key.
    async fn upsert(&self, entry: NewTranslationEntry) -> FabulaResult<TranslationEntry>;

    /// Delete every entry whose expiry is at or before `now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> FabulaResult<usize>;
}

/// Append-only audit trail of model exchanges.
#[async_trait]
pub trait ConversationLogStore: Send + Sync {
    /// Append one record.
    async fn append(&self, entry: NewConversationLog) -> FabulaResult<ConversationLog>;

    /// Records of one story, oldest first.
    async fn for_story(&self, story_id: Uuid) -> FabulaResult<Vec<ConversationLog>>;

    /// Every record.
    async fn all(&self) -> FabulaResult<Vec<ConversationLog>>;
}
