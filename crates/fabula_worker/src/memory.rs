//! In-memory stores.
//!
//! Each store keeps its rows behind a single `RwLock`, so every operation is
//! atomic with respect to the others, including `claim_next`. Used by tests
//! and by the CLI when no database is configured.

use async_trait::async_trait;
use chrono::Utc;
use fabula_core::{
    Chapter, ConversationLog, GenerationJob, ImagePipelineState, ImageStatus, JobStatus,
    NewChapter, NewConversationLog, NewGenerationJob, NewStory, Story, StoryProgress,
};
use fabula_error::{DatabaseError, DatabaseErrorKind, FabulaResult};
use fabula_interface::{ConversationLogStore, JobStore, StoryStore};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory [`JobStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<Vec<GenerationJob>>>,
}

impl InMemoryJobStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every job (for testing).
    pub async fn snapshot(&self) -> Vec<GenerationJob> {
        self.jobs.read().await.clone()
    }

    /// Overwrite a stored job (for testing).
    pub async fn replace(&self, job: GenerationJob) {
        let mut jobs = self.jobs.write().await;
        if let Some(slot) = jobs.iter_mut().find(|j| j.id == job.id) {
            *slot = job;
        }
    }
}

fn transition(
    jobs: &mut [GenerationJob],
    id: Uuid,
    next: JobStatus,
    error: Option<&str>,
) -> FabulaResult<GenerationJob> {
    let job = jobs
        .iter_mut()
        .find(|j| j.id == id && j.status == JobStatus::Processing)
        .ok_or_else(|| DatabaseError::not_found(format!("processing job {}", id)))?;

    job.status = next;
    if let Some(message) = error {
        job.error_message = Some(message.to_string());
    }
    job.updated_at = Utc::now();
    Ok(job.clone())
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn create_job(&self, job: NewGenerationJob) -> FabulaResult<GenerationJob> {
        let mut jobs = self.jobs.write().await;

        if let Some(existing) = jobs.iter().find(|j| {
            j.story_id == job.story_id
                && j.chapter_number == job.chapter_number
                && j.status != JobStatus::Failed
        }) {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let created = GenerationJob {
            id: Uuid::new_v4(),
            story_id: job.story_id,
            chapter_number: job.chapter_number,
            trigger: job.trigger,
            feedback: job.feedback,
            status: JobStatus::Pending,
            attempts: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        jobs.push(created.clone());
        Ok(created)
    }

    async fn claim_next(&self, max_attempts: i32) -> FabulaResult<Option<GenerationJob>> {
        let mut jobs = self.jobs.write().await;

        // Insertion order breaks created_at ties
        let next = jobs
            .iter_mut()
            .enumerate()
            .filter(|(_, j)| j.is_claimable(max_attempts))
            .min_by_key(|(index, j)| (j.created_at, *index))
            .map(|(_, j)| j);

        Ok(next.map(|job| {
            job.status = JobStatus::Processing;
            job.attempts += 1;
            job.updated_at = Utc::now();
            job.clone()
        }))
    }

    async fn complete_job(&self, id: Uuid) -> FabulaResult<GenerationJob> {
        transition(&mut self.jobs.write().await, id, JobStatus::Completed, None)
    }

    async fn fail_job(&self, id: Uuid, error: &str, requeue: bool) -> FabulaResult<GenerationJob> {
        let next = if requeue {
            JobStatus::Pending
        } else {
            JobStatus::Failed
        };
        transition(&mut self.jobs.write().await, id, next, Some(error))
    }

    async fn get_job(&self, id: Uuid) -> FabulaResult<Option<GenerationJob>> {
        Ok(self.jobs.read().await.iter().find(|j| j.id == id).cloned())
    }

    async fn jobs_for_story(&self, story_id: Uuid) -> FabulaResult<Vec<GenerationJob>> {
        Ok(self
            .jobs
            .read()
            .await
            .iter()
            .filter(|j| j.story_id == story_id)
            .cloned()
            .collect())
    }

    async fn release_interrupted(&self, max_attempts: i32) -> FabulaResult<usize> {
        let mut jobs = self.jobs.write().await;
        let now = Utc::now();
        let mut touched = 0;

        for job in jobs.iter_mut().filter(|j| j.status == JobStatus::Processing) {
            if job.attempts < max_attempts {
                job.status = JobStatus::Pending;
            } else {
                job.status = JobStatus::Failed;
                job.error_message = Some("interrupted while processing".to_string());
            }
            job.updated_at = now;
            touched += 1;
        }
        Ok(touched)
    }
}

/// In-memory [`StoryStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryStoryStore {
    inner: Arc<RwLock<StoryTables>>,
}

#[derive(Debug, Default)]
struct StoryTables {
    stories: HashMap<Uuid, Story>,
    chapters: Vec<Chapter>,
}

impl InMemoryStoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a stored story (for testing).
    pub async fn replace(&self, story: Story) {
        self.inner.write().await.stories.insert(story.id, story);
    }
}

#[async_trait]
impl StoryStore for InMemoryStoryStore {
    async fn create_story(&self, story: NewStory) -> FabulaResult<Story> {
        let now = Utc::now();
        let created = Story {
            id: Uuid::new_v4(),
            title: story.title,
            premise: story.premise,
            genre: story.genre,
            language: story.language,
            history: Vec::new(),
            chapter_count: 0,
            image: ImagePipelineState::default(),
            created_at: now,
            updated_at: now,
        };
        self.inner
            .write()
            .await
            .stories
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_story(&self, id: Uuid) -> FabulaResult<Option<Story>> {
        Ok(self.inner.read().await.stories.get(&id).cloned())
    }

    async fn record_chapter(
        &self,
        chapter: NewChapter,
        progress: StoryProgress,
    ) -> FabulaResult<Chapter> {
        let mut tables = self.inner.write().await;

        if tables
            .chapters
            .iter()
            .any(|c| c.story_id == chapter.story_id && c.chapter_number == chapter.chapter_number)
        {
            return Err(DatabaseError::new(DatabaseErrorKind::Query(format!(
                "chapter {} of story {} already exists",
                chapter.chapter_number, chapter.story_id
            )))
            .into());
        }

        let now = Utc::now();
        let story = tables
            .stories
            .get_mut(&chapter.story_id)
            .ok_or_else(|| DatabaseError::not_found(format!("story {}", chapter.story_id)))?;
        story.history = progress.history;
        story.chapter_count = progress.chapter_count;
        if story.title.is_none() {
            story.title = progress.title;
        }
        story.updated_at = now;

        let stored = Chapter {
            id: Uuid::new_v4(),
            story_id: chapter.story_id,
            chapter_number: chapter.chapter_number,
            title: chapter.title,
            body: chapter.body,
            metadata: chapter.metadata,
            created_at: now,
        };
        tables.chapters.push(stored.clone());
        Ok(stored)
    }

    async fn get_chapter(
        &self,
        story_id: Uuid,
        chapter_number: i32,
    ) -> FabulaResult<Option<Chapter>> {
        Ok(self
            .inner
            .read()
            .await
            .chapters
            .iter()
            .find(|c| c.story_id == story_id && c.chapter_number == chapter_number)
            .cloned())
    }

    async fn chapters(&self, story_id: Uuid) -> FabulaResult<Vec<Chapter>> {
        let mut chapters: Vec<Chapter> = self
            .inner
            .read()
            .await
            .chapters
            .iter()
            .filter(|c| c.story_id == story_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| c.chapter_number);
        Ok(chapters)
    }

    async fn update_image_state(
        &self,
        story_id: Uuid,
        state: &ImagePipelineState,
    ) -> FabulaResult<()> {
        let mut tables = self.inner.write().await;
        let story = tables
            .stories
            .get_mut(&story_id)
            .ok_or_else(|| DatabaseError::not_found(format!("story {}", story_id)))?;
        story.image = state.clone();
        story.updated_at = Utc::now();
        Ok(())
    }

    async fn stories_with_image_status(&self, status: ImageStatus) -> FabulaResult<Vec<Story>> {
        let mut stories: Vec<Story> = self
            .inner
            .read()
            .await
            .stories
            .values()
            .filter(|s| s.image.status == status)
            .cloned()
            .collect();
        stories.sort_by_key(|s| s.created_at);
        Ok(stories)
    }
}

/// In-memory [`ConversationLogStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryConversationLog {
    logs: Arc<RwLock<Vec<ConversationLog>>>,
}

impl InMemoryConversationLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationLogStore for InMemoryConversationLog {
    async fn append(&self, entry: NewConversationLog) -> FabulaResult<ConversationLog> {
        let mut logs = self.logs.write().await;
        let stored = ConversationLog {
            id: logs.len() as i64 + 1,
            story_id: entry.story_id,
            chapter_number: entry.chapter_number,
            exchange_type: entry.exchange_type,
            input: entry.input,
            output: entry.output,
            model: entry.model,
            token_count: entry.token_count,
            latency_ms: entry.latency_ms,
            created_at: Utc::now(),
        };
        logs.push(stored.clone());
        Ok(stored)
    }

    async fn for_story(&self, story_id: Uuid) -> FabulaResult<Vec<ConversationLog>> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .filter(|l| l.story_id == story_id)
            .cloned()
            .collect())
    }

    async fn all(&self) -> FabulaResult<Vec<ConversationLog>> {
        Ok(self.logs.read().await.clone())
    }
}
