//! PostgreSQL implementations of the store traits.

use crate::connection::{DbPool, checkout};
use crate::models::{
    ChapterRow, ConversationLogRow, HashRow, ImageColumns, JobRow, NewConversationLogRow,
    NewJobRow, NewStoryRow, StoryRow, TranslationRow,
};
use crate::schema::{chapters, conversation_logs, generation_jobs, stories, translation_cache};
use crate::DatabaseResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::Integer;
use diesel::upsert::excluded;
use fabula_core::{
    CachedHash, Chapter, ConversationLog, GenerationJob, ImagePipelineState, ImageStatus,
    JobStatus, NewChapter, NewConversationLog, NewGenerationJob, NewStory, NewTranslationEntry,
    Story, StoryProgress, TranslationEntry, TranslationKey,
};
use fabula_error::{DatabaseError, DatabaseErrorKind, FabulaResult};
use fabula_interface::{ConversationLogStore, JobStore, StoryStore, TranslationCacheStore};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const CLAIM_NEXT_SQL: &str = r#"
UPDATE generation_jobs
SET status = 'processing', attempts = attempts + 1, updated_at = NOW()
WHERE id = (
    SELECT id FROM generation_jobs
    WHERE status = 'pending' AND attempts < $1
    ORDER BY created_at ASC, id ASC
    LIMIT 1
    FOR UPDATE SKIP LOCKED
)
RETURNING *
"#;

/// Every store trait backed by one PostgreSQL connection pool.
///
/// Diesel is synchronous, so each call checks a connection out and runs on
/// tokio's blocking pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: DbPool,
}

impl PostgresStore {
    /// Wrap an existing pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    async fn run<T, F>(&self, op: F) -> DatabaseResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> DatabaseResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = checkout(&pool)?;
            op(&mut conn)
        })
        .await
        .map_err(|e| {
            DatabaseError::new(DatabaseErrorKind::Connection(format!(
                "Task join error: {}",
                e
            )))
        })?
    }
}

fn live_job_for(
    conn: &mut PgConnection,
    story_id: Uuid,
    chapter_number: i32,
) -> DatabaseResult<Option<JobRow>> {
    generation_jobs::table
        .filter(generation_jobs::story_id.eq(story_id))
        .filter(generation_jobs::chapter_number.eq(chapter_number))
        .filter(generation_jobs::status.ne(JobStatus::Failed.as_ref()))
        .select(JobRow::as_select())
        .first(conn)
        .optional()
        .map_err(Into::into)
}

fn transition_processing(
    conn: &mut PgConnection,
    id: Uuid,
    next: JobStatus,
    error: Option<&str>,
) -> DatabaseResult<JobRow> {
    let processing = JobStatus::Processing.to_string();
    let target = generation_jobs::table
        .filter(generation_jobs::id.eq(id))
        .filter(generation_jobs::status.eq(processing.as_str()));

    let updated = match error {
        Some(message) => diesel::update(target)
            .set((
                generation_jobs::status.eq(next.as_ref()),
                generation_jobs::error_message.eq(message),
                generation_jobs::updated_at.eq(Utc::now()),
            ))
            .returning(JobRow::as_returning())
            .get_result(conn)
            .optional()?,
        None => diesel::update(target)
            .set((
                generation_jobs::status.eq(next.as_ref()),
                generation_jobs::updated_at.eq(Utc::now()),
            ))
            .returning(JobRow::as_returning())
            .get_result(conn)
            .optional()?,
    };

    updated.ok_or_else(|| DatabaseError::not_found(format!("processing job {}", id)))
}

#[async_trait]
impl JobStore for PostgresStore {
    #[instrument(skip(self, job), fields(story_id = %job.story_id, chapter = job.chapter_number))]
    async fn create_job(&self, job: NewGenerationJob) -> FabulaResult<GenerationJob> {
        let row = self
            .run(move |conn| {
                conn.transaction::<_, DatabaseError, _>(|conn| {
                    if let Some(existing) = live_job_for(conn, job.story_id, job.chapter_number)? {
                        debug!(job_id = %existing.id, "Live job already queued");
                        return Ok(existing);
                    }

                    let now = Utc::now();
                    let feedback = job.feedback.as_ref().map(serde_json::to_value).transpose()?;
                    let new_row = NewJobRow {
                        id: Uuid::new_v4(),
                        story_id: job.story_id,
                        chapter_number: job.chapter_number,
                        job_trigger: job.trigger.to_string(),
                        feedback,
                        status: JobStatus::Pending.to_string(),
                        attempts: 0,
                        created_at: now,
                        updated_at: now,
                    };

                    let inserted = diesel::insert_into(generation_jobs::table)
                        .values(&new_row)
                        .on_conflict_do_nothing()
                        .returning(JobRow::as_returning())
                        .get_result(conn)
                        .optional()?;

                    match inserted {
                        Some(row) => Ok(row),
                        // Lost a race with a concurrent enqueue
                        None => live_job_for(conn, job.story_id, job.chapter_number)?
                            .ok_or_else(|| DatabaseError::not_found("live generation job")),
                    }
                })
            })
            .await?;

        Ok(GenerationJob::try_from(row)?)
    }

    #[instrument(skip(self))]
    async fn claim_next(&self, max_attempts: i32) -> FabulaResult<Option<GenerationJob>> {
        let row = self
            .run(move |conn| {
                diesel::sql_query(CLAIM_NEXT_SQL)
                    .bind::<Integer, _>(max_attempts)
                    .get_result::<JobRow>(conn)
                    .optional()
                    .map_err(DatabaseError::from)
            })
            .await?;

        match row {
            Some(row) => {
                let job = GenerationJob::try_from(row)?;
                debug!(job_id = %job.id, attempts = job.attempts, "Claimed job");
                Ok(Some(job))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn complete_job(&self, id: Uuid) -> FabulaResult<GenerationJob> {
        let row = self
            .run(move |conn| transition_processing(conn, id, JobStatus::Completed, None))
            .await?;
        Ok(GenerationJob::try_from(row)?)
    }

    #[instrument(skip(self, error))]
    async fn fail_job(&self, id: Uuid, error: &str, requeue: bool) -> FabulaResult<GenerationJob> {
        let next = if requeue {
            JobStatus::Pending
        } else {
            JobStatus::Failed
        };
        let error = error.to_string();
        let row = self
            .run(move |conn| transition_processing(conn, id, next, Some(&error)))
            .await?;
        Ok(GenerationJob::try_from(row)?)
    }

    async fn get_job(&self, id: Uuid) -> FabulaResult<Option<GenerationJob>> {
        let row = self
            .run(move |conn| {
                generation_jobs::table
                    .find(id)
                    .select(JobRow::as_select())
                    .first(conn)
                    .optional()
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(row.map(GenerationJob::try_from).transpose()?)
    }

    async fn jobs_for_story(&self, story_id: Uuid) -> FabulaResult<Vec<GenerationJob>> {
        let rows = self
            .run(move |conn| {
                generation_jobs::table
                    .filter(generation_jobs::story_id.eq(story_id))
                    .order((generation_jobs::created_at.asc(), generation_jobs::id.asc()))
                    .select(JobRow::as_select())
                    .load(conn)
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(rows
            .into_iter()
            .map(GenerationJob::try_from)
            .collect::<DatabaseResult<Vec<_>>>()?)
    }

    #[instrument(skip(self))]
    async fn release_interrupted(&self, max_attempts: i32) -> FabulaResult<usize> {
        let touched = self
            .run(move |conn| {
                conn.transaction::<_, DatabaseError, _>(|conn| {
                    let processing = JobStatus::Processing.to_string();
                    let now = Utc::now();

                    let requeued = diesel::update(
                        generation_jobs::table
                            .filter(generation_jobs::status.eq(processing.as_str()))
                            .filter(generation_jobs::attempts.lt(max_attempts)),
                    )
                    .set((
                        generation_jobs::status.eq(JobStatus::Pending.as_ref()),
                        generation_jobs::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                    let failed = diesel::update(
                        generation_jobs::table
                            .filter(generation_jobs::status.eq(processing.as_str()))
                            .filter(generation_jobs::attempts.ge(max_attempts)),
                    )
                    .set((
                        generation_jobs::status.eq(JobStatus::Failed.as_ref()),
                        generation_jobs::error_message.eq("interrupted while processing"),
                        generation_jobs::updated_at.eq(now),
                    ))
                    .execute(conn)?;

                    Ok(requeued + failed)
                })
            })
            .await?;

        if touched > 0 {
            warn!(touched, "Released jobs left in processing");
        }
        Ok(touched)
    }
}

fn load_story(conn: &mut PgConnection, id: Uuid) -> DatabaseResult<Option<StoryRow>> {
    stories::table
        .find(id)
        .select(StoryRow::as_select())
        .first(conn)
        .optional()
        .map_err(Into::into)
}

#[async_trait]
impl StoryStore for PostgresStore {
    #[instrument(skip(self, story))]
    async fn create_story(&self, story: NewStory) -> FabulaResult<Story> {
        let row = self
            .run(move |conn| {
                let now = Utc::now();
                let new_row = NewStoryRow {
                    id: Uuid::new_v4(),
                    title: story.title,
                    premise: story.premise,
                    genre: story.genre,
                    language: story.language,
                    history: serde_json::Value::Array(Vec::new()),
                    created_at: now,
                    updated_at: now,
                };
                diesel::insert_into(stories::table)
                    .values(&new_row)
                    .returning(StoryRow::as_returning())
                    .get_result(conn)
                    .map_err(DatabaseError::from)
            })
            .await?;

        let story = Story::try_from(row)?;
        info!(story_id = %story.id, "Created story");
        Ok(story)
    }

    async fn get_story(&self, id: Uuid) -> FabulaResult<Option<Story>> {
        let row = self.run(move |conn| load_story(conn, id)).await?;
        Ok(row.map(Story::try_from).transpose()?)
    }

    #[instrument(skip(self, chapter, progress), fields(story_id = %chapter.story_id, chapter = chapter.chapter_number))]
    async fn record_chapter(
        &self,
        chapter: NewChapter,
        progress: StoryProgress,
    ) -> FabulaResult<Chapter> {
        let row = self
            .run(move |conn| {
                conn.transaction::<_, DatabaseError, _>(|conn| {
                    let now = Utc::now();
                    let chapter_row = ChapterRow {
                        id: Uuid::new_v4(),
                        story_id: chapter.story_id,
                        chapter_number: chapter.chapter_number,
                        title: chapter.title,
                        body: chapter.body,
                        metadata: chapter.metadata,
                        created_at: now,
                    };

                    let inserted = diesel::insert_into(chapters::table)
                        .values(&chapter_row)
                        .returning(ChapterRow::as_returning())
                        .get_result(conn)?;

                    let history = serde_json::to_value(&progress.history)?;
                    let updated = diesel::update(stories::table.find(chapter_row.story_id))
                        .set((
                            stories::history.eq(history),
                            stories::chapter_count.eq(progress.chapter_count),
                            stories::updated_at.eq(now),
                        ))
                        .execute(conn)?;
                    if updated == 0 {
                        return Err(DatabaseError::not_found(format!(
                            "story {}",
                            chapter_row.story_id
                        )));
                    }

                    if let Some(title) = progress.title {
                        diesel::update(
                            stories::table
                                .find(chapter_row.story_id)
                                .filter(stories::title.is_null()),
                        )
                        .set(stories::title.eq(title))
                        .execute(conn)?;
                    }

                    Ok(inserted)
                })
            })
            .await?;

        Ok(Chapter::from(row))
    }

    async fn get_chapter(
        &self,
        story_id: Uuid,
        chapter_number: i32,
    ) -> FabulaResult<Option<Chapter>> {
        let row = self
            .run(move |conn| {
                chapters::table
                    .filter(chapters::story_id.eq(story_id))
                    .filter(chapters::chapter_number.eq(chapter_number))
                    .select(ChapterRow::as_select())
                    .first(conn)
                    .optional()
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(row.map(Chapter::from))
    }

    async fn chapters(&self, story_id: Uuid) -> FabulaResult<Vec<Chapter>> {
        let rows = self
            .run(move |conn| {
                chapters::table
                    .filter(chapters::story_id.eq(story_id))
                    .order(chapters::chapter_number.asc())
                    .select(ChapterRow::as_select())
                    .load(conn)
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(rows.into_iter().map(Chapter::from).collect())
    }

    #[instrument(skip(self, state), fields(status = %state.status))]
    async fn update_image_state(
        &self,
        story_id: Uuid,
        state: &ImagePipelineState,
    ) -> FabulaResult<()> {
        let columns = ImageColumns::new(state, Utc::now());
        let updated = self
            .run(move |conn| {
                diesel::update(stories::table.find(story_id))
                    .set(&columns)
                    .execute(conn)
                    .map_err(DatabaseError::from)
            })
            .await?;

        if updated == 0 {
            return Err(DatabaseError::not_found(format!("story {}", story_id)).into());
        }
        Ok(())
    }

    async fn stories_with_image_status(&self, status: ImageStatus) -> FabulaResult<Vec<Story>> {
        let rows = self
            .run(move |conn| {
                stories::table
                    .filter(stories::image_status.eq(status.as_ref()))
                    .order(stories::created_at.asc())
                    .select(StoryRow::as_select())
                    .load(conn)
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(rows
            .into_iter()
            .map(Story::try_from)
            .collect::<DatabaseResult<Vec<_>>>()?)
    }
}

#[async_trait]
impl TranslationCacheStore for PostgresStore {
    async fn find(&self, key: &TranslationKey) -> FabulaResult<Option<TranslationEntry>> {
        let key = key.clone();
        let row = self
            .run(move |conn| {
                translation_cache::table
                    .find((key.content_type, key.content_id, key.source_lang, key.target_lang))
                    .select(TranslationRow::as_select())
                    .first(conn)
                    .optional()
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(row.map(TranslationEntry::from))
    }

    async fn find_hash(&self, key: &TranslationKey) -> FabulaResult<Option<CachedHash>> {
        let key = key.clone();
        let row = self
            .run(move |conn| {
                translation_cache::table
                    .find((key.content_type, key.content_id, key.source_lang, key.target_lang))
                    .select(HashRow::as_select())
                    .first(conn)
                    .optional()
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(row.map(CachedHash::from))
    }

    #[instrument(skip(self, entry), fields(key = %entry.key))]
    async fn upsert(&self, entry: NewTranslationEntry) -> FabulaResult<TranslationEntry> {
        let row = TranslationRow::from_new(entry, Utc::now());
        let stored = self
            .run(move |conn| {
                use crate::schema::translation_cache::dsl::*;

                diesel::insert_into(translation_cache)
                    .values(&row)
                    .on_conflict((content_type, content_id, source_lang, target_lang))
                    .do_update()
                    .set((
                        original_content.eq(excluded(original_content)),
                        translated_content.eq(excluded(translated_content)),
                        content_hash.eq(excluded(content_hash)),
                        quality_score.eq(excluded(quality_score)),
                        created_at.eq(excluded(created_at)),
                        expires_at.eq(excluded(expires_at)),
                    ))
                    .returning(TranslationRow::as_returning())
                    .get_result(conn)
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(TranslationEntry::from(stored))
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self, now: DateTime<Utc>) -> FabulaResult<usize> {
        let deleted = self
            .run(move |conn| {
                diesel::delete(
                    translation_cache::table.filter(translation_cache::expires_at.le(now)),
                )
                .execute(conn)
                .map_err(DatabaseError::from)
            })
            .await?;
        Ok(deleted)
    }
}

#[async_trait]
impl ConversationLogStore for PostgresStore {
    async fn append(&self, entry: NewConversationLog) -> FabulaResult<ConversationLog> {
        let row = NewConversationLogRow::from_new(entry, Utc::now());
        let stored = self
            .run(move |conn| {
                diesel::insert_into(conversation_logs::table)
                    .values(&row)
                    .returning(ConversationLogRow::as_returning())
                    .get_result(conn)
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(ConversationLog::try_from(stored)?)
    }

    async fn for_story(&self, story_id: Uuid) -> FabulaResult<Vec<ConversationLog>> {
        let rows = self
            .run(move |conn| {
                conversation_logs::table
                    .filter(conversation_logs::story_id.eq(story_id))
                    .order(conversation_logs::id.asc())
                    .select(ConversationLogRow::as_select())
                    .load(conn)
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(rows
            .into_iter()
            .map(ConversationLog::try_from)
            .collect::<DatabaseResult<Vec<_>>>()?)
    }

    async fn all(&self) -> FabulaResult<Vec<ConversationLog>> {
        let rows = self
            .run(move |conn| {
                conversation_logs::table
                    .order(conversation_logs::id.asc())
                    .select(ConversationLogRow::as_select())
                    .load(conn)
                    .map_err(DatabaseError::from)
            })
            .await?;
        Ok(rows
            .into_iter()
            .map(ConversationLog::try_from)
            .collect::<DatabaseResult<Vec<_>>>()?)
    }
}
