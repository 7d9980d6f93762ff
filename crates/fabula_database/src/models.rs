//! Row types and their conversions to domain types.

use crate::DatabaseResult;
use crate::schema::{chapters, conversation_logs, generation_jobs, stories, translation_cache};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use fabula_core::{
    CachedHash, Chapter, ConversationLog, GenerationJob, ImagePipelineState, Message,
    NewConversationLog, NewTranslationEntry, Story, TranslationEntry, TranslationKey,
};
use fabula_error::{DatabaseError, DatabaseErrorKind};
use std::str::FromStr;
use uuid::Uuid;

fn parse_enum<T: FromStr>(column: &str, value: &str) -> DatabaseResult<T> {
    T::from_str(value).map_err(|_| {
        DatabaseError::new(DatabaseErrorKind::Serialization(format!(
            "unexpected {} value '{}'",
            column, value
        )))
    })
}

// ============================================================================
// Generation jobs
// ============================================================================

/// Row of `generation_jobs`.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = generation_jobs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRow {
    pub id: Uuid,
    pub story_id: Uuid,
    pub chapter_number: i32,
    pub job_trigger: String,
    pub feedback: Option<serde_json::Value>,
    pub status: String,
    pub attempts: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable `generation_jobs` row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = generation_jobs)]
pub struct NewJobRow {
    pub id: Uuid,
    pub story_id: Uuid,
    pub chapter_number: i32,
    pub job_trigger: String,
    pub feedback: Option<serde_json::Value>,
    pub status: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for GenerationJob {
    type Error = DatabaseError;

    fn try_from(row: JobRow) -> DatabaseResult<Self> {
        let feedback = row.feedback.map(serde_json::from_value).transpose()?;
        Ok(GenerationJob {
            id: row.id,
            story_id: row.story_id,
            chapter_number: row.chapter_number,
            trigger: parse_enum("job_trigger", &row.job_trigger)?,
            feedback,
            status: parse_enum("status", &row.status)?,
            attempts: row.attempts,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// ============================================================================
// Stories and chapters
// ============================================================================

/// Row of `stories`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = stories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StoryRow {
    pub id: Uuid,
    pub title: Option<String>,
    pub premise: String,
    pub genre: Option<String>,
    pub language: String,
    pub history: serde_json::Value,
    pub chapter_count: i32,
    pub image_status: String,
    pub image_job_id: Option<String>,
    pub image_retry_count: i32,
    pub image_last_attempt_at: Option<DateTime<Utc>>,
    pub image_prompt: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insertable `stories` row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = stories)]
pub struct NewStoryRow {
    pub id: Uuid,
    pub title: Option<String>,
    pub premise: String,
    pub genre: Option<String>,
    pub language: String,
    pub history: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Image pipeline columns of `stories`, written as a unit.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = stories)]
#[diesel(treat_none_as_null = true)]
pub struct ImageColumns {
    pub image_status: String,
    pub image_job_id: Option<String>,
    pub image_retry_count: i32,
    pub image_last_attempt_at: Option<DateTime<Utc>>,
    pub image_prompt: Option<String>,
    pub image_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ImageColumns {
    /// Columns for `state`, stamped with `now`.
    pub fn new(state: &ImagePipelineState, now: DateTime<Utc>) -> Self {
        Self {
            image_status: state.status.to_string(),
            image_job_id: state.external_job_id.clone(),
            image_retry_count: state.retry_count,
            image_last_attempt_at: state.last_attempt_at,
            image_prompt: state.generation_prompt.clone(),
            image_url: state.image_url.clone(),
            updated_at: now,
        }
    }
}

impl TryFrom<StoryRow> for Story {
    type Error = DatabaseError;

    fn try_from(row: StoryRow) -> DatabaseResult<Self> {
        let history: Vec<Message> = serde_json::from_value(row.history)?;
        Ok(Story {
            id: row.id,
            title: row.title,
            premise: row.premise,
            genre: row.genre,
            language: row.language,
            history,
            chapter_count: row.chapter_count,
            image: ImagePipelineState {
                status: parse_enum("image_status", &row.image_status)?,
                external_job_id: row.image_job_id,
                retry_count: row.image_retry_count,
                last_attempt_at: row.image_last_attempt_at,
                generation_prompt: row.image_prompt,
                image_url: row.image_url,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Row of `chapters`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = chapters)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChapterRow {
    pub id: Uuid,
    pub story_id: Uuid,
    pub chapter_number: i32,
    pub title: String,
    pub body: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<ChapterRow> for Chapter {
    fn from(row: ChapterRow) -> Self {
        Chapter {
            id: row.id,
            story_id: row.story_id,
            chapter_number: row.chapter_number,
            title: row.title,
            body: row.body,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}

// ============================================================================
// Translation cache
// ============================================================================

/// Row of `translation_cache`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = translation_cache)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TranslationRow {
    pub content_type: String,
    pub content_id: String,
    pub source_lang: String,
    pub target_lang: String,
    pub original_content: String,
    pub translated_content: String,
    pub content_hash: String,
    pub quality_score: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TranslationRow {
    /// Row for an upsert stamped with `now`.
    pub fn from_new(entry: NewTranslationEntry, now: DateTime<Utc>) -> Self {
        Self {
            content_type: entry.key.content_type,
            content_id: entry.key.content_id,
            source_lang: entry.key.source_lang,
            target_lang: entry.key.target_lang,
            original_content: entry.original_content,
            translated_content: entry.translated_content,
            content_hash: entry.content_hash,
            quality_score: entry.quality_score,
            created_at: now,
            expires_at: entry.expires_at,
        }
    }
}

impl From<TranslationRow> for TranslationEntry {
    fn from(row: TranslationRow) -> Self {
        TranslationEntry {
            key: TranslationKey::new(
                row.content_type,
                row.content_id,
                row.source_lang,
                row.target_lang,
            ),
            original_content: row.original_content,
            translated_content: row.translated_content,
            content_hash: row.content_hash,
            quality_score: row.quality_score,
            created_at: row.created_at,
            expires_at: row.expires_at,
        }
    }
}

/// Hash columns of `translation_cache`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = translation_cache)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HashRow {
    pub content_hash: String,
    pub expires_at: DateTime<Utc>,
}

impl From<HashRow> for CachedHash {
    fn from(row: HashRow) -> Self {
        CachedHash {
            content_hash: row.content_hash,
            expires_at: row.expires_at,
        }
    }
}

// ============================================================================
// Conversation logs
// ============================================================================

/// Row of `conversation_logs`.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = conversation_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConversationLogRow {
    pub id: i64,
    pub story_id: Uuid,
    pub chapter_number: i32,
    pub exchange_type: String,
    pub input: String,
    pub output: String,
    pub model: String,
    pub token_count: Option<i32>,
    pub latency_ms: i64,
    pub created_at: DateTime<Utc>,
}

/// Insertable `conversation_logs` row.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = conversation_logs)]
pub struct NewConversationLogRow {
    pub story_id: Uuid,
    pub chapter_number: i32,
    pub exchange_type: String,
    pub input: String,
    pub output: String,
    pub model: String,
    pub token_count: Option<i32>,
    pub latency_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl NewConversationLogRow {
    /// Row for `entry` stamped with `now`.
    pub fn from_new(entry: NewConversationLog, now: DateTime<Utc>) -> Self {
        Self {
            story_id: entry.story_id,
            chapter_number: entry.chapter_number,
            exchange_type: entry.exchange_type.to_string(),
            input: entry.input,
            output: entry.output,
            model: entry.model,
            token_count: entry.token_count,
            latency_ms: entry.latency_ms,
            created_at: now,
        }
    }
}

impl TryFrom<ConversationLogRow> for ConversationLog {
    type Error = DatabaseError;

    fn try_from(row: ConversationLogRow) -> DatabaseResult<Self> {
        Ok(ConversationLog {
            id: row.id,
            story_id: row.story_id,
            chapter_number: row.chapter_number,
            exchange_type: parse_enum("exchange_type", &row.exchange_type)?,
            input: row.input,
            output: row.output,
            model: row.model,
            token_count: row.token_count,
            latency_ms: row.latency_ms,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fabula_core::{FeedbackPayload, ImageStatus, JobStatus, JobTrigger, ReaderRating};

    fn job_row(status: &str) -> JobRow {
        let now = Utc::now();
        JobRow {
            id: Uuid::new_v4(),
            story_id: Uuid::new_v4(),
            chapter_number: 2,
            job_trigger: "feedback".to_string(),
            feedback: Some(
                serde_json::to_value(FeedbackPayload::new(ReaderRating::Liked)).unwrap(),
            ),
            status: status.to_string(),
            attempts: 1,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn job_row_converts() {
        let job = GenerationJob::try_from(job_row("processing")).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.trigger, JobTrigger::Feedback);
        assert_eq!(job.feedback.unwrap().rating, ReaderRating::Liked);
    }

    #[test]
    fn unknown_status_is_a_serialization_error() {
        let err = GenerationJob::try_from(job_row("paused")).unwrap_err();
        assert!(matches!(err.kind, DatabaseErrorKind::Serialization(_)));
    }

    #[test]
    fn image_columns_mirror_state() {
        let mut state = ImagePipelineState::default();
        state.begin_generating("ext-7", Utc::now());
        let columns = ImageColumns::new(&state, Utc::now());
        assert_eq!(columns.image_status, "generating");
        assert_eq!(columns.image_job_id.as_deref(), Some("ext-7"));
        assert_eq!(state.status, ImageStatus::Generating);
    }
}
