//! Chapter generation jobs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a generation job.
///
/// `completed` and `failed` are terminal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    /// Waiting to be claimed
    Pending,
    /// Claimed by a worker
    Processing,
    /// Chapter persisted
    Completed,
    /// Gave up
    Failed,
}

impl JobStatus {
    /// Whether no further mutation may happen.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// The event that caused a job to be created.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobTrigger {
    /// A new story was created
    Creation,
    /// A reader rated the previous chapter
    Feedback,
}

/// How the reader felt about the previous chapter.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReaderRating {
    /// Reader loved it
    Loved,
    /// Reader liked it
    Liked,
    /// Reader disliked it
    Disliked,
}

/// Structured reader signal attached to a feedback job.
///
/// # Examples
///
/// ```
/// use fabula_core::{FeedbackPayload, ReaderRating};
///
/// let feedback = FeedbackPayload::new(ReaderRating::Loved)
///     .with_reasons(vec!["pacing".into(), "dialogue".into()]);
/// assert_eq!(feedback.reasons.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPayload {
    /// Overall verdict
    pub rating: ReaderRating,
    /// Short reasons picked by the reader
    #[serde(default)]
    pub reasons: Vec<String>,
    /// Free-form note
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl FeedbackPayload {
    /// Feedback with a rating and no reasons.
    pub fn new(rating: ReaderRating) -> Self {
        Self {
            rating,
            reasons: Vec::new(),
            comment: None,
        }
    }

    /// Attach reasons.
    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.reasons = reasons;
        self
    }

    /// Attach a free-form comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Durable record of one chapter generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationJob {
    /// Job id
    pub id: Uuid,
    /// Owning story
    pub story_id: Uuid,
    /// Chapter this job produces
    pub chapter_number: i32,
    /// Originating event
    pub trigger: JobTrigger,
    /// Reader signal for feedback jobs
    pub feedback: Option<FeedbackPayload>,
    /// Lifecycle state
    pub status: JobStatus,
    /// Number of times the job has been claimed
    pub attempts: i32,
    /// Last failure, if any
    pub error_message: Option<String>,
    /// Creation time, used for FIFO ordering
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl GenerationJob {
    /// Whether a worker may claim this job.
    pub fn is_claimable(&self, max_attempts: i32) -> bool {
        self.status == JobStatus::Pending && self.attempts < max_attempts
    }

    /// Whether this job produces the first chapter of a fresh story.
    pub fn is_first_chapter(&self) -> bool {
        self.trigger == JobTrigger::Creation && self.chapter_number <= 1
    }
}

/// Fields needed to enqueue a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGenerationJob {
    /// Owning story
    pub story_id: Uuid,
    /// Chapter to produce
    pub chapter_number: i32,
    /// Originating event
    pub trigger: JobTrigger,
    /// Reader signal
    pub feedback: Option<FeedbackPayload>,
}

impl NewGenerationJob {
    /// First chapter of a new story.
    pub fn creation(story_id: Uuid) -> Self {
        Self {
            story_id,
            chapter_number: 1,
            trigger: JobTrigger::Creation,
            feedback: None,
        }
    }

    /// A continuation driven by reader feedback.
    pub fn feedback(
        story_id: Uuid,
        chapter_number: i32,
        feedback: Option<FeedbackPayload>,
    ) -> Self {
        Self {
            story_id,
            chapter_number,
            trigger: JobTrigger::Feedback,
            feedback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: JobStatus, attempts: i32) -> GenerationJob {
        let now = Utc::now();
        GenerationJob {
            id: Uuid::new_v4(),
            story_id: Uuid::new_v4(),
            chapter_number: 1,
            trigger: JobTrigger::Creation,
            feedback: None,
            status,
            attempts,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn claimable_only_while_pending_under_limit() {
        assert!(job(JobStatus::Pending, 0).is_claimable(3));
        assert!(job(JobStatus::Pending, 2).is_claimable(3));
        assert!(!job(JobStatus::Pending, 3).is_claimable(3));
        assert!(!job(JobStatus::Processing, 0).is_claimable(3));
        assert!(!job(JobStatus::Failed, 0).is_claimable(3));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<JobStatus>().unwrap(), status);
        }
        assert!(JobStatus::Completed.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }
}
