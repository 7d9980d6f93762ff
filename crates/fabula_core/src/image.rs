//! Cover image pipeline state embedded in each story.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Automatic retries stop once `retry_count` reaches this value.
pub const MAX_IMAGE_RETRIES: i32 = 5;

/// Where a story's cover image is in its lifecycle.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
pub enum ImageStatus {
    /// No job in flight
    #[default]
    None,
    /// Submitted to the external service
    Generating,
    /// Durable URL stored
    Completed,
    /// The service gave up on the job
    Failed,
}

impl ImageStatus {
    /// Whether moving from `self` to `next` is a forward transition.
    ///
    /// `none → generating → completed | failed`; nothing ever returns to `none`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fabula_core::ImageStatus;
    ///
    /// assert!(ImageStatus::None.can_transition_to(ImageStatus::Generating));
    /// assert!(!ImageStatus::Generating.can_transition_to(ImageStatus::None));
    /// ```
    pub fn can_transition_to(self, next: ImageStatus) -> bool {
        matches!(
            (self, next),
            (ImageStatus::None, ImageStatus::Generating)
                | (ImageStatus::Generating, ImageStatus::Completed)
                | (ImageStatus::Generating, ImageStatus::Failed)
        )
    }
}

/// Image pipeline fields stored alongside a story.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePipelineState {
    /// Lifecycle state
    pub status: ImageStatus,
    /// Job id assigned by the image service
    pub external_job_id: Option<String>,
    /// Automatic resubmissions so far, never decreases
    pub retry_count: i32,
    /// When the last submission was attempted
    pub last_attempt_at: Option<DateTime<Utc>>,
    /// Prompt handed to the image service
    pub generation_prompt: Option<String>,
    /// Final cover URL
    pub image_url: Option<String>,
}

impl ImagePipelineState {
    /// Record a successful submission: `none → generating`.
    ///
    /// Returns `false` and leaves the state untouched if the story is not in `none`.
    pub fn begin_generating(&mut self, external_job_id: impl Into<String>, now: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(ImageStatus::Generating) {
            return false;
        }
        self.status = ImageStatus::Generating;
        self.external_job_id = Some(external_job_id.into());
        self.last_attempt_at = Some(now);
        true
    }

    /// Record a submission the service rejected; the story stays in `none`.
    pub fn record_failed_submission(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != ImageStatus::None {
            return false;
        }
        self.last_attempt_at = Some(now);
        true
    }

    /// `generating → completed` with the stored URL.
    pub fn complete(&mut self, image_url: impl Into<String>) -> bool {
        if !self.status.can_transition_to(ImageStatus::Completed) {
            return false;
        }
        self.status = ImageStatus::Completed;
        self.image_url = Some(image_url.into());
        true
    }

    /// `generating → failed`.
    pub fn fail(&mut self) -> bool {
        if !self.status.can_transition_to(ImageStatus::Failed) {
            return false;
        }
        self.status = ImageStatus::Failed;
        true
    }

    /// Count one more automatic attempt, capped at [`MAX_IMAGE_RETRIES`].
    pub fn bump_retry(&mut self) {
        self.retry_count = (self.retry_count + 1).min(MAX_IMAGE_RETRIES);
    }

    /// True once automatic retries are exhausted.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= MAX_IMAGE_RETRIES
    }
}

/// Answer from the image service's status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageJobStatus {
    /// The job has finished, successfully or not
    pub done: bool,
    /// The service reported an internal fault
    pub faulted: bool,
    /// Position in the service's queue while waiting
    pub queue_position: Option<u32>,
    /// Transient URL of the finished asset
    pub image_url: Option<String>,
}

/// Bytes downloaded from a transient asset URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    /// Raw image bytes
    pub data: Vec<u8>,
    /// Content type reported by the server
    pub mime_type: String,
}
