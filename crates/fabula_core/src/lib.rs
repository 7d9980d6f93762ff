//! Core data types for Fabula.
//!
//! Jobs, stories, chapters, the image pipeline state embedded in each story,
//! translation cache entries and conversation log records. Everything here is
//! plain data plus the state-transition rules that must hold no matter which
//! store persists it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod conversation;
mod history;
mod image;
mod job;
mod story;
mod translation;

pub use conversation::{ConversationLog, ExchangeType, NewConversationLog};
pub use history::{Message, Role};
pub use image::{FetchedImage, ImageJobStatus, ImagePipelineState, ImageStatus, MAX_IMAGE_RETRIES};
pub use job::{
    FeedbackPayload, GenerationJob, JobStatus, JobTrigger, NewGenerationJob, ReaderRating,
};
pub use story::{
    Chapter, ChapterDraft, NewChapter, NewStory, NewStoryBuilder, Story, StoryContext,
    StoryProgress,
};
pub use translation::{
    CachedHash, NewTranslationEntry, TranslationEntry, TranslationKey, TranslationStatus,
};
