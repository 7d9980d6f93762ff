//! Stories and their chapters.

use crate::{ImagePipelineState, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A story: the content unit that accumulates generated chapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Story {
    /// Story id
    pub id: Uuid,
    /// Title, taken from the first generated chapter when not supplied
    pub title: Option<String>,
    /// The reader's premise
    pub premise: String,
    /// Optional genre hint
    pub genre: Option<String>,
    /// Language the story is written in (BCP-47 tag)
    pub language: String,
    /// Ordered transcript replayed for continuity
    pub history: Vec<Message>,
    /// Chapters produced so far
    pub chapter_count: i32,
    /// Cover image pipeline
    pub image: ImagePipelineState,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last mutation time
    pub updated_at: DateTime<Utc>,
}

impl Story {
    /// The identity the model sees on every request.
    pub fn context(&self) -> StoryContext {
        StoryContext {
            story_id: self.id,
            title: self.title.clone(),
            premise: self.premise.clone(),
            genre: self.genre.clone(),
            language: self.language.clone(),
        }
    }
}

/// Fields needed to create a story.
///
/// # Examples
///
/// ```
/// use fabula_core::NewStoryBuilder;
///
/// let story = NewStoryBuilder::default()
///     .premise("A lighthouse keeper finds a door in the sea")
///     .language("en")
///     .build()
///     .unwrap();
/// assert!(story.genre.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_builder::Builder)]
#[builder(setter(into))]
pub struct NewStory {
    /// Optional working title
    #[builder(default)]
    pub title: Option<String>,
    /// The reader's premise
    pub premise: String,
    /// Optional genre hint
    #[builder(default)]
    pub genre: Option<String>,
    /// Story language
    #[builder(default = "String::from(\"en\")")]
    pub language: String,
}

/// Subject identity sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryContext {
    /// Story id
    pub story_id: Uuid,
    /// Title, if known
    pub title: Option<String>,
    /// Premise
    pub premise: String,
    /// Genre hint
    pub genre: Option<String>,
    /// Story language
    pub language: String,
}

/// One generated chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    /// Chapter id
    pub id: Uuid,
    /// Owning story
    pub story_id: Uuid,
    /// 1-based position in the story
    pub chapter_number: i32,
    /// Chapter title
    pub title: String,
    /// Chapter text
    pub body: String,
    /// Structured metadata extracted from the model output
    pub metadata: Option<serde_json::Value>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Fields needed to persist a chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChapter {
    /// Owning story
    pub story_id: Uuid,
    /// 1-based position
    pub chapter_number: i32,
    /// Title
    pub title: String,
    /// Body
    pub body: String,
    /// Structured metadata
    pub metadata: Option<serde_json::Value>,
}

/// Story-level aggregates written together with a new chapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryProgress {
    /// Full transcript after this exchange
    pub history: Vec<Message>,
    /// Chapter count after this chapter
    pub chapter_count: i32,
    /// Title to set when the story has none yet
    pub title: Option<String>,
}

/// The parsed sections of one model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterDraft {
    /// Chapter title
    pub title: String,
    /// Chapter body
    pub body: String,
    /// Prompt for the cover image, usually only on the first chapter
    pub image_prompt: Option<String>,
    /// Free-form structured metadata
    pub metadata: Option<serde_json::Value>,
}
