//! Contracts for the external generation services.

use async_trait::async_trait;
use fabula_core::{ChapterDraft, FetchedImage, ImageJobStatus, Message, StoryContext};
use fabula_error::FabulaResult;
use serde::{Deserialize, Serialize};

/// Input for one chapter generation.
///
/// An empty `history` asks for the opening chapter; otherwise the model
/// continues the transcript, steered by `feedback`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterRequest {
    /// Story identity and premise
    pub story: StoryContext,
    /// Number of the chapter to write
    pub chapter_number: i32,
    /// Prior transcript
    pub history: Vec<Message>,
    /// Instruction derived from reader feedback
    pub feedback: Option<String>,
}

impl ChapterRequest {
    /// Whether this request starts a story from scratch.
    pub fn is_opening(&self) -> bool {
        self.history.is_empty()
    }
}

/// A parsed model response plus what the caller needs to log and replay it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedChapter {
    /// Parsed sections
    pub draft: ChapterDraft,
    /// The user turn that was sent, appended to history
    pub prompt: String,
    /// The raw assistant text, appended to history
    pub raw_response: String,
    /// Tokens billed, when the provider reports them
    pub token_count: Option<u32>,
}

/// Generative model that writes chapters.
#[async_trait]
pub trait ChapterGenerator: Send + Sync {
    /// Generate and parse one chapter.
    ///
    /// Malformed output is an error, never an empty chapter.
    async fn generate_chapter(&self, request: &ChapterRequest) -> FabulaResult<GeneratedChapter>;

    /// Model identifier recorded in the conversation log.
    fn model_name(&self) -> &str;
}

/// A translated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Translated text
    pub text: String,
    /// Optional quality estimate in `[0, 1]`
    pub quality_score: Option<f32>,
    /// The prompt that was sent
    pub prompt: String,
    /// Tokens billed
    pub token_count: Option<u32>,
}

/// Generative model that translates text.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_lang` into `target_lang`.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> FabulaResult<Translation>;

    /// Model identifier recorded in the conversation log.
    fn model_name(&self) -> &str;
}

/// External image-generation service.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Submit a prompt and return the service's opaque job id.
    async fn submit(&self, prompt: &str) -> FabulaResult<String>;

    /// Query the status of a submitted job.
    async fn poll(&self, external_job_id: &str) -> FabulaResult<ImageJobStatus>;

    /// Download a finished asset from its transient URL.
    async fn fetch(&self, url: &str) -> FabulaResult<FetchedImage>;
}
