//! OpenAI-compatible chat completions client.

use crate::dto::{ChatMessage, ChatRequest, ChatResponse};
use crate::{ModelConfig, chapter_prompt, parse_chapter, system_prompt};
use crate::prompt::{translation_prompt, translator_system_prompt};
use async_trait::async_trait;
use fabula_core::Message;
use fabula_error::{FabulaResult, GenerationError, GenerationErrorKind};
use fabula_interface::{ChapterGenerator, ChapterRequest, GeneratedChapter, Translation, Translator};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};

/// Text and usage of one completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletion {
    /// Assistant text
    pub text: String,
    /// Tokens billed, when reported
    pub token_count: Option<u32>,
}

/// Chat completions client.
///
/// Works against any server implementing `POST {base_url}/chat/completions`.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    config: ModelConfig,
}

impl ChatClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised.
    #[instrument(skip_all, fields(model = %config.model()))]
    pub fn new(config: ModelConfig) -> FabulaResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(*config.timeout_secs()))
            .build()
            .map_err(|e| GenerationError::new(GenerationErrorKind::Http(e.to_string())))?;
        Ok(Self { client, config })
    }

    /// Configuration in use.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url().trim_end_matches('/')
        )
    }

    /// Send a conversation and return the first choice.
    ///
    /// # Errors
    ///
    /// Transport failures, non-success statuses, undecodable bodies and
    /// responses without text all surface as [`GenerationError`].
    #[instrument(skip(self, messages), fields(model = %self.config.model(), messages = messages.len()))]
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> FabulaResult<ChatCompletion> {
        let request = ChatRequest {
            model: self.config.model().clone(),
            messages,
            max_tokens: Some(*self.config.max_tokens()),
            temperature: Some(*self.config.temperature()),
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(api_key) = self.config.api_key() {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GenerationError::new(GenerationErrorKind::Http(e.to_string())))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(GenerationError::new(GenerationErrorKind::Api { status, message }).into());
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            GenerationError::new(GenerationErrorKind::Deserialization(e.to_string()))
        })?;

        let token_count = body.usage.map(|usage| usage.total_tokens);
        let text = body
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::new(GenerationErrorKind::EmptyResponse))?;

        debug!(chars = text.len(), ?token_count, "Completion received");
        Ok(ChatCompletion { text, token_count })
    }
}

#[async_trait]
impl ChapterGenerator for ChatClient {
    #[instrument(skip(self, request), fields(story_id = %request.story.story_id, chapter = request.chapter_number))]
    async fn generate_chapter(&self, request: &ChapterRequest) -> FabulaResult<GeneratedChapter> {
        let prompt = chapter_prompt(request);

        let mut messages = Vec::with_capacity(request.history.len() + 2);
        messages.push(ChatMessage::from(&Message::system(system_prompt(&request.story))));
        messages.extend(request.history.iter().map(ChatMessage::from));
        messages.push(ChatMessage::from(&Message::user(prompt.clone())));

        let completion = self.complete(messages).await?;
        let draft = parse_chapter(&completion.text)?;

        Ok(GeneratedChapter {
            draft,
            prompt,
            raw_response: completion.text,
            token_count: completion.token_count,
        })
    }

    fn model_name(&self) -> &str {
        self.config.model()
    }
}

#[async_trait]
impl Translator for ChatClient {
    #[instrument(skip(self, text), fields(chars = text.len()))]
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> FabulaResult<Translation> {
        let prompt = translation_prompt(text);
        let messages = vec![
            ChatMessage::from(&Message::system(translator_system_prompt(
                source_lang,
                target_lang,
            ))),
            ChatMessage::from(&Message::user(prompt.clone())),
        ];

        let completion = self.complete(messages).await?;
        Ok(Translation {
            text: completion.text.trim().to_string(),
            quality_score: None,
            prompt,
            token_count: completion.token_count,
        })
    }

    fn model_name(&self) -> &str {
        self.config.model()
    }
}
