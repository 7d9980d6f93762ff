//! Chapter translation on top of the translation cache.
//!
//! Readers ask for a chapter in another language; the service answers from
//! the cache when the cached digest still matches the chapter text, and
//! otherwise translates in the background. Cache writes are best-effort, so
//! a finished translation the cache refused is held in memory instead, until
//! the periodic sweep drops it after the cache TTL.

use crate::TranslationConfig;
use crate::conversation::{ConversationLogger, Exchange};
use chrono::{DateTime, Utc};
use fabula_cache::{TranslationCache, content_hash};
use fabula_core::{
    Chapter, ExchangeType, Story, TranslationEntry, TranslationKey, TranslationStatus,
};
use fabula_error::{FabulaResult, WorkerError, WorkerErrorKind};
use fabula_interface::{StoryStore, Translator};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

const CONTENT_TYPE: &str = "chapter";

/// A translated chapter body.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationOutcome {
    /// Translated text, or the original when no translation was needed
    pub content: String,
    /// Served from the cache without calling the translator
    pub from_cache: bool,
    /// Quality estimate, when the translator or cache entry has one
    pub quality_score: Option<f32>,
}

#[derive(Debug, Clone)]
enum BackgroundState {
    Running,
    /// Finished, but the cache refused the write
    Done {
        content: String,
        content_hash: String,
        finished_at: DateTime<Utc>,
    },
    Failed {
        message: String,
        finished_at: DateTime<Utc>,
    },
}

impl BackgroundState {
    fn is_settled_before(&self, cutoff: DateTime<Utc>) -> bool {
        match self {
            BackgroundState::Running => false,
            BackgroundState::Done { finished_at, .. }
            | BackgroundState::Failed { finished_at, .. } => *finished_at <= cutoff,
        }
    }
}

/// The chapter, the story it belongs to and its cache key.
struct Source {
    story: Story,
    chapter: Chapter,
    key: TranslationKey,
}

impl Source {
    fn is_same_language(&self) -> bool {
        self.key.source_lang.eq_ignore_ascii_case(&self.key.target_lang)
    }
}

/// Cache-backed chapter translation.
pub struct TranslationService {
    stories: Arc<dyn StoryStore>,
    translator: Arc<dyn Translator>,
    cache: TranslationCache,
    logger: Option<ConversationLogger>,
    config: TranslationConfig,
    background: Mutex<HashMap<TranslationKey, BackgroundState>>,
}

impl std::fmt::Debug for TranslationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationService")
            .field("model", &self.translator.model_name())
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TranslationService {
    /// Create a service.
    pub fn new(
        stories: Arc<dyn StoryStore>,
        translator: Arc<dyn Translator>,
        cache: TranslationCache,
        config: TranslationConfig,
    ) -> Self {
        Self {
            stories,
            translator,
            cache,
            logger: None,
            config,
            background: Mutex::new(HashMap::new()),
        }
    }

    /// Record translation exchanges with `logger`.
    pub fn with_logger(mut self, logger: ConversationLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The cache in front of the translator.
    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Translate a chapter now, from the cache when possible.
    #[instrument(skip(self))]
    pub async fn translate_now(
        &self,
        story_id: Uuid,
        chapter_number: i32,
        target_lang: &str,
    ) -> FabulaResult<TranslationOutcome> {
        let source = self.source(story_id, chapter_number, target_lang).await?;
        if source.is_same_language() {
            return Ok(TranslationOutcome {
                content: source.chapter.body,
                from_cache: false,
                quality_score: None,
            });
        }

        if let Some(entry) = self.lookup(&source).await {
            debug!(key = %source.key, "Serving cached translation");
            return Ok(TranslationOutcome {
                content: entry.translated_content,
                from_cache: true,
                quality_score: entry.quality_score,
            });
        }

        Ok(self.translate_fresh(&source).await?.0)
    }

    /// Start a background translation and return immediately.
    ///
    /// Returns `Completed` when a valid translation is already available and
    /// `InProgress` otherwise; a request for a translation already running
    /// does not start a second one.
    #[instrument(skip(self))]
    pub async fn request_translation(
        self: &Arc<Self>,
        story_id: Uuid,
        chapter_number: i32,
        target_lang: &str,
    ) -> FabulaResult<TranslationStatus> {
        let source = self.source(story_id, chapter_number, target_lang).await?;
        if source.is_same_language() || self.is_valid(&source).await {
            return Ok(TranslationStatus::Completed);
        }

        {
            let mut background = self.background.lock().await;
            match background.get(&source.key) {
                Some(BackgroundState::Running) => return Ok(TranslationStatus::InProgress),
                Some(BackgroundState::Done { content_hash: hash, .. })
                    if *hash == content_hash(&source.chapter.body) =>
                {
                    return Ok(TranslationStatus::Completed);
                }
                _ => {}
            }
            background.insert(source.key.clone(), BackgroundState::Running);
        }

        info!(key = %source.key, "Translation requested");
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let key = source.key.clone();
            let state = match service.translate_fresh(&source).await {
                Ok((_, true)) => None,
                Ok((outcome, false)) => Some(BackgroundState::Done {
                    content: outcome.content,
                    content_hash: content_hash(&source.chapter.body),
                    finished_at: Utc::now(),
                }),
                Err(e) => {
                    warn!(%key, error = %e, "Background translation failed");
                    Some(BackgroundState::Failed {
                        message: e.to_string(),
                        finished_at: Utc::now(),
                    })
                }
            };

            let mut background = service.background.lock().await;
            match state {
                Some(state) => {
                    background.insert(key, state);
                }
                // The cache serves it from here on
                None => {
                    background.remove(&key);
                }
            }
        });

        Ok(TranslationStatus::InProgress)
    }

    /// Progress of the translation of a chapter into `target_lang`.
    #[instrument(skip(self))]
    pub async fn translation_status(
        &self,
        story_id: Uuid,
        chapter_number: i32,
        target_lang: &str,
    ) -> FabulaResult<TranslationStatus> {
        let source = self.source(story_id, chapter_number, target_lang).await?;
        if source.is_same_language() {
            return Ok(TranslationStatus::Completed);
        }

        let state = self.background.lock().await.get(&source.key).cloned();
        match state {
            Some(BackgroundState::Running) => return Ok(TranslationStatus::InProgress),
            Some(BackgroundState::Failed { message, .. }) => {
                return Ok(TranslationStatus::Failed(message));
            }
            Some(BackgroundState::Done { content_hash: hash, .. })
                if hash == content_hash(&source.chapter.body) =>
            {
                return Ok(TranslationStatus::Completed);
            }
            _ => {}
        }

        if self.is_valid(&source).await {
            Ok(TranslationStatus::Completed)
        } else {
            Ok(TranslationStatus::NotRequested)
        }
    }

    /// The translated chapter body, if one is available for the current text.
    #[instrument(skip(self))]
    pub async fn translation_content(
        &self,
        story_id: Uuid,
        chapter_number: i32,
        target_lang: &str,
    ) -> FabulaResult<Option<String>> {
        let source = self.source(story_id, chapter_number, target_lang).await?;
        if source.is_same_language() {
            return Ok(Some(source.chapter.body));
        }

        if let Some(entry) = self.lookup(&source).await {
            return Ok(Some(entry.translated_content));
        }

        let background = self.background.lock().await;
        Ok(match background.get(&source.key) {
            Some(BackgroundState::Done {
                content,
                content_hash: hash,
                ..
            }) if *hash == content_hash(&source.chapter.body) => Some(content.clone()),
            _ => None,
        })
    }

    /// Poll until the translation is available, at most `poll_attempts` times.
    #[instrument(skip(self))]
    pub async fn wait_for_translation(
        &self,
        story_id: Uuid,
        chapter_number: i32,
        target_lang: &str,
    ) -> FabulaResult<String> {
        let attempts = *self.config.poll_attempts();
        for attempt in 1..=attempts {
            match self
                .translation_status(story_id, chapter_number, target_lang)
                .await?
            {
                TranslationStatus::Completed => {
                    if let Some(content) = self
                        .translation_content(story_id, chapter_number, target_lang)
                        .await?
                    {
                        return Ok(content);
                    }
                }
                TranslationStatus::Failed(message) => {
                    return Err(WorkerError::new(WorkerErrorKind::TranslationFailed(message)).into());
                }
                TranslationStatus::InProgress | TranslationStatus::NotRequested => {}
            }

            if attempt < attempts {
                tokio::time::sleep(self.config.poll_interval()).await;
            }
        }

        Err(WorkerError::new(WorkerErrorKind::TranslationTimeout { attempts }).into())
    }

    /// Forget finished and failed background requests older than the cache
    /// TTL. Returns how many were dropped.
    #[instrument(skip(self))]
    pub async fn prune_settled(&self) -> usize {
        let cutoff = Utc::now() - self.cache.config().ttl();
        let mut background = self.background.lock().await;
        let before = background.len();
        background.retain(|_, state| !state.is_settled_before(cutoff));
        let pruned = before - background.len();
        if pruned > 0 {
            debug!(pruned, "Pruned settled translation requests");
        }
        pruned
    }

    /// Background requests currently held in memory.
    pub async fn tracked_requests(&self) -> usize {
        self.background.lock().await.len()
    }

    async fn source(
        &self,
        story_id: Uuid,
        chapter_number: i32,
        target_lang: &str,
    ) -> FabulaResult<Source> {
        let not_found = || {
            WorkerError::new(WorkerErrorKind::ContentNotFound(format!(
                "chapter {} of story {}",
                chapter_number, story_id
            )))
        };

        let story = self.stories.get_story(story_id).await?.ok_or_else(not_found)?;
        let chapter = self
            .stories
            .get_chapter(story_id, chapter_number)
            .await?
            .ok_or_else(not_found)?;
        let key = TranslationKey::new(
            CONTENT_TYPE,
            chapter.id.to_string(),
            story.language.clone(),
            target_lang,
        );
        Ok(Source {
            story,
            chapter,
            key,
        })
    }

    /// Cache hit for the current chapter text. Read failures count as misses.
    async fn lookup(&self, source: &Source) -> Option<TranslationEntry> {
        match self.cache.get(&source.key, &source.chapter.body).await {
            Ok(lookup) => lookup.into_entry(),
            Err(e) => {
                warn!(key = %source.key, error = %e, "Cache read failed");
                None
            }
        }
    }

    async fn is_valid(&self, source: &Source) -> bool {
        match self
            .cache
            .is_cache_valid(&source.key, &source.chapter.body)
            .await
        {
            Ok(valid) => valid,
            Err(e) => {
                warn!(key = %source.key, error = %e, "Cache validity check failed");
                false
            }
        }
    }

    /// Translate and cache. The flag reports whether the cache took the write.
    async fn translate_fresh(&self, source: &Source) -> FabulaResult<(TranslationOutcome, bool)> {
        let started = Instant::now();
        let translation = self
            .translator
            .translate(
                &source.chapter.body,
                &source.key.source_lang,
                &source.key.target_lang,
            )
            .await?;
        let latency = started.elapsed();
        debug!(key = %source.key, latency_ms = latency.as_millis() as u64, "Chapter translated");

        if let Some(logger) = &self.logger {
            logger
                .record(Exchange {
                    story_id: source.story.id,
                    chapter_number: source.chapter.chapter_number,
                    exchange_type: ExchangeType::Translation,
                    input: &translation.prompt,
                    output: &translation.text,
                    model: self.translator.model_name(),
                    token_count: translation.token_count,
                    latency,
                })
                .await;
        }

        let cached = self
            .cache
            .set(
                &source.key,
                &source.chapter.body,
                &translation.text,
                translation.quality_score,
            )
            .await
            .is_some();

        Ok((
            TranslationOutcome {
                content: translation.text,
                from_cache: false,
                quality_score: translation.quality_score,
            },
            cached,
        ))
    }
}
