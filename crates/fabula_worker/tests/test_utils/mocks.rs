//! Mock implementations of the generation and image service traits.

use async_trait::async_trait;
use fabula_core::{ChapterDraft, FetchedImage, ImageJobStatus};
use fabula_error::{
    FabulaResult, GenerationError, GenerationErrorKind, ImageServiceError, ImageServiceErrorKind,
};
use fabula_interface::{
    ChapterGenerator, ChapterRequest, GeneratedChapter, ImageService, Translation, Translator,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// Chapter generator that fails a set number of times, then succeeds.
#[derive(Default)]
pub struct MockGenerator {
    failures_left: AtomicUsize,
    image_prompt: Option<String>,
    gate: Option<Arc<Semaphore>>,
    requests: Mutex<Vec<ChapterRequest>>,
}

impl MockGenerator {
    /// Always succeeds, without an image prompt.
    pub fn new() -> Self {
        Self::default()
    }

    /// Include `prompt` as the image prompt of every chapter.
    pub fn with_image_prompt(mut self, prompt: &str) -> Self {
        self.image_prompt = Some(prompt.to_string());
        self
    }

    /// Fail the next `count` calls with a parse error.
    pub fn failing(self, count: usize) -> Self {
        self.failures_left.store(count, Ordering::SeqCst);
        self
    }

    /// Block every call until a permit is added to `gate`.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ChapterRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChapterGenerator for MockGenerator {
    async fn generate_chapter(&self, request: &ChapterRequest) -> FabulaResult<GeneratedChapter> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(GenerationError::new(GenerationErrorKind::MissingSection(
                "TITLE".to_string(),
            ))
            .into());
        }

        let n = request.chapter_number;
        Ok(GeneratedChapter {
            draft: ChapterDraft {
                title: format!("Chapter {}", n),
                body: format!("The streets moved again on night {}.", n),
                image_prompt: self.image_prompt.clone(),
                metadata: None,
            },
            prompt: format!("Write chapter {}", n),
            raw_response: format!("### TITLE\nChapter {}\n### CHAPTER\n...", n),
            token_count: Some(120),
        })
    }

    fn model_name(&self) -> &str {
        "mock-writer"
    }
}

/// Translator that prefixes the text with the target language.
#[derive(Default)]
pub struct MockTranslator {
    calls: AtomicUsize,
    fail: bool,
}

impl MockTranslator {
    /// A translator that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// A translator that always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Number of translate calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> FabulaResult<Translation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(GenerationError::new(GenerationErrorKind::Http(
                "translator unavailable".to_string(),
            ))
            .into());
        }
        Ok(Translation {
            text: format!("[{}] {}", target_lang, text),
            quality_score: Some(0.9),
            prompt: format!("Translate from {} to {}", source_lang, target_lang),
            token_count: Some(80),
        })
    }

    fn model_name(&self) -> &str {
        "mock-translator"
    }
}

/// Scripted image service.
pub struct MockImageService {
    accept_submissions: Mutex<VecDeque<bool>>,
    status: Mutex<Option<ImageJobStatus>>,
    fetch_ok: bool,
    submitted: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl Default for MockImageService {
    fn default() -> Self {
        Self {
            accept_submissions: Mutex::new(VecDeque::new()),
            status: Mutex::new(Some(ImageJobStatus::default())),
            fetch_ok: true,
            submitted: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
        }
    }
}

impl MockImageService {
    /// Accepts every submission and reports jobs as queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next submission.
    pub fn rejecting_next(self) -> Self {
        self.accept_submissions.lock().unwrap().push_back(false);
        self
    }

    /// Answer every poll with `status`, or with an error for `None`.
    pub fn with_status(self, status: Option<ImageJobStatus>) -> Self {
        *self.status.lock().unwrap() = status;
        self
    }

    /// Make every download fail.
    pub fn with_failing_fetch(mut self) -> Self {
        self.fetch_ok = false;
        self
    }

    /// Prompts submitted so far, accepted or not.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageService for MockImageService {
    async fn submit(&self, prompt: &str) -> FabulaResult<String> {
        self.submitted.lock().unwrap().push(prompt.to_string());
        let accept = self
            .accept_submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(true);
        if !accept {
            return Err(
                ImageServiceError::new(ImageServiceErrorKind::Http("503".to_string())).into(),
            );
        }
        Ok(format!("img-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn poll(&self, _external_job_id: &str) -> FabulaResult<ImageJobStatus> {
        self.status.lock().unwrap().clone().ok_or_else(|| {
            ImageServiceError::new(ImageServiceErrorKind::Http("timeout".to_string())).into()
        })
    }

    async fn fetch(&self, url: &str) -> FabulaResult<FetchedImage> {
        if !self.fetch_ok {
            return Err(ImageServiceError::new(ImageServiceErrorKind::Transfer(format!(
                "{} expired",
                url
            )))
            .into());
        }
        Ok(FetchedImage {
            data: b"\x89PNG fake cover bytes".to_vec(),
            mime_type: "image/png".to_string(),
        })
    }
}
