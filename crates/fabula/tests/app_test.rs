//! End-to-end wiring over in-memory stores and mock clients.

use async_trait::async_trait;
use fabula::{
    ChapterDraft, ChapterGenerator, ChapterRequest, Clients, Fabula, FabulaConfig, FabulaResult,
    FetchedImage, GeneratedChapter, ImageJobStatus, ImageService, ImageStatus, JobStatus,
    NewStoryBuilder, Stores, Story, TickOutcome, Translation, TranslationStatus, Translator,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

struct StubGenerator;

#[async_trait]
impl ChapterGenerator for StubGenerator {
    async fn generate_chapter(&self, request: &ChapterRequest) -> FabulaResult<GeneratedChapter> {
        let n = request.chapter_number;
        Ok(GeneratedChapter {
            draft: ChapterDraft {
                title: format!("Night {}", n),
                body: format!("The lamps went out on night {}.", n),
                image_prompt: Some("a dark harbour".to_string()),
                metadata: None,
            },
            prompt: format!("Write chapter {}", n),
            raw_response: format!("### TITLE\nNight {}", n),
            token_count: Some(64),
        })
    }

    fn model_name(&self) -> &str {
        "stub-writer"
    }
}

#[derive(Default)]
struct StubTranslator {
    calls: AtomicUsize,
}

#[async_trait]
impl Translator for StubTranslator {
    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        target_lang: &str,
    ) -> FabulaResult<Translation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Translation {
            text: format!("[{}] {}", target_lang, text),
            quality_score: Some(0.8),
            prompt: text.to_string(),
            token_count: Some(10),
        })
    }

    fn model_name(&self) -> &str {
        "stub-translator"
    }
}

struct StubImages;

#[async_trait]
impl ImageService for StubImages {
    async fn submit(&self, _prompt: &str) -> FabulaResult<String> {
        Ok("img-1".to_string())
    }

    async fn poll(&self, _external_job_id: &str) -> FabulaResult<ImageJobStatus> {
        Ok(ImageJobStatus::default())
    }

    async fn fetch(&self, _url: &str) -> FabulaResult<FetchedImage> {
        Ok(FetchedImage {
            data: vec![0xFF, 0xD8],
            mime_type: "image/jpeg".to_string(),
        })
    }
}

fn app(translator: Arc<StubTranslator>) -> Fabula {
    let config = FabulaConfig::from_toml_str(
        "[queue]\nidle_interval_secs = 60\nbusy_interval_secs = 0\n\n[translation]\npoll_attempts = 50\npoll_interval_ms = 10\n",
    )
    .expect("config parses");
    let clients = Clients {
        generator: Arc::new(StubGenerator),
        translator,
        images: Arc::new(StubImages),
        storage: None,
    };
    Fabula::new(config, Stores::in_memory(), clients)
}

async fn create_story(app: &Fabula) -> Story {
    let story = NewStoryBuilder::default()
        .premise("A lighthouse keeper hears knocking from below")
        .build()
        .expect("valid story");
    app.stores()
        .stories
        .create_story(story)
        .await
        .expect("story created")
}

#[tokio::test]
async fn test_tick_writes_chapter_and_submits_cover() {
    let app = app(Arc::new(StubTranslator::default()));
    let story = create_story(&app).await;

    let job = app.queue().enqueue_creation(story.id).await.unwrap();
    let outcome = app.queue().tick().await.unwrap();
    assert_eq!(
        outcome,
        TickOutcome::Processed {
            job_id: job.id,
            status: JobStatus::Completed
        }
    );

    let story = app.stores().stories.get_story(story.id).await.unwrap().unwrap();
    assert_eq!(story.chapter_count, 1);
    assert_eq!(story.title.as_deref(), Some("Night 1"));
    assert_eq!(story.image.status, ImageStatus::Generating);
    assert_eq!(story.image.external_job_id.as_deref(), Some("img-1"));

    let stats = app.logger().stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.total_tokens, 64);
}

#[tokio::test]
async fn test_translation_served_from_cache_on_repeat() {
    let translator = Arc::new(StubTranslator::default());
    let app = app(translator.clone());
    let story = create_story(&app).await;
    app.queue().enqueue_creation(story.id).await.unwrap();
    app.queue().tick().await.unwrap();

    let first = app
        .translations()
        .translate_now(story.id, 1, "fr")
        .await
        .unwrap();
    assert!(!first.from_cache);
    assert_eq!(first.content, "[fr] The lamps went out on night 1.");

    let second = app
        .translations()
        .translate_now(story.id, 1, "fr")
        .await
        .unwrap();
    assert!(second.from_cache);
    assert_eq!(second.content, first.content);
    assert_eq!(translator.calls.load(Ordering::SeqCst), 1);

    let status = app
        .translations()
        .translation_status(story.id, 1, "fr")
        .await
        .unwrap();
    assert_eq!(status, TranslationStatus::Completed);
}

#[tokio::test]
async fn test_server_drains_enqueued_job() {
    let app = app(Arc::new(StubTranslator::default()));
    let story = create_story(&app).await;

    let mut server = app.server();
    server.start().await.unwrap();
    assert!(server.is_running());

    let job = app.queue().enqueue_creation(story.id).await.unwrap();

    let mut completed = false;
    for _ in 0..200 {
        let current = app.stores().jobs.get_job(job.id).await.unwrap().unwrap();
        if current.status == JobStatus::Completed {
            completed = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(completed, "job was not processed by the running server");

    server.stop().await.unwrap();
    assert!(!server.is_running());
}
