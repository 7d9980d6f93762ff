//! Image retry scheduler.
//!
//! Cover images go through an external service that accepts a prompt, works
//! on it for a while, and finally exposes a transient URL. Each tick the
//! scheduler:
//!
//! 1. polls every story in `generating` and moves it to `completed` (after
//!    copying the asset into durable storage) or `failed`;
//! 2. resubmits every story still in `none` that has a prompt, whose
//!    backoff step has elapsed and whose retries are not exhausted.
//!
//! The scheduler is the only writer of the image pipeline fields.

use crate::busy::BusyGuard;
use crate::{ImageConfig, RetrySchedule};
use chrono::Utc;
use fabula_core::{ImagePipelineState, ImageStatus, Story};
use fabula_error::{DatabaseError, FabulaResult};
use fabula_interface::{ImageService, StoryStore};
use fabula_storage::AssetStorage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// What one scheduler tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImageTickReport {
    /// In-flight jobs whose status was queried
    pub polled: usize,
    /// Stories moved to `completed`
    pub completed: usize,
    /// Stories moved to `failed`
    pub failed: usize,
    /// Stalled stories handed back to the service
    pub resubmitted: usize,
}

/// Drives cover images from prompt to durable URL.
pub struct ImageScheduler {
    stories: Arc<dyn StoryStore>,
    service: Arc<dyn ImageService>,
    storage: Option<Arc<dyn AssetStorage>>,
    schedule: RetrySchedule,
    config: ImageConfig,
    busy: AtomicBool,
}

impl std::fmt::Debug for ImageScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageScheduler")
            .field("schedule", &self.schedule)
            .field("config", &self.config)
            .field("durable_storage", &self.storage.is_some())
            .field("busy", &self.is_busy())
            .finish()
    }
}

impl ImageScheduler {
    /// Create a scheduler. Without durable storage, transient URLs are stored as-is.
    pub fn new(
        stories: Arc<dyn StoryStore>,
        service: Arc<dyn ImageService>,
        config: ImageConfig,
    ) -> Self {
        let schedule = RetrySchedule::from_minutes(config.backoff_minutes(), *config.max_retries());
        Self {
            stories,
            service,
            storage: None,
            schedule,
            config,
            busy: AtomicBool::new(false),
        }
    }

    /// Copy finished assets into `storage`.
    pub fn with_storage(mut self, storage: Arc<dyn AssetStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// Backoff table in use.
    pub fn schedule(&self) -> &RetrySchedule {
        &self.schedule
    }

    /// Whether a tick is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Request a cover image for a story.
    ///
    /// Only acts while the story is in `none`; any other state is returned
    /// unchanged. The prompt is stored either way, so a rejected submission
    /// is picked up again by the retry pass.
    #[instrument(skip(self, prompt), fields(story_id = %story_id))]
    pub async fn submit(&self, story_id: Uuid, prompt: &str) -> FabulaResult<ImageStatus> {
        let story = self.load(story_id).await?;
        if story.image.status != ImageStatus::None {
            debug!(status = %story.image.status, "Image already requested");
            return Ok(story.image.status);
        }

        let mut state = story.image;
        state.generation_prompt = Some(prompt.to_string());
        self.attempt(story_id, state, prompt).await
    }

    /// Run one tick, or return `None` if a tick is already running.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> FabulaResult<Option<ImageTickReport>> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!("Image tick already running");
            return Ok(None);
        };

        let mut report = ImageTickReport::default();
        self.poll_in_flight(&mut report).await?;
        self.retry_stalled(&mut report).await?;

        if report != ImageTickReport::default() {
            info!(
                polled = report.polled,
                completed = report.completed,
                failed = report.failed,
                resubmitted = report.resubmitted,
                "Image tick finished"
            );
        }
        Ok(Some(report))
    }

    /// Tick every `tick_interval` until `shutdown` flips to `true` or its
    /// sender is dropped.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.config.tick_interval_secs(), "Image scheduler started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            if let Err(e) = self.tick().await {
                warn!(error = %e, "Image tick failed");
            }
            tokio::select! {
                _ = tokio::time::sleep(self.config.tick_interval()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown sender dropped, stopping image scheduler");
                        break;
                    }
                }
            }
        }
        info!("Image scheduler stopped");
    }

    async fn load(&self, story_id: Uuid) -> FabulaResult<Story> {
        Ok(self
            .stories
            .get_story(story_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("story {}", story_id)))?)
    }

    async fn attempt(
        &self,
        story_id: Uuid,
        mut state: ImagePipelineState,
        prompt: &str,
    ) -> FabulaResult<ImageStatus> {
        let now = Utc::now();
        match self.service.submit(prompt).await {
            Ok(external_job_id) => {
                info!(%story_id, %external_job_id, retry_count = state.retry_count, "Image submitted");
                state.begin_generating(external_job_id, now);
            }
            Err(e) => {
                warn!(%story_id, error = %e, retry_count = state.retry_count, "Image submission rejected");
                state.record_failed_submission(now);
            }
        }

        self.stories.update_image_state(story_id, &state).await?;
        Ok(state.status)
    }

    async fn poll_in_flight(&self, report: &mut ImageTickReport) -> FabulaResult<()> {
        let in_flight = self
            .stories
            .stories_with_image_status(ImageStatus::Generating)
            .await?;

        for story in in_flight {
            let Some(external_job_id) = story.image.external_job_id.clone() else {
                continue;
            };
            report.polled += 1;

            let status = match self.service.poll(&external_job_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(story_id = %story.id, %external_job_id, error = %e, "Image poll failed");
                    continue;
                }
            };

            let mut state = story.image.clone();
            match (status.done, status.faulted, status.image_url) {
                (true, false, Some(transient_url)) => {
                    let url = self.persist(story.id, &transient_url).await;
                    if state.complete(url) && self.save(story.id, &state).await {
                        info!(story_id = %story.id, "Cover image completed");
                        report.completed += 1;
                    }
                }
                (true, _, _) | (_, true, _) => {
                    if state.fail() && self.save(story.id, &state).await {
                        warn!(story_id = %story.id, faulted = status.faulted, "Cover image failed");
                        report.failed += 1;
                    }
                }
                _ => {
                    debug!(story_id = %story.id, queue_position = ?status.queue_position, "Image still in flight");
                }
            }
        }
        Ok(())
    }

    async fn retry_stalled(&self, report: &mut ImageTickReport) -> FabulaResult<()> {
        let now = Utc::now();
        let stalled = self
            .stories
            .stories_with_image_status(ImageStatus::None)
            .await?;

        for story in stalled {
            let Some(prompt) = story.image.generation_prompt.clone() else {
                continue;
            };
            if !self
                .schedule
                .is_ready_for_retry(&story.image, story.created_at, now)
            {
                continue;
            }

            let mut state = story.image.clone();
            state.bump_retry();
            debug!(story_id = %story.id, retry_count = state.retry_count, "Resubmitting image");
            match self.attempt(story.id, state, &prompt).await {
                Ok(_) => report.resubmitted += 1,
                Err(e) => warn!(story_id = %story.id, error = %e, "Image retry not recorded"),
            }
        }
        Ok(())
    }

    /// Write `state` back; a failure is logged and skips only this story.
    async fn save(&self, story_id: Uuid, state: &ImagePipelineState) -> bool {
        match self.stories.update_image_state(story_id, state).await {
            Ok(()) => true,
            Err(e) => {
                warn!(%story_id, error = %e, status = %state.status, "Image state not saved");
                false
            }
        }
    }

    /// Copy the asset behind `transient_url` into durable storage.
    ///
    /// Falls back to the transient URL when there is no storage or the
    /// transfer fails.
    async fn persist(&self, story_id: Uuid, transient_url: &str) -> String {
        let Some(storage) = &self.storage else {
            return transient_url.to_string();
        };

        let stored = match self.service.fetch(transient_url).await {
            Ok(image) => storage.store(&image.data, &image.mime_type).await,
            Err(e) => Err(e),
        };

        match stored {
            Ok(asset) => {
                debug!(%story_id, content_hash = %asset.content_hash, "Stored cover image");
                storage.public_url(&asset)
            }
            Err(e) => {
                warn!(%story_id, error = %e, "Asset transfer failed, keeping transient URL");
                transient_url.to_string()
            }
        }
    }
}
