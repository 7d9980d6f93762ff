//! Chapter generation queue.
//!
//! Jobs are claimed one at a time, oldest first, through the store's atomic
//! claim. A claimed job either completes (chapter persisted, story
//! aggregates updated) or records its failure; whether a failure returns
//! the job to `pending` is decided by the configured [`FailurePolicy`].
//!
//! [`FailurePolicy`]: crate::FailurePolicy

use crate::busy::BusyGuard;
use crate::conversation::{ConversationLogger, Exchange};
use crate::{ImageScheduler, QueueConfig, feedback_instruction};
use fabula_core::{
    ExchangeType, FeedbackPayload, GenerationJob, JobStatus, JobTrigger, Message, NewChapter,
    NewGenerationJob, StoryProgress,
};
use fabula_error::{DatabaseError, FabulaError, FabulaResult};
use fabula_interface::{ChapterGenerator, ChapterRequest, JobStore, StoryStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::sync::{Notify, watch};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Result of one queue tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No claimable job
    Idle,
    /// Another tick was already running
    Busy,
    /// One job was claimed and run
    Processed {
        /// The job
        job_id: Uuid,
        /// Its status afterwards
        status: JobStatus,
    },
}

/// Sequential executor of chapter generation jobs.
pub struct ChapterQueue {
    jobs: Arc<dyn JobStore>,
    stories: Arc<dyn StoryStore>,
    generator: Arc<dyn ChapterGenerator>,
    images: Option<Arc<ImageScheduler>>,
    logger: Option<ConversationLogger>,
    config: QueueConfig,
    wake: Notify,
    busy: AtomicBool,
}

impl std::fmt::Debug for ChapterQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChapterQueue")
            .field("config", &self.config)
            .field("model", &self.generator.model_name())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl ChapterQueue {
    /// Create a queue without image handoff or exchange logging.
    pub fn new(
        jobs: Arc<dyn JobStore>,
        stories: Arc<dyn StoryStore>,
        generator: Arc<dyn ChapterGenerator>,
        config: QueueConfig,
    ) -> Self {
        Self {
            jobs,
            stories,
            generator,
            images: None,
            logger: None,
            config,
            wake: Notify::new(),
            busy: AtomicBool::new(false),
        }
    }

    /// Hand image prompts from first chapters to `images`.
    pub fn with_images(mut self, images: Arc<ImageScheduler>) -> Self {
        self.images = Some(images);
        self
    }

    /// Record every generation exchange with `logger`.
    pub fn with_logger(mut self, logger: ConversationLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Whether a tick is running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Enqueue a job and wake the worker loop.
    ///
    /// Returns the live job already queued for the same chapter, if any,
    /// instead of creating a second one.
    #[instrument(skip(self, feedback))]
    pub async fn enqueue(
        &self,
        story_id: Uuid,
        chapter_number: i32,
        trigger: JobTrigger,
        feedback: Option<FeedbackPayload>,
    ) -> FabulaResult<GenerationJob> {
        if self.stories.get_story(story_id).await?.is_none() {
            return Err(DatabaseError::not_found(format!("story {}", story_id)).into());
        }

        let job = self
            .jobs
            .create_job(NewGenerationJob {
                story_id,
                chapter_number,
                trigger,
                feedback,
            })
            .await?;

        info!(job_id = %job.id, status = %job.status, "Job enqueued");
        self.wake.notify_one();
        Ok(job)
    }

    /// Enqueue the first chapter of a new story.
    pub async fn enqueue_creation(&self, story_id: Uuid) -> FabulaResult<GenerationJob> {
        let job = NewGenerationJob::creation(story_id);
        self.enqueue(job.story_id, job.chapter_number, job.trigger, job.feedback)
            .await
    }

    /// Enqueue a continuation steered by reader feedback.
    pub async fn enqueue_feedback(
        &self,
        story_id: Uuid,
        chapter_number: i32,
        feedback: Option<FeedbackPayload>,
    ) -> FabulaResult<GenerationJob> {
        self.enqueue(story_id, chapter_number, JobTrigger::Feedback, feedback)
            .await
    }

    /// Release jobs a previous process left in `processing`.
    #[instrument(skip(self))]
    pub async fn recover(&self) -> FabulaResult<usize> {
        let released = self
            .jobs
            .release_interrupted(*self.config.max_attempts())
            .await?;
        if released > 0 {
            warn!(released, "Released interrupted jobs");
        }
        Ok(released)
    }

    /// Claim and run at most one job.
    ///
    /// Generation and persistence failures are recorded on the job and
    /// reported through [`TickOutcome::Processed`]; only a failure to read or
    /// update the queue itself is returned as an error.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> FabulaResult<TickOutcome> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!("Queue tick already running");
            return Ok(TickOutcome::Busy);
        };

        let Some(job) = self.jobs.claim_next(*self.config.max_attempts()).await? else {
            return Ok(TickOutcome::Idle);
        };

        let status = self.process(&job).await?;
        Ok(TickOutcome::Processed {
            job_id: job.id,
            status,
        })
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Sleeps `idle_interval` after an empty tick and `busy_interval` after a
    /// processed one; an enqueue cuts either sleep short. A job in progress
    /// when shutdown is signalled runs to completion.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(model = self.generator.model_name(), "Chapter queue started");
        loop {
            if *shutdown.borrow() {
                break;
            }

            let pause = match self.tick().await {
                Ok(TickOutcome::Processed { .. }) => self.config.busy_interval(),
                Ok(_) => self.config.idle_interval(),
                Err(e) => {
                    error!(error = %e, "Queue tick failed");
                    self.config.idle_interval()
                }
            };

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        warn!("Shutdown sender dropped, stopping chapter queue");
                        break;
                    }
                }
            }
        }
        info!("Chapter queue stopped");
    }

    #[instrument(
        skip(self, job),
        fields(job_id = %job.id, story_id = %job.story_id, chapter_number = job.chapter_number, attempt = job.attempts)
    )]
    async fn process(&self, job: &GenerationJob) -> FabulaResult<JobStatus> {
        match self.execute(job).await {
            Ok(()) => match self.jobs.complete_job(job.id).await {
                Ok(job) => {
                    info!("Job completed");
                    Ok(job.status)
                }
                Err(e) => {
                    self.release_unrecorded(job, &e).await;
                    Err(e)
                }
            },
            Err(e) => {
                let requeue = self
                    .config
                    .failure_policy()
                    .requeues(job.attempts, *self.config.max_attempts());
                error!(error = %e, requeue, "Job failed");
                let job = self.jobs.fail_job(job.id, &e.to_string(), requeue).await?;
                Ok(job.status)
            }
        }
    }

    /// Hand a job whose completion could not be written back to the queue,
    /// so it is not stuck in `processing` until the next [`recover`](Self::recover).
    ///
    /// The chapter is already persisted; the next attempt finds it and only
    /// completes the job.
    async fn release_unrecorded(&self, job: &GenerationJob, cause: &FabulaError) {
        let requeue = job.attempts < *self.config.max_attempts();
        warn!(error = %cause, requeue, "Completion not recorded, releasing job");
        if let Err(e) = self
            .jobs
            .fail_job(job.id, &format!("completion not recorded: {}", cause), requeue)
            .await
        {
            error!(error = %e, "Job left processing until recovery");
        }
    }

    async fn execute(&self, job: &GenerationJob) -> FabulaResult<()> {
        let story = self
            .stories
            .get_story(job.story_id)
            .await?
            .ok_or_else(|| DatabaseError::not_found(format!("story {}", job.story_id)))?;

        if self
            .stories
            .get_chapter(story.id, job.chapter_number)
            .await?
            .is_some()
        {
            info!("Chapter already written, completing job");
            return Ok(());
        }

        let opening = job.is_first_chapter() && story.history.is_empty();
        let request = ChapterRequest {
            story: story.context(),
            chapter_number: job.chapter_number,
            history: story.history.clone(),
            feedback: (!opening).then(|| feedback_instruction(job.feedback.as_ref())),
        };

        let started = Instant::now();
        let generated = self.generator.generate_chapter(&request).await?;
        let latency = started.elapsed();
        debug!(latency_ms = latency.as_millis() as u64, title = %generated.draft.title, "Chapter generated");

        if let Some(logger) = &self.logger {
            logger
                .record(Exchange {
                    story_id: story.id,
                    chapter_number: job.chapter_number,
                    exchange_type: if opening {
                        ExchangeType::Creation
                    } else {
                        ExchangeType::Continuation
                    },
                    input: &generated.prompt,
                    output: &generated.raw_response,
                    model: self.generator.model_name(),
                    token_count: generated.token_count,
                    latency,
                })
                .await;
        }

        let mut history = request.history;
        history.push(Message::user(generated.prompt.as_str()));
        history.push(Message::assistant(generated.raw_response.as_str()));

        let draft = generated.draft;
        let progress = StoryProgress {
            history,
            chapter_count: job.chapter_number.max(story.chapter_count),
            title: story.title.is_none().then(|| draft.title.clone()),
        };

        self.stories
            .record_chapter(
                NewChapter {
                    story_id: story.id,
                    chapter_number: job.chapter_number,
                    title: draft.title,
                    body: draft.body,
                    metadata: draft.metadata,
                },
                progress,
            )
            .await?;

        if !job.is_first_chapter() {
            return Ok(());
        }
        if let (Some(images), Some(prompt)) = (&self.images, draft.image_prompt.as_deref()) {
            // Chapter is already persisted, so a failed handoff never fails the job
            match images.submit(story.id, prompt).await {
                Ok(status) => debug!(%status, "Cover image handed off"),
                Err(e) => warn!(error = %e, "Cover image handoff failed"),
            }
        }

        Ok(())
    }
}
