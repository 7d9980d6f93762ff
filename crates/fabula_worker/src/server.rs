//! Worker server lifecycle.

use crate::{ChapterQueue, ImageScheduler, TranslationService};
use fabula_cache::TranslationCache;
use fabula_error::{FabulaResult, WorkerError, WorkerErrorKind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

/// Owns the background loops: chapter queue, image scheduler, cache sweep.
///
/// Nothing runs until [`start`](Self::start). [`stop`](Self::stop) signals
/// every loop and waits for it, so a job that is mid-generation finishes
/// before `stop` returns. Dropping a running server signals the loops too,
/// but does not wait for them.
pub struct WorkerServer {
    queue: Arc<ChapterQueue>,
    images: Option<Arc<ImageScheduler>>,
    cache: Option<TranslationCache>,
    translations: Option<Arc<TranslationService>>,
    shutdown: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for WorkerServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerServer")
            .field("queue", &self.queue)
            .field("images", &self.images)
            .field("running", &self.is_running())
            .field("tasks", &self.handles.len())
            .finish()
    }
}

impl WorkerServer {
    /// A server that runs only the chapter queue.
    pub fn new(queue: Arc<ChapterQueue>) -> Self {
        Self {
            queue,
            images: None,
            cache: None,
            translations: None,
            shutdown: None,
            handles: Vec::new(),
        }
    }

    /// Also run the image scheduler.
    pub fn with_images(mut self, images: Arc<ImageScheduler>) -> Self {
        self.images = Some(images);
        self
    }

    /// Also sweep expired translations every `cleanup_interval`.
    pub fn with_cache_sweep(mut self, cache: TranslationCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Prune settled background translations on every sweep.
    pub fn with_translations(mut self, translations: Arc<TranslationService>) -> Self {
        self.translations = Some(translations);
        self
    }

    /// Whether the loops are running.
    pub fn is_running(&self) -> bool {
        self.shutdown.is_some()
    }

    /// Release interrupted jobs, then spawn the loops.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> FabulaResult<()> {
        if self.is_running() {
            return Err(WorkerError::new(WorkerErrorKind::AlreadyRunning).into());
        }

        self.queue.recover().await?;

        let (tx, rx) = watch::channel(false);
        self.handles
            .push(tokio::spawn(Arc::clone(&self.queue).run(rx.clone())));

        if let Some(images) = &self.images {
            self.handles
                .push(tokio::spawn(Arc::clone(images).run(rx.clone())));
        }

        if let Some(cache) = &self.cache {
            if *cache.config().enabled() || self.translations.is_some() {
                self.handles.push(tokio::spawn(sweep_loop(
                    cache.clone(),
                    self.translations.clone(),
                    rx.clone(),
                )));
            }
        }

        self.shutdown = Some(tx);
        info!(tasks = self.handles.len(), "Worker server started");
        Ok(())
    }

    /// Signal shutdown and wait for every loop to exit.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> FabulaResult<()> {
        let Some(tx) = self.shutdown.take() else {
            return Err(WorkerError::new(WorkerErrorKind::NotRunning).into());
        };

        // Receivers may already be gone if a loop panicked
        let _ = tx.send(true);

        let mut first_failure = None;
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker task ended abnormally");
                first_failure.get_or_insert_with(|| e.to_string());
            }
        }

        info!("Worker server stopped");
        match first_failure {
            Some(message) => Err(WorkerError::new(WorkerErrorKind::Join(message)).into()),
            None => Ok(()),
        }
    }
}

impl Drop for WorkerServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            warn!("Worker server dropped while running, signalling loops to stop");
            let _ = tx.send(true);
        }
    }
}

async fn sweep_loop(
    cache: TranslationCache,
    translations: Option<Arc<TranslationService>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let period = cache.config().cleanup_interval().max(Duration::from_secs(1));
    let mut interval = tokio::time::interval(period);
    debug!(period = ?interval.period(), "Cache sweep started");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if *cache.config().enabled() {
                    if let Err(e) = cache.cleanup_expired().await {
                        warn!(error = %e, "Cache sweep failed");
                    }
                }
                if let Some(translations) = &translations {
                    translations.prune_settled().await;
                }
            }
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }
    }
    debug!("Cache sweep stopped");
}
