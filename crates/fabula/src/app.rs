//! Wiring of stores, clients and workers into one application.

use crate::{FabulaConfig, Stores};
use fabula_cache::TranslationCache;
use fabula_error::FabulaResult;
use fabula_interface::{ChapterGenerator, ImageService, Translator};
use fabula_models::{ChatClient, ImageServiceClient};
use fabula_storage::{AssetStorage, FileSystemStorage};
use fabula_worker::{
    ChapterQueue, ConversationLogger, ImageScheduler, TranslationService, WorkerServer,
};
use std::sync::Arc;
use tracing::info;

/// External services the workers call.
#[derive(Clone)]
pub struct Clients {
    /// Writes chapters
    pub generator: Arc<dyn ChapterGenerator>,
    /// Translates chapters
    pub translator: Arc<dyn Translator>,
    /// Generates cover images
    pub images: Arc<dyn ImageService>,
    /// Durable cover storage, transient URLs are kept without it
    pub storage: Option<Arc<dyn AssetStorage>>,
}

impl Clients {
    /// HTTP clients and filesystem storage built from `config`.
    pub fn from_config(config: &FabulaConfig) -> FabulaResult<Self> {
        let chat = Arc::new(ChatClient::new(config.generation().clone())?);
        let images = Arc::new(ImageServiceClient::new(config.image_service().clone())?);

        let mut storage = FileSystemStorage::new(config.storage().path())?;
        if let Some(url) = config.storage().public_base_url() {
            storage = storage.with_public_base_url(url.as_str());
        }

        Ok(Self {
            generator: chat.clone(),
            translator: chat,
            images,
            storage: Some(Arc::new(storage)),
        })
    }
}

/// A fully wired Fabula instance.
pub struct Fabula {
    config: FabulaConfig,
    stores: Stores,
    queue: Arc<ChapterQueue>,
    images: Arc<ImageScheduler>,
    translations: Arc<TranslationService>,
    cache: TranslationCache,
    logger: ConversationLogger,
}

impl std::fmt::Debug for Fabula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fabula")
            .field("queue", &self.queue)
            .field("images", &self.images)
            .field("translations", &self.translations)
            .finish_non_exhaustive()
    }
}

impl Fabula {
    /// Wire the workers over `stores` and `clients`.
    pub fn new(config: FabulaConfig, stores: Stores, clients: Clients) -> Self {
        let logger = ConversationLogger::new(stores.logs.clone());
        let cache = TranslationCache::new(stores.translations.clone(), config.cache().clone());

        let mut images = ImageScheduler::new(
            stores.stories.clone(),
            clients.images,
            config.images().clone(),
        );
        if let Some(storage) = clients.storage {
            images = images.with_storage(storage);
        }
        let images = Arc::new(images);

        let queue = ChapterQueue::new(
            stores.jobs.clone(),
            stores.stories.clone(),
            clients.generator,
            config.queue().clone(),
        )
        .with_images(images.clone())
        .with_logger(logger.clone());

        let translations = TranslationService::new(
            stores.stories.clone(),
            clients.translator,
            cache.clone(),
            config.translation().clone(),
        )
        .with_logger(logger.clone());

        Self {
            config,
            stores,
            queue: Arc::new(queue),
            images,
            translations: Arc::new(translations),
            cache,
            logger,
        }
    }

    /// Open stores and clients as configured.
    pub fn from_config(config: FabulaConfig) -> FabulaResult<Self> {
        let stores = Stores::open(config.database())?;
        let clients = Clients::from_config(&config)?;
        info!(model = config.generation().model(), "Fabula initialised");
        Ok(Self::new(config, stores, clients))
    }

    /// A stopped server running every background loop.
    pub fn server(&self) -> WorkerServer {
        WorkerServer::new(self.queue.clone())
            .with_images(self.images.clone())
            .with_cache_sweep(self.cache.clone())
            .with_translations(self.translations.clone())
    }

    /// Active configuration.
    pub fn config(&self) -> &FabulaConfig {
        &self.config
    }

    /// Underlying stores.
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Chapter generation queue.
    pub fn queue(&self) -> &Arc<ChapterQueue> {
        &self.queue
    }

    /// Cover image scheduler.
    pub fn images(&self) -> &Arc<ImageScheduler> {
        &self.images
    }

    /// Translation service.
    pub fn translations(&self) -> &Arc<TranslationService> {
        &self.translations
    }

    /// Translation cache.
    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Conversation logger.
    pub fn logger(&self) -> &ConversationLogger {
        &self.logger
    }
}
