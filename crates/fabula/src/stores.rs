//! Store selection: PostgreSQL when configured, memory otherwise.

use crate::DatabaseConfig;
use fabula_cache::InMemoryTranslationStore;
use fabula_error::FabulaResult;
use fabula_interface::{ConversationLogStore, JobStore, StoryStore, TranslationCacheStore};
use fabula_worker::{InMemoryConversationLog, InMemoryJobStore, InMemoryStoryStore};
use std::sync::Arc;
use tracing::{info, warn};

/// One handle per store trait.
#[derive(Clone)]
pub struct Stores {
    /// Generation jobs
    pub jobs: Arc<dyn JobStore>,
    /// Stories and chapters
    pub stories: Arc<dyn StoryStore>,
    /// Translation cache rows
    pub translations: Arc<dyn TranslationCacheStore>,
    /// Conversation log
    pub logs: Arc<dyn ConversationLogStore>,
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

impl Stores {
    /// Volatile stores; everything is lost on exit.
    pub fn in_memory() -> Self {
        Self {
            jobs: Arc::new(InMemoryJobStore::new()),
            stories: Arc::new(InMemoryStoryStore::new()),
            translations: Arc::new(InMemoryTranslationStore::new()),
            logs: Arc::new(InMemoryConversationLog::new()),
        }
    }

    /// Every store backed by one PostgreSQL pool.
    #[cfg(feature = "database")]
    pub fn postgres(database_url: &str, pool_size: u32) -> FabulaResult<Self> {
        let pool = fabula_database::establish_pool(database_url, pool_size)?;
        let store = Arc::new(fabula_database::PostgresStore::new(pool));
        Ok(Self {
            jobs: store.clone(),
            stories: store.clone(),
            translations: store.clone(),
            logs: store,
        })
    }

    /// PostgreSQL when a URL is configured and the `database` feature is on.
    pub fn open(config: &DatabaseConfig) -> FabulaResult<Self> {
        match config.resolved_url() {
            #[cfg(feature = "database")]
            Some(url) => {
                info!(pool_size = config.pool_size(), "Using PostgreSQL stores");
                Self::postgres(&url, *config.pool_size())
            }
            #[cfg(not(feature = "database"))]
            Some(_) => {
                warn!("Database URL ignored: built without the database feature");
                Ok(Self::in_memory())
            }
            None => {
                warn!("No database configured, using in-memory stores");
                Ok(Self::in_memory())
            }
        }
    }
}
