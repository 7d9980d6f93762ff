//! Translation cache read and write paths.

use crate::{CacheConfig, content_hash};
use chrono::Utc;
use fabula_core::{NewTranslationEntry, TranslationEntry, TranslationKey};
use fabula_error::FabulaResult;
use fabula_interface::TranslationCacheStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// A valid translation of the current source text
    Hit(TranslationEntry),
    /// Nothing usable: absent, expired, or stale
    Miss,
}

impl CacheLookup {
    /// Whether this is a hit.
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    /// The entry, if this is a hit.
    pub fn into_entry(self) -> Option<TranslationEntry> {
        match self {
            CacheLookup::Hit(entry) => Some(entry),
            CacheLookup::Miss => None,
        }
    }
}

/// Translation cache over a [`TranslationCacheStore`].
#[derive(Clone)]
pub struct TranslationCache {
    store: Arc<dyn TranslationCacheStore>,
    config: CacheConfig,
}

impl std::fmt::Debug for TranslationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TranslationCache {
    /// Create a cache over `store`.
    pub fn new(store: Arc<dyn TranslationCacheStore>, config: CacheConfig) -> Self {
        Self { store, config }
    }

    /// Active configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a translation of `original_content`.
    ///
    /// Hits require an unexpired entry whose stored digest equals the digest
    /// of `original_content`. A stale entry is left in place; the next
    /// [`set`](Self::set) overwrites it.
    #[instrument(skip(self, original_content), fields(%key))]
    pub async fn get(
        &self,
        key: &TranslationKey,
        original_content: &str,
    ) -> FabulaResult<CacheLookup> {
        if !*self.config.enabled() {
            return Ok(CacheLookup::Miss);
        }

        let Some(entry) = self.store.find(key).await? else {
            debug!("Cache miss: no entry");
            return Ok(CacheLookup::Miss);
        };

        if entry.is_expired(Utc::now()) {
            debug!(expires_at = %entry.expires_at, "Cache miss: expired");
            return Ok(CacheLookup::Miss);
        }

        if entry.content_hash != content_hash(original_content) {
            debug!("Cache miss: source text changed");
            return Ok(CacheLookup::Miss);
        }

        debug!("Cache hit");
        Ok(CacheLookup::Hit(entry))
    }

    /// Store a translation, best-effort.
    ///
    /// Returns the stored entry, or `None` when caching is disabled or the
    /// store rejected the write. Failures are logged and never returned, so
    /// callers always keep the translation they just produced.
    #[instrument(skip(self, original_content, translated_content), fields(%key))]
    pub async fn set(
        &self,
        key: &TranslationKey,
        original_content: &str,
        translated_content: &str,
        quality_score: Option<f32>,
    ) -> Option<TranslationEntry> {
        if !*self.config.enabled() {
            return None;
        }

        let entry = NewTranslationEntry {
            key: key.clone(),
            original_content: original_content.to_string(),
            translated_content: translated_content.to_string(),
            content_hash: content_hash(original_content),
            quality_score,
            expires_at: Utc::now() + self.config.ttl(),
        };

        match self.store.upsert(entry).await {
            Ok(stored) => {
                debug!(expires_at = %stored.expires_at, "Cached translation");
                Some(stored)
            }
            Err(e) if e.is_permission_denied() => {
                warn!(error = %e, "Cache write denied, serving uncached translation");
                None
            }
            Err(e) => {
                warn!(error = %e, "Cache write failed, serving uncached translation");
                None
            }
        }
    }

    /// Whether the cached digest under `key` still matches `original_content`,
    /// without loading the translated payload.
    #[instrument(skip(self, original_content), fields(%key))]
    pub async fn is_cache_valid(
        &self,
        key: &TranslationKey,
        original_content: &str,
    ) -> FabulaResult<bool> {
        if !*self.config.enabled() {
            return Ok(false);
        }

        Ok(self
            .store
            .find_hash(key)
            .await?
            .is_some_and(|cached| {
                Utc::now() < cached.expires_at && cached.content_hash == content_hash(original_content)
            }))
    }

    /// Delete every expired entry, returning how many were removed.
    #[instrument(skip(self))]
    pub async fn cleanup_expired(&self) -> FabulaResult<usize> {
        let removed = self.store.delete_expired(Utc::now()).await?;
        if removed > 0 {
            info!(removed, "Swept expired translations");
        }
        Ok(removed)
    }
}
