//! In-memory translation cache store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fabula_core::{CachedHash, NewTranslationEntry, TranslationEntry, TranslationKey};
use fabula_error::{DatabaseError, DatabaseErrorKind, FabulaResult};
use fabula_interface::TranslationCacheStore;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

/// HashMap-backed [`TranslationCacheStore`].
///
/// Useful for tests and for running without a database. Writes can be made
/// to fail with a permission error to exercise the best-effort write path.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTranslationStore {
    entries: Arc<RwLock<HashMap<TranslationKey, TranslationEntry>>>,
    read_only: Arc<AtomicBool>,
}

impl InMemoryTranslationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every subsequent write with a permission error.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Number of stored entries (for testing).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if the store is empty (for testing).
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl TranslationCacheStore for InMemoryTranslationStore {
    async fn find(&self, key: &TranslationKey) -> FabulaResult<Option<TranslationEntry>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn find_hash(&self, key: &TranslationKey) -> FabulaResult<Option<CachedHash>> {
        Ok(self.entries.read().await.get(key).map(|entry| CachedHash {
            content_hash: entry.content_hash.clone(),
            expires_at: entry.expires_at,
        }))
    }

    async fn upsert(&self, entry: NewTranslationEntry) -> FabulaResult<TranslationEntry> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(DatabaseError::new(DatabaseErrorKind::PermissionDenied(
                "translation_cache is read-only".to_string(),
            ))
            .into());
        }

        let stored = TranslationEntry {
            key: entry.key.clone(),
            original_content: entry.original_content,
            translated_content: entry.translated_content,
            content_hash: entry.content_hash,
            quality_score: entry.quality_score,
            created_at: Utc::now(),
            expires_at: entry.expires_at,
        };
        self.entries.write().await.insert(entry.key, stored.clone());
        Ok(stored)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> FabulaResult<usize> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        Ok(before - entries.len())
    }
}
