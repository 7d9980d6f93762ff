//! Translation cache records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four-part key a cached translation lives under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{}/{}/{}->{}", content_type, content_id, source_lang, target_lang)]
pub struct TranslationKey {
    /// Kind of content, e.g. `chapter`
    pub content_type: String,
    /// Id of the content within its kind
    pub content_id: String,
    /// Source language tag
    pub source_lang: String,
    /// Target language tag
    pub target_lang: String,
}

impl TranslationKey {
    /// Build a key.
    pub fn new(
        content_type: impl Into<String>,
        content_id: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            content_id: content_id.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }
}

/// A stored translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationEntry {
    /// Cache key
    pub key: TranslationKey,
    /// Source text at the time of translation
    pub original_content: String,
    /// Translated text
    pub translated_content: String,
    /// Digest of the canonicalised source text
    pub content_hash: String,
    /// Optional quality estimate from the translator
    pub quality_score: Option<f32>,
    /// Write time
    pub created_at: DateTime<Utc>,
    /// Entry stops being served after this instant
    pub expires_at: DateTime<Utc>,
}

impl TranslationEntry {
    /// Whether the entry is past its expiry at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Row written by an upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTranslationEntry {
    /// Cache key
    pub key: TranslationKey,
    /// Source text
    pub original_content: String,
    /// Translated text
    pub translated_content: String,
    /// Digest of the canonicalised source text
    pub content_hash: String,
    /// Optional quality estimate
    pub quality_score: Option<f32>,
    /// Expiry instant
    pub expires_at: DateTime<Utc>,
}

/// The hash and expiry of an entry, without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedHash {
    /// Stored digest
    pub content_hash: String,
    /// Stored expiry
    pub expires_at: DateTime<Utc>,
}

/// Progress of a requested translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum TranslationStatus {
    /// Nothing cached and nothing running
    NotRequested,
    /// Background translation running
    InProgress,
    /// A valid cached translation exists
    Completed,
    /// The last background attempt failed
    Failed(String),
}
