//! Content-addressed translation cache.
//!
//! Translations are keyed by `(content_type, content_id, source_lang,
//! target_lang)` and stamped with a SHA-256 digest of the canonicalised source
//! text. A lookup is a hit only while the entry is unexpired and the digest of
//! the current source text still matches, so editing a chapter invalidates its
//! translations without any explicit purge.
//!
//! Writes are best-effort: a store that refuses the write is logged and the
//! caller keeps the freshly translated text.
//!
//! # Example
//!
//! ```
//! use fabula_cache::{CacheConfig, CacheLookup, InMemoryTranslationStore, TranslationCache};
//! use fabula_core::TranslationKey;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let cache = TranslationCache::new(
//!     Arc::new(InMemoryTranslationStore::new()),
//!     CacheConfig::default(),
//! );
//! let key = TranslationKey::new("chapter", "42", "en", "fr");
//!
//! cache.set(&key, "Hello", "Bonjour", None).await;
//! let lookup = cache.get(&key, "Hello").await.unwrap();
//! assert!(matches!(lookup, CacheLookup::Hit(ref entry) if entry.translated_content == "Bonjour"));
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod hash;
mod memory;

pub use cache::{CacheLookup, TranslationCache};
pub use config::{CacheConfig, CacheConfigBuilder};
pub use hash::{canonicalize, content_hash};
pub use memory::InMemoryTranslationStore;
