//! Tests for the translation cache.

use fabula_cache::{
    CacheConfig, CacheLookup, InMemoryTranslationStore, TranslationCache, content_hash,
};
use fabula_core::TranslationKey;
use std::sync::Arc;

fn cache_with(config: CacheConfig) -> (TranslationCache, InMemoryTranslationStore) {
    let store = InMemoryTranslationStore::new();
    let cache = TranslationCache::new(Arc::new(store.clone()), config);
    (cache, store)
}

fn key() -> TranslationKey {
    TranslationKey::new("chapter", "b7c1", "en", "es")
}

const SOURCE: &str = "The lighthouse keeper opened the door in the sea.";

#[tokio::test]
async fn test_round_trip_hit() {
    let (cache, _) = cache_with(CacheConfig::default());

    let stored = cache
        .set(&key(), SOURCE, "El farero abrió la puerta en el mar.", Some(0.92))
        .await
        .unwrap();
    assert_eq!(stored.content_hash, content_hash(SOURCE));

    match cache.get(&key(), SOURCE).await.unwrap() {
        CacheLookup::Hit(entry) => {
            assert_eq!(entry.translated_content, "El farero abrió la puerta en el mar.");
            assert_eq!(entry.quality_score, Some(0.92));
        }
        CacheLookup::Miss => panic!("expected a hit"),
    }
}

#[tokio::test]
async fn test_changed_source_misses_before_expiry() {
    let (cache, store) = cache_with(CacheConfig::default());
    cache.set(&key(), SOURCE, "El farero...", None).await.unwrap();

    let edited = "The lighthouse keeper sealed the door in the sea.";
    assert_eq!(cache.get(&key(), edited).await.unwrap(), CacheLookup::Miss);
    assert!(!cache.is_cache_valid(&key(), edited).await.unwrap());

    // The stale row is still there under the same key
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_cosmetic_whitespace_still_hits() {
    let (cache, _) = cache_with(CacheConfig::default());
    cache.set(&key(), SOURCE, "El farero...", None).await.unwrap();

    let reformatted = format!("{}  \r\n", SOURCE);
    assert!(cache.get(&key(), &reformatted).await.unwrap().is_hit());
}

#[tokio::test]
async fn test_upsert_overwrites() {
    let (cache, store) = cache_with(CacheConfig::default());
    cache.set(&key(), SOURCE, "first", None).await.unwrap();

    let edited = "An entirely new opening line.";
    cache.set(&key(), edited, "second", None).await.unwrap();

    assert_eq!(store.len().await, 1);
    let entry = cache.get(&key(), edited).await.unwrap().into_entry().unwrap();
    assert_eq!(entry.translated_content, "second");
    assert_eq!(cache.get(&key(), SOURCE).await.unwrap(), CacheLookup::Miss);
}

#[tokio::test]
async fn test_expired_entry_misses_and_is_swept() {
    let (cache, store) = cache_with(CacheConfig::default().with_ttl_days(0));
    cache.set(&key(), SOURCE, "El farero...", None).await.unwrap();

    assert_eq!(cache.get(&key(), SOURCE).await.unwrap(), CacheLookup::Miss);
    assert!(!cache.is_cache_valid(&key(), SOURCE).await.unwrap());

    assert_eq!(cache.cleanup_expired().await.unwrap(), 1);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_sweep_keeps_live_entries() {
    let (cache, store) = cache_with(CacheConfig::default());
    cache.set(&key(), SOURCE, "El farero...", None).await.unwrap();

    assert_eq!(cache.cleanup_expired().await.unwrap(), 0);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_permission_denied_write_is_swallowed() {
    let (cache, store) = cache_with(CacheConfig::default());
    store.set_read_only(true);

    assert!(cache.set(&key(), SOURCE, "El farero...", None).await.is_none());
    assert!(store.is_empty().await);
    assert_eq!(cache.get(&key(), SOURCE).await.unwrap(), CacheLookup::Miss);
}

#[tokio::test]
async fn test_validity_check_matches_hit() {
    let (cache, _) = cache_with(CacheConfig::default());
    assert!(!cache.is_cache_valid(&key(), SOURCE).await.unwrap());

    cache.set(&key(), SOURCE, "El farero...", None).await.unwrap();
    assert!(cache.is_cache_valid(&key(), SOURCE).await.unwrap());
}

#[tokio::test]
async fn test_disabled_cache_never_hits() {
    let (cache, store) = cache_with(CacheConfig::default().with_enabled(false));

    assert!(cache.set(&key(), SOURCE, "El farero...", None).await.is_none());
    assert!(store.is_empty().await);
    assert_eq!(cache.get(&key(), SOURCE).await.unwrap(), CacheLookup::Miss);
}

#[tokio::test]
async fn test_keys_are_independent() {
    let (cache, _) = cache_with(CacheConfig::default());
    cache.set(&key(), SOURCE, "español", None).await.unwrap();

    let french = TranslationKey::new("chapter", "b7c1", "en", "fr");
    assert_eq!(cache.get(&french, SOURCE).await.unwrap(), CacheLookup::Miss);
}
