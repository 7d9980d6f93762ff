//! Configuration layering tests.

use fabula::{FabulaConfig, FabulaErrorKind, FailurePolicy};
use std::time::Duration;

#[test]
fn test_bundled_defaults() {
    let config = FabulaConfig::bundled().expect("bundled config parses");

    assert_eq!(*config.queue().max_attempts(), 3);
    assert_eq!(*config.queue().failure_policy(), FailurePolicy::Retry);
    assert_eq!(config.queue().idle_interval(), Duration::from_secs(10));
    assert_eq!(config.images().backoff_minutes(), &vec![10, 20, 60, 120, 180]);
    assert_eq!(*config.images().max_retries(), 5);
    assert_eq!(*config.translation().poll_attempts(), 30);
    assert_eq!(*config.translation().poll_interval_ms(), 2000);
    assert!(*config.cache().enabled());
    assert_eq!(*config.cache().ttl_days(), 30);
    assert_eq!(*config.database().pool_size(), 10);
    assert!(config.database().url().is_none());
}

#[test]
fn test_toml_overrides_single_keys() {
    let config = FabulaConfig::from_toml_str(
        r#"
        [queue]
        max_attempts = 5
        failure_policy = "fail_fast"

        [cache]
        enabled = false
        "#,
    )
    .expect("override parses");

    assert_eq!(*config.queue().max_attempts(), 5);
    assert_eq!(*config.queue().failure_policy(), FailurePolicy::FailFast);
    // Untouched keys of an overridden section keep their defaults
    assert_eq!(*config.queue().busy_interval_secs(), 1);
    assert!(!*config.cache().enabled());
    assert_eq!(*config.cache().ttl_days(), 30);
}

#[test]
fn test_explicit_file_is_layered() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("custom.toml");
    std::fs::write(
        &path,
        "[images]\nbackoff_minutes = [1, 2]\n\n[storage]\npath = \"/srv/covers\"\n",
    )
    .expect("write config");

    let config = FabulaConfig::load_with(Some(&path)).expect("explicit file loads");

    assert_eq!(config.images().backoff_minutes(), &vec![1, 2]);
    assert_eq!(config.storage().path().to_str(), Some("/srv/covers"));
    assert_eq!(*config.translation().poll_attempts(), 30);
}

#[test]
fn test_missing_explicit_file_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.toml");

    let err = FabulaConfig::load_with(Some(&path)).unwrap_err();
    assert!(matches!(err.kind(), FabulaErrorKind::Config(_)));
}

#[test]
fn test_malformed_toml_errors() {
    let err = FabulaConfig::from_toml_str("[queue\nmax_attempts = ").unwrap_err();
    assert!(matches!(err.kind(), FabulaErrorKind::Config(_)));
}
