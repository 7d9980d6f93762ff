//! Cache configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Configuration for the translation cache.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct CacheConfig {
    /// Whether lookups and writes go to the store at all
    #[serde(default = "default_enabled")]
    enabled: bool,

    /// Lifetime of a written entry (days)
    #[serde(default = "default_ttl_days")]
    ttl_days: i64,

    /// Interval of the expiry sweep (seconds)
    #[serde(default = "default_cleanup_interval_secs")]
    cleanup_interval_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_ttl_days() -> i64 {
    30
}

fn default_cleanup_interval_secs() -> u64 {
    86_400 // daily
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_days: default_ttl_days(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl CacheConfig {
    /// Entry lifetime as a duration.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.ttl_days)
    }

    /// Sweep interval as a duration.
    pub fn cleanup_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.cleanup_interval_secs)
    }
}
