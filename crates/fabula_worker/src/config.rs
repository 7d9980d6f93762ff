//! Worker configuration.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What happens to a job whose attempt failed.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailurePolicy {
    /// Return the job to `pending` until it runs out of attempts
    #[default]
    Retry,
    /// Every failure is terminal
    FailFast,
}

impl FailurePolicy {
    /// Whether a job that just failed its `attempts`-th attempt goes back to `pending`.
    ///
    /// # Examples
    ///
    /// ```
    /// use fabula_worker::FailurePolicy;
    ///
    /// assert!(FailurePolicy::Retry.requeues(1, 3));
    /// assert!(!FailurePolicy::Retry.requeues(3, 3));
    /// assert!(!FailurePolicy::FailFast.requeues(1, 3));
    /// ```
    pub fn requeues(self, attempts: i32, max_attempts: i32) -> bool {
        match self {
            FailurePolicy::Retry => attempts < max_attempts,
            FailurePolicy::FailFast => false,
        }
    }
}

/// Chapter generation queue settings.
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
pub struct QueueConfig {
    /// Sleep after a tick that found nothing to do (seconds)
    #[serde(default = "default_idle_interval_secs")]
    idle_interval_secs: u64,

    /// Sleep after a tick that processed a job (seconds)
    #[serde(default = "default_busy_interval_secs")]
    busy_interval_secs: u64,

    /// A job is claimable while `attempts` is below this
    #[serde(default = "default_max_attempts")]
    max_attempts: i32,

    /// Retry or fail fast
    #[serde(default)]
    failure_policy: FailurePolicy,
}

fn default_idle_interval_secs() -> u64 {
    10
}

fn default_busy_interval_secs() -> u64 {
    1
}

fn default_max_attempts() -> i32 {
    3
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            idle_interval_secs: default_idle_interval_secs(),
            busy_interval_secs: default_busy_interval_secs(),
            max_attempts: default_max_attempts(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl QueueConfig {
    /// Idle sleep as a duration.
    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }

    /// Post-job sleep as a duration.
    pub fn busy_interval(&self) -> Duration {
        Duration::from_secs(self.busy_interval_secs)
    }
}

/// Image retry scheduler settings.
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
pub struct ImageConfig {
    /// Scheduler tick interval (seconds)
    #[serde(default = "default_tick_interval_secs")]
    tick_interval_secs: u64,

    /// Minimum wait before retry `n`, indexed by retry count (minutes)
    #[serde(default = "default_backoff_minutes")]
    backoff_minutes: Vec<i64>,

    /// Automatic resubmissions stop at this retry count
    #[serde(default = "default_max_retries")]
    max_retries: i32,
}

fn default_tick_interval_secs() -> u64 {
    10
}

fn default_backoff_minutes() -> Vec<i64> {
    vec![10, 20, 60, 120, 180]
}

fn default_max_retries() -> i32 {
    fabula_core::MAX_IMAGE_RETRIES
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            backoff_minutes: default_backoff_minutes(),
            max_retries: default_max_retries(),
        }
    }
}

impl ImageConfig {
    /// Tick interval as a duration.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }
}

/// Translation service settings.
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
pub struct TranslationConfig {
    /// Status checks performed by a bounded wait
    #[serde(default = "default_poll_attempts")]
    poll_attempts: u32,

    /// Pause between status checks (milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    poll_interval_ms: u64,
}

fn default_poll_attempts() -> u32 {
    30
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            poll_attempts: default_poll_attempts(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl TranslationConfig {
    /// Pause between status checks as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
