//! Retry eligibility for stalled cover images.

use chrono::{DateTime, Duration, Utc};
use fabula_core::{ImagePipelineState, MAX_IMAGE_RETRIES};

/// Minimum wait before each automatic resubmission.
///
/// The wait is indexed by the story's current `retry_count`; counts past the
/// end of the table reuse its last step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    steps: Vec<Duration>,
    max_retries: i32,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::from_minutes(&[10, 20, 60, 120, 180], MAX_IMAGE_RETRIES)
    }
}

impl RetrySchedule {
    /// Build a schedule from step lengths in minutes.
    ///
    /// `max_retries` is capped at [`MAX_IMAGE_RETRIES`]; an empty table means
    /// no wait at all.
    pub fn from_minutes(minutes: &[i64], max_retries: i32) -> Self {
        Self {
            steps: minutes.iter().map(|m| Duration::minutes(*m)).collect(),
            max_retries: max_retries.min(MAX_IMAGE_RETRIES),
        }
    }

    /// Required wait before the attempt following `retry_count` retries.
    pub fn delay_for(&self, retry_count: i32) -> Duration {
        let index = usize::try_from(retry_count.max(0)).unwrap_or(0);
        self.steps
            .get(index)
            .or_else(|| self.steps.last())
            .copied()
            .unwrap_or_else(Duration::zero)
    }

    /// Whether `state` may be resubmitted at `now`.
    ///
    /// False once `retry_count` reaches the cap; otherwise true iff the time
    /// since the last attempt (or `created_at` when there was none) is at
    /// least [`delay_for`](Self::delay_for) the current count.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{Duration, Utc};
    /// use fabula_core::ImagePipelineState;
    /// use fabula_worker::RetrySchedule;
    ///
    /// let now = Utc::now();
    /// let state = ImagePipelineState {
    ///     retry_count: 2,
    ///     last_attempt_at: Some(now - Duration::minutes(90)),
    ///     ..Default::default()
    /// };
    /// assert!(RetrySchedule::default().is_ready_for_retry(&state, now, now));
    /// ```
    pub fn is_ready_for_retry(
        &self,
        state: &ImagePipelineState,
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> bool {
        if state.retry_count >= self.max_retries {
            return false;
        }
        let since = state.last_attempt_at.unwrap_or(created_at);
        now - since >= self.delay_for(state.retry_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(retry_count: i32, minutes_ago: Option<i64>, now: DateTime<Utc>) -> ImagePipelineState {
        ImagePipelineState {
            retry_count,
            last_attempt_at: minutes_ago.map(|m| now - Duration::minutes(m)),
            ..Default::default()
        }
    }

    #[test]
    fn delays_follow_the_table() {
        let schedule = RetrySchedule::default();
        assert_eq!(schedule.delay_for(0), Duration::minutes(10));
        assert_eq!(schedule.delay_for(2), Duration::minutes(60));
        assert_eq!(schedule.delay_for(4), Duration::minutes(180));
        assert_eq!(schedule.delay_for(9), Duration::minutes(180));
    }

    #[test]
    fn ready_exactly_at_the_boundary() {
        let now = Utc::now();
        let schedule = RetrySchedule::default();
        assert!(schedule.is_ready_for_retry(&state(1, Some(20), now), now, now));
        assert!(!schedule.is_ready_for_retry(&state(1, Some(19), now), now, now));
    }

    #[test]
    fn never_ready_once_exhausted() {
        let now = Utc::now();
        let schedule = RetrySchedule::default();
        for count in [5, 6, 100] {
            assert!(!schedule.is_ready_for_retry(&state(count, Some(10_000), now), now, now));
        }
    }

    #[test]
    fn falls_back_to_creation_time() {
        let now = Utc::now();
        let schedule = RetrySchedule::default();
        let fresh = state(0, None, now);
        assert!(!schedule.is_ready_for_retry(&fresh, now - Duration::minutes(5), now));
        assert!(schedule.is_ready_for_retry(&fresh, now - Duration::minutes(15), now));
    }

    #[test]
    fn cap_never_exceeds_core_limit() {
        let now = Utc::now();
        let schedule = RetrySchedule::from_minutes(&[1], 50);
        assert!(!schedule.is_ready_for_retry(&state(MAX_IMAGE_RETRIES, Some(60), now), now, now));
    }
}
