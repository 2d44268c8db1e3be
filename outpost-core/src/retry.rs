//! Retry policy: a pure function from failure history to the next action.
//!
//! The backoff schedule is exponential with a capped exponent
//! (base × 2^0 up to base × 2^11 by default), so repeated failures space
//! retries out instead of hot-looping against a down destination.

use time::{Duration, OffsetDateTime};

/// Maximum backoff exponent (2^11 = 2048 seconds at a 1s base).
pub const MAX_BACKOFF_EXPONENT: u32 = 11;

/// Decision for a failed event awaiting another automatic attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Under the retry cap and past the backoff window.
    Eligible,
    /// Under the retry cap but still inside the backoff window; due at the
    /// contained time.
    Backoff(OffsetDateTime),
    /// Retries exhausted. Only a manual retry can revive the event.
    Dead,
}

/// Backoff schedule and retry-cap assessment.
///
/// No side effects; both methods are pure so the policy can be exercised by
/// enumerating `(retry_count, max_retries, elapsed)` triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay multiplier for the exponential schedule.
    pub base: Duration,
    /// Exponent cap; the delay stops growing past this many failures.
    pub max_exponent: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::seconds(1),
            max_exponent: MAX_BACKOFF_EXPONENT,
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `retry_count` failures.
    /// Monotonically non-decreasing in `retry_count`.
    pub fn backoff_delay(&self, retry_count: i32) -> Duration {
        let exp = (retry_count.max(0) as u32).min(self.max_exponent);
        let factor = 2i32.checked_pow(exp).unwrap_or(i32::MAX);
        self.base * factor
    }

    /// Decide whether a failed event may be attempted again at `now`.
    ///
    /// `last_attempt` is the time of the most recent failure; `None` means
    /// the event has never been attempted and is immediately eligible.
    pub fn assess(
        &self,
        retry_count: i32,
        max_retries: i32,
        last_attempt: Option<OffsetDateTime>,
        now: OffsetDateTime,
    ) -> RetryDecision {
        if retry_count >= max_retries {
            return RetryDecision::Dead;
        }
        let Some(last) = last_attempt else {
            return RetryDecision::Eligible;
        };
        let due = last + self.backoff_delay(retry_count);
        if now >= due {
            RetryDecision::Eligible
        } else {
            RetryDecision::Backoff(due)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_delay_doubles_up_to_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::seconds(1));
        assert_eq!(policy.backoff_delay(1), Duration::seconds(2));
        assert_eq!(policy.backoff_delay(2), Duration::seconds(4));
        assert_eq!(policy.backoff_delay(10), Duration::seconds(1024));
        assert_eq!(policy.backoff_delay(11), Duration::seconds(2048));
        // Capped at the max exponent.
        assert_eq!(policy.backoff_delay(12), Duration::seconds(2048));
        assert_eq!(policy.backoff_delay(100), Duration::seconds(2048));
    }

    #[test]
    fn backoff_delay_is_monotonic() {
        let policy = RetryPolicy::default();
        let mut previous = Duration::ZERO;
        for retry_count in 0..32 {
            let delay = policy.backoff_delay(retry_count);
            assert!(delay >= previous, "delay shrank at retry {retry_count}");
            previous = delay;
        }
    }

    #[test]
    fn negative_retry_count_is_treated_as_zero() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(-3), policy.backoff_delay(0));
    }

    #[test]
    fn dead_at_or_past_the_cap() {
        let policy = RetryPolicy::default();
        let now = OffsetDateTime::UNIX_EPOCH;
        assert_eq!(policy.assess(3, 3, Some(now), now), RetryDecision::Dead);
        assert_eq!(policy.assess(5, 3, Some(now), now), RetryDecision::Dead);
        assert_eq!(policy.assess(0, 0, None, now), RetryDecision::Dead);
    }

    #[test]
    fn never_attempted_is_immediately_eligible() {
        let policy = RetryPolicy::default();
        let now = OffsetDateTime::UNIX_EPOCH;
        assert_eq!(policy.assess(0, 3, None, now), RetryDecision::Eligible);
    }

    #[test]
    fn eligibility_follows_the_backoff_window() {
        let policy = RetryPolicy::default();
        let failed_at = OffsetDateTime::UNIX_EPOCH;
        // One failure: next attempt is due 2 seconds after it.
        let due = failed_at + Duration::seconds(2);
        assert_eq!(
            policy.assess(1, 3, Some(failed_at), failed_at + Duration::seconds(1)),
            RetryDecision::Backoff(due)
        );
        assert_eq!(
            policy.assess(1, 3, Some(failed_at), due),
            RetryDecision::Eligible
        );
        assert_eq!(
            policy.assess(1, 3, Some(failed_at), failed_at + Duration::seconds(30)),
            RetryDecision::Eligible
        );
    }

    #[test]
    fn zero_base_disables_backoff() {
        let policy = RetryPolicy {
            base: Duration::ZERO,
            max_exponent: MAX_BACKOFF_EXPONENT,
        };
        let now = OffsetDateTime::UNIX_EPOCH;
        assert_eq!(
            policy.assess(2, 5, Some(now), now),
            RetryDecision::Eligible
        );
    }
}
