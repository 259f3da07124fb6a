//! Retry policy: decides backoff delays.

use std::time::Duration;

/// Linear backoff: the n-th retry waits `base_delay * n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn linear(base_delay: Duration) -> Self {
        Self { base_delay }
    }

    /// Delay before the next attempt.
    ///
    /// `retry_count` is the already-incremented failure count (1 for the
    /// first retry). With base_delay=5s: 5s, 10s, 15s, ...
    pub fn next_delay(&self, retry_count: u32) -> Duration {
        self.base_delay.saturating_mul(retry_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, 5)]
    #[case(2, 10)]
    #[case(3, 15)]
    fn linear_backoff_scales_with_attempt(#[case] retry_count: u32, #[case] expected_secs: u64) {
        let policy = RetryPolicy::linear(Duration::from_secs(5));
        assert_eq!(policy.next_delay(retry_count), Duration::from_secs(expected_secs));
    }

    #[test]
    fn zero_base_delay_retries_immediately() {
        let policy = RetryPolicy::linear(Duration::ZERO);
        assert_eq!(policy.next_delay(4), Duration::ZERO);
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let policy = RetryPolicy::linear(Duration::MAX);
        assert_eq!(policy.next_delay(2), Duration::MAX);
    }
}
