//! Bounded reconnect accounting.

use std::time::Duration;

/// Default number of failed connect cycles before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between connect cycles.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// What to do after a failed connect cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then try again.
    RetryAfter(Duration),
    /// The budget is spent.
    Exhausted { attempts: u32 },
}

/// Counts consecutive failed cycles. A successful connect resets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    failures: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            failures: 0,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Consecutive failures so far.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_failure(&mut self) -> RetryDecision {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.max_attempts {
            RetryDecision::Exhausted {
                attempts: self.failures,
            }
        } else {
            RetryDecision::RetryAfter(self.delay)
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_failures_exhaust_by_default() {
        let mut policy = RetryPolicy::default();
        assert_eq!(
            policy.record_failure(),
            RetryDecision::RetryAfter(Duration::from_secs(5))
        );
        assert_eq!(
            policy.record_failure(),
            RetryDecision::RetryAfter(Duration::from_secs(5))
        );
        assert_eq!(
            policy.record_failure(),
            RetryDecision::Exhausted { attempts: 3 }
        );
    }

    #[test]
    fn success_resets_counter() {
        let mut policy = RetryPolicy::new(2, Duration::ZERO);
        policy.record_failure();
        policy.record_success();
        assert_eq!(policy.failures(), 0);
        assert_eq!(policy.record_failure(), RetryDecision::RetryAfter(Duration::ZERO));
    }

    #[test]
    fn zero_attempts_clamped() {
        let mut policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(
            policy.record_failure(),
            RetryDecision::Exhausted { attempts: 1 }
        );
    }
}
