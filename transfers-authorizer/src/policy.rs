//! Retry policy for outbound calls.

use std::time::Duration;

/// When to try again and how long to wait.
///
/// The delay is fixed between attempts. Only statuses listed in
/// `retryable_statuses` (and transient transport failures) are retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retryable_statuses: Vec<u16>,
    pub delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retryable_statuses: vec![500],
            delay: Duration::from_millis(400),
            timeout: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        retryable_statuses: Vec<u16>,
        delay: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retryable_statuses,
            delay,
            timeout,
        }
    }

    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Upper bound on the time one call can take with this policy.
    pub fn worst_case(&self) -> Duration {
        (self.timeout + self.delay) * self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert!(policy.is_retryable_status(500));
        assert!(!policy.is_retryable_status(502));
        assert!(!policy.is_retryable_status(403));
        assert_eq!(policy.worst_case(), Duration::from_millis(16_200));
    }

    #[test]
    fn test_at_least_one_attempt() {
        let policy = RetryPolicy::new(0, vec![], Duration::ZERO, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.worst_case(), Duration::from_secs(1));
    }
}
