//! Retry policy for failed completions.

use careerswarm_config::RetryConfig;
use careerswarm_core::error::GenerationError;
use std::time::Duration;

/// Exponential backoff: the delay after failed attempt `n` (0-based) is
/// `base_delay * 2^n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after attempt `attempt` failed, before the next one.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    pub fn should_retry(&self, error: &GenerationError, attempt: u32) -> bool {
        should_retry(error, attempt, self.max_attempts)
    }
}

/// Decide whether attempt `attempt` (0-based) that failed with `error` is
/// followed by another one.
///
/// Client-class failures (HTTP 4xx) and local failures (rate limit, bad
/// JSON, missing credentials, cancellation) are never retried.
pub fn should_retry(error: &GenerationError, attempt: u32, max_attempts: u32) -> bool {
    if attempt.saturating_add(1) >= max_attempts {
        return false;
    }

    match error {
        GenerationError::Network { .. } => !error.is_client_error(),
        GenerationError::Timeout(_) | GenerationError::EmptyResponse => true,
        GenerationError::RateLimitExceeded { .. }
        | GenerationError::InvalidJson(_)
        | GenerationError::NotConfigured(_)
        | GenerationError::Cancelled => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_each_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        for k in 0..3 {
            assert_eq!(policy.delay_for(k + 1), policy.delay_for(k) * 2);
        }
    }

    #[test]
    fn huge_attempt_saturates() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_for(64) >= policy.delay_for(31));
    }

    #[test]
    fn server_errors_retry_until_budget_spent() {
        let err = GenerationError::status(503, "unavailable");
        assert!(should_retry(&err, 0, 3));
        assert!(should_retry(&err, 1, 3));
        assert!(!should_retry(&err, 2, 3));

        let timeout = GenerationError::Timeout("60s".into());
        assert!(should_retry(&timeout, 0, 3));
        assert!(should_retry(&GenerationError::transport("reset"), 0, 3));
        assert!(should_retry(&GenerationError::EmptyResponse, 0, 3));
    }

    #[test]
    fn client_errors_never_retry() {
        for status in [400, 404, 429] {
            assert!(!should_retry(&GenerationError::status(status, "no"), 0, 3));
        }
    }

    #[test]
    fn local_errors_never_retry() {
        let errors = [
            GenerationError::RateLimitExceeded {
                limit: 60,
                window_secs: 60,
            },
            GenerationError::InvalidJson("{}".into()),
            GenerationError::NotConfigured("no key".into()),
            GenerationError::Cancelled,
        ];
        for err in &errors {
            assert!(!should_retry(err, 0, 3), "{err} should not retry");
        }
    }

    #[test]
    fn single_attempt_policy_never_retries() {
        let policy = RetryPolicy {
            max_attempts: 1,
            base_delay: Duration::from_millis(10),
        };
        assert!(!policy.should_retry(&GenerationError::transport("x"), 0));
    }
}
