//! Fixed-window request budget for outbound completions.

use careerswarm_core::error::GenerationError;
use std::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Counts outbound requests per fixed window.
///
/// The counter resets exactly once when a request arrives after the window
/// has elapsed. Requests beyond the budget fail immediately; nothing queues.
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<Window>,
}

struct Window {
    started: Instant,
    count: u32,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(Window {
                started: Instant::now(),
                count: 0,
            }),
        }
    }

    /// Claim one request slot, or fail with `RateLimitExceeded`.
    pub fn try_acquire(&self) -> Result<(), GenerationError> {
        let now = Instant::now();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if now.duration_since(state.started) >= self.window {
            state.started = now;
            state.count = 0;
        }

        state.count = state.count.saturating_add(1);
        if state.count > self.max_requests {
            return Err(GenerationError::RateLimitExceeded {
                limit: self.max_requests,
                window_secs: self.window.as_secs(),
            });
        }
        Ok(())
    }

    /// Requests counted in the current window.
    pub fn used(&self) -> u32 {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if Instant::now().duration_since(state.started) >= self.window {
            0
        } else {
            state.count.min(self.max_requests)
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn rejects_request_over_budget() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.try_acquire().is_ok());
        }
        assert_eq!(
            limiter.try_acquire(),
            Err(GenerationError::RateLimitExceeded {
                limit: 3,
                window_secs: 60
            })
        );
        assert_eq!(limiter.used(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn window_resets_after_elapsing() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_err());

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(limiter.try_acquire().is_err());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(limiter.used(), 0);
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_err());
    }
}
