use std::time::Duration;

use crate::config::{DEFAULT_POLL_BASE_DELAY, DEFAULT_POLL_MAX_ATTEMPTS, DEFAULT_POLL_MAX_DELAY, DEFAULT_POLL_TIMEOUT};

/// How long and how often to poll a plan market before giving up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay after the first unsuccessful poll; doubled after each further one.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound on market fetches.
    pub max_attempts: u32,
    /// Upper bound on total time spent waiting.
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_POLL_BASE_DELAY,
            max_delay: DEFAULT_POLL_MAX_DELAY,
            max_attempts: DEFAULT_POLL_MAX_ATTEMPTS,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollPolicy {
    /// Polls back to back; for tests and fakes.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_attempts,
            timeout: Duration::from_secs(60),
        }
    }

    /// Delay before poll `attempt + 1`, where `attempt` is 0-based.
    pub fn delay(&self, attempt: u32) -> Duration {
        let mut delay = self.base_delay;
        for _ in 0..attempt {
            if delay >= self.max_delay {
                return self.max_delay;
            }
            delay = delay.checked_mul(2).unwrap_or(self.max_delay);
        }
        delay.min(self.max_delay)
    }
}
