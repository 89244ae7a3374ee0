// Retry strategy with exponential backoff and jitter
//
// Webhook delivery retries are bounded: the default ceiling is five
// attempts, after which the task is reported dead instead of retried
// forever.

use rand::Rng;
use std::time::Duration;

/// Default retry ceiling for webhook delivery
pub const DEFAULT_MAX_RETRIES: u32 = 5;

/// Retry strategy trait for calculating retry delays
pub trait RetryStrategy: Send + Sync {
    /// Calculate the delay before the next retry attempt
    /// Returns None if max retries exceeded
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Get the maximum number of retries
    fn max_retries(&self) -> u32;

    /// Check if more retries are allowed
    fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries()
    }
}

/// Exponential backoff retry strategy with jitter
/// Sequence: 5s, 15s, 45s, 135s, ... capped at 5 minutes
/// Jitter: Random value added to prevent thundering herd
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Base delay in seconds (default: 5)
    base_delay_secs: u64,
    /// Maximum delay in seconds (default: 300 = 5 minutes)
    max_delay_secs: u64,
    /// Jitter factor (0.0 to 1.0, default: 0.1 = 10%)
    jitter_factor: f64,
    /// Retry ceiling
    max_retries: u32,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base_delay_secs: 5,
            max_delay_secs: 300,
            jitter_factor: 0.1,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new exponential backoff strategy with custom values
    pub fn with_config(base_delay_secs: u64, max_delay_secs: u64, jitter_factor: f64) -> Self {
        Self {
            base_delay_secs,
            max_delay_secs,
            jitter_factor: jitter_factor.clamp(0.0, 1.0),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Override the retry ceiling
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Calculate exponential delay without jitter
    fn calculate_base_delay(&self, attempt: u32) -> u64 {
        // base * 3^attempt, capped at max_delay
        let delay = self
            .base_delay_secs
            .saturating_mul(3_u64.saturating_pow(attempt));
        delay.min(self.max_delay_secs)
    }

    /// Add random jitter to prevent thundering herd
    /// Returns delay in milliseconds
    fn add_jitter_ms(&self, base_delay_secs: u64) -> u64 {
        if self.jitter_factor == 0.0 {
            return base_delay_secs * 1000;
        }

        let mut rng = rand::thread_rng();
        let base_delay_ms = base_delay_secs * 1000;
        let jitter_range_ms = (base_delay_ms as f64 * self.jitter_factor) as u64;

        let jitter_ms = if jitter_range_ms > 0 {
            rng.gen_range(0..=jitter_range_ms)
        } else {
            0
        };

        base_delay_ms + jitter_ms
    }
}

impl RetryStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }

        let base_delay_secs = self.calculate_base_delay(attempt);
        let delay_with_jitter_ms = self.add_jitter_ms(base_delay_secs);

        Some(Duration::from_millis(delay_with_jitter_ms))
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

/// Fixed delay retry strategy (for testing or simple cases)
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_retries: u32,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl RetryStrategy for FixedDelay {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        Some(self.delay)
    }

    fn max_retries(&self) -> u32 {
        self.max_retries
    }
}
