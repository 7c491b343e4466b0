//! Circuit Breaker and Retry Configuration
//!
//! Runtime configuration derived from the per-dependency
//! [`DependencySettings`] of the settings document.

use bastion_kernel::config::DependencySettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a circuit breaker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// Time the circuit stays open before a half-open probe is allowed
    pub break_duration: Duration,
    /// Whether the circuit breaker is enabled
    pub enabled: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            break_duration: Duration::from_secs(30),
            enabled: true,
        }
    }
}

impl CircuitBreakerConfig {
    /// Set the failure threshold (at least 1)
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the open-state cool-down
    pub fn with_break_duration(mut self, duration: Duration) -> Self {
        self.break_duration = duration;
        self
    }

    /// Enable or disable the circuit breaker
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Create a strict configuration (opens quickly)
    pub fn strict() -> Self {
        Self {
            failure_threshold: 3,
            break_duration: Duration::from_secs(10),
            enabled: true,
        }
    }

    /// Create a lenient configuration (requires many failures)
    pub fn lenient() -> Self {
        Self {
            failure_threshold: 10,
            break_duration: Duration::from_secs(60),
            enabled: true,
        }
    }

    /// Create a disabled configuration (no circuit breaking)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

impl From<&DependencySettings> for CircuitBreakerConfig {
    fn from(settings: &DependencySettings) -> Self {
        Self {
            failure_threshold: settings.failure_threshold.max(1),
            break_duration: settings.break_duration(),
            enabled: settings.enabled,
        }
    }
}

/// Attempt budget and backoff for a retried call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Additional attempts after the first
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
    /// Upper bound for any single delay
    pub max_delay: Option<Duration>,
    /// Draw each delay uniformly from [75%, 100%] of the computed value
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            max_delay: Some(Duration::from_secs(5)),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// A single attempt, never retried.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            jitter: false,
            ..Default::default()
        }
    }

    /// Exponential backoff (multiplier 2) without jitter.
    pub fn exponential(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            backoff_multiplier: 2.0,
            max_delay: Some(max_delay),
            jitter: false,
        }
    }

    /// Same delay before every retry.
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay: delay,
            backoff_multiplier: 1.0,
            max_delay: None,
            jitter: false,
        }
    }

    #[must_use]
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// First attempt plus retries.
    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff after the failed attempt `attempt` (1-based):
    /// `min(initial_delay * multiplier^(attempt-1), max_delay)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1).min(63) as i32;
        let mut nanos = self.initial_delay.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);
        if let Some(max) = self.max_delay {
            nanos = nanos.min(max.as_nanos() as f64);
        }
        let capped = if nanos.is_finite() && nanos < u64::MAX as f64 {
            Duration::from_nanos(nanos.round() as u64)
        } else {
            self.max_delay.unwrap_or(Duration::MAX)
        };

        if self.jitter {
            jittered(capped)
        } else {
            capped
        }
    }
}

/// Uniform in [75%, 100%] of `delay`; never exceeds it.
fn jittered(delay: Duration) -> Duration {
    use rand::Rng;

    let nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
    let floor = nanos - nanos / 4;
    if floor >= nanos {
        return delay;
    }
    Duration::from_nanos(rand::thread_rng().gen_range(floor..=nanos))
}

impl From<&DependencySettings> for RetryConfig {
    fn from(settings: &DependencySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_delay: settings.initial_delay(),
            backoff_multiplier: settings.backoff_multiplier.max(1.0),
            max_delay: settings.max_delay(),
            jitter: settings.jitter,
        }
    }
}
