//! Resilience contracts
//!
//! Types shared between the circuit breaker, the retry policy and whoever
//! observes them:
//! - [`CircuitState`]: the four states of a per-dependency circuit
//! - [`Retryable`]: classification of a failure as transient or fatal
//! - [`RetryContext`]: ephemeral description of one attempt
//! - [`ResilienceError`]: the tagged outcome crossing the executor boundary
//! - [`ResilienceRecorder`]: abstract metrics sink

mod error;
mod recorder;

pub use error::ResilienceError;
pub use recorder::{CallOutcome, NoopRecorder, ResilienceRecorder};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - calls pass through
    Closed,
    /// Dependency judged unhealthy - calls fail fast
    Open,
    /// Cool-down elapsed - a single probe is allowed
    #[serde(rename = "half-open")]
    HalfOpen,
    /// Forced open by an operator; ignores call outcomes
    Isolated,
}

impl CircuitState {
    /// Stable lowercase name used by the health surface.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
            Self::Isolated => "isolated",
        }
    }

    /// Compact encoding for lock-free publication.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
            Self::Isolated => 3,
        }
    }

    /// Inverse of [`CircuitState::to_u8`]; unknown values read as `Closed`.
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Open,
            2 => Self::HalfOpen,
            3 => Self::Isolated,
            _ => Self::Closed,
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a failure for the retry loop.
pub trait Retryable {
    /// Whether another attempt may succeed.
    fn is_retryable(&self) -> bool;

    /// Whether the failure is the caller's own cancellation. Cancellations
    /// are never retried and never count against a circuit.
    fn is_cancellation(&self) -> bool {
        false
    }
}

/// Description of one attempt of a retried call.
///
/// Produced for every failed attempt and once for the attempt that finally
/// succeeded (with `last_error` and `next_delay` empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryContext {
    /// 1-based attempt number
    pub attempt_number: u32,
    /// Configured attempt ceiling (first attempt + retries)
    pub total_attempts: u32,
    /// Rendered cause of this attempt's failure
    pub last_error: Option<String>,
    /// Time since the first attempt started
    pub elapsed: Duration,
    /// Backoff before the next attempt, if one follows
    pub next_delay: Option<Duration>,
}

impl RetryContext {
    /// Whether this context describes a failed attempt.
    pub fn is_failure(&self) -> bool {
        self.last_error.is_some()
    }

    /// Whether another attempt is scheduled after this one.
    pub fn will_retry(&self) -> bool {
        self.next_delay.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_roundtrips_through_u8() {
        for state in [
            CircuitState::Closed,
            CircuitState::Open,
            CircuitState::HalfOpen,
            CircuitState::Isolated,
        ] {
            assert_eq!(CircuitState::from_u8(state.to_u8()), state);
        }
        assert_eq!(CircuitState::from_u8(42), CircuitState::Closed);
    }

    #[test]
    fn state_display() {
        assert_eq!(CircuitState::HalfOpen.to_string(), "half-open");
        assert_eq!(CircuitState::Isolated.to_string(), "isolated");
    }

    #[test]
    fn retry_context_flags() {
        let ctx = RetryContext {
            attempt_number: 1,
            total_attempts: 3,
            last_error: Some("timeout".into()),
            elapsed: Duration::ZERO,
            next_delay: Some(Duration::from_millis(100)),
        };
        assert!(ctx.is_failure());
        assert!(ctx.will_retry());
    }
}
