//! Outcome taxonomy for calls routed through the resilience layer.

use super::{CircuitState, Retryable};
use std::time::Duration;

/// Failure of a call made through a circuit breaker and/or retry policy.
///
/// `E` is the error type of the wrapped dependency call.
#[derive(Debug)]
pub enum ResilienceError<E> {
    /// The circuit rejected the call without invoking it
    CircuitOpen {
        /// Name of the rejecting circuit
        circuit: String,
        /// State that caused the rejection
        state: CircuitState,
    },
    /// Every configured attempt failed with a retryable error
    RetryExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Time from the first attempt to giving up
        elapsed: Duration,
        /// Error of the final attempt
        last: E,
    },
    /// The caller cancelled the call
    Cancelled,
    /// A non-retryable error from the dependency
    Inner(E),
}

impl<E> ResilienceError<E> {
    /// Whether this outcome is a circuit rejection.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }

    /// Whether this outcome is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The dependency error behind this outcome, if any.
    pub fn dependency_error(&self) -> Option<&E> {
        match self {
            Self::RetryExhausted { last, .. } => Some(last),
            Self::Inner(e) => Some(e),
            Self::CircuitOpen { .. } | Self::Cancelled => None,
        }
    }

    /// Map the wrapped dependency error.
    pub fn map_inner<F, U>(self, f: F) -> ResilienceError<U>
    where
        F: FnOnce(E) -> U,
    {
        match self {
            Self::CircuitOpen { circuit, state } => ResilienceError::CircuitOpen { circuit, state },
            Self::RetryExhausted {
                attempts,
                elapsed,
                last,
            } => ResilienceError::RetryExhausted {
                attempts,
                elapsed,
                last: f(last),
            },
            Self::Cancelled => ResilienceError::Cancelled,
            Self::Inner(e) => ResilienceError::Inner(f(e)),
        }
    }
}

impl<E: Retryable> ResilienceError<E> {
    /// Lift a raw dependency error, recognising cancellations.
    pub fn from_dependency(error: E) -> Self {
        if error.is_cancellation() {
            Self::Cancelled
        } else {
            Self::Inner(error)
        }
    }
}

impl<E: std::fmt::Display> std::fmt::Display for ResilienceError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CircuitOpen { circuit, state } => {
                write!(f, "circuit '{}' is {}", circuit, state)
            }
            Self::RetryExhausted {
                attempts,
                elapsed,
                last,
            } => write!(
                f,
                "retry exhausted after {} attempts in {}ms: {}",
                attempts,
                elapsed.as_millis(),
                last
            ),
            Self::Cancelled => write!(f, "call cancelled"),
            Self::Inner(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for ResilienceError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::RetryExhausted { last, .. } => Some(last as _),
            Self::Inner(e) => Some(e as _),
            Self::CircuitOpen { .. } | Self::Cancelled => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::DependencyError;
    use std::error::Error as _;

    #[test]
    fn circuit_open_display_names_circuit() {
        let err: ResilienceError<DependencyError> = ResilienceError::CircuitOpen {
            circuit: "llm".into(),
            state: CircuitState::Open,
        };
        assert_eq!(err.to_string(), "circuit 'llm' is open");
        assert!(err.source().is_none());
    }

    #[test]
    fn exhausted_exposes_last_error_as_source() {
        let err = ResilienceError::RetryExhausted {
            attempts: 3,
            elapsed: Duration::from_millis(1500),
            last: DependencyError::Timeout,
        };
        assert!(err.to_string().contains("3 attempts"));
        assert!(err.source().is_some());
        assert_eq!(err.dependency_error(), Some(&DependencyError::Timeout));
    }

    #[test]
    fn from_dependency_recognises_cancellation() {
        let err = ResilienceError::from_dependency(DependencyError::Cancelled);
        assert!(err.is_cancelled());
        let err = ResilienceError::from_dependency(DependencyError::Timeout);
        assert!(matches!(err, ResilienceError::Inner(DependencyError::Timeout)));
    }
}
