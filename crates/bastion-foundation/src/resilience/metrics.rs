//! Circuit Breaker Metrics
//!
//! Request counters and a bounded state-transition history for one circuit.

use bastion_kernel::resilience::CircuitState;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transitions kept per circuit.
const TRANSITION_HISTORY: usize = 100;

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// State transition event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    /// Previous state
    pub from_state: CircuitState,
    /// New state
    pub to_state: CircuitState,
    /// Timestamp of transition (milliseconds since Unix epoch)
    pub timestamp_ms: u64,
}

impl StateTransition {
    /// Create a new state transition stamped with the current time
    pub fn new(from_state: CircuitState, to_state: CircuitState) -> Self {
        Self {
            from_state,
            to_state,
            timestamp_ms: now_ms(),
        }
    }
}

/// Circuit breaker metrics
#[derive(Debug, Default)]
pub struct CircuitBreakerMetrics {
    /// Calls that reached the dependency and succeeded
    total_successes: AtomicU64,
    /// Calls that reached the dependency and failed
    total_failures: AtomicU64,
    /// Calls refused while open, isolated or probing
    total_rejected: AtomicU64,
    /// Calls cancelled by their caller
    total_cancelled: AtomicU64,
    total_transitions: AtomicU64,
    /// Timestamp when circuit was last opened (ms since epoch, 0 if never)
    last_opened_ms: AtomicU64,
    transitions: RwLock<VecDeque<StateTransition>>,
}

impl CircuitBreakerMetrics {
    /// Create new metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self) {
        self.total_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.total_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.total_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancelled(&self) {
        self.total_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state transition
    pub fn record_transition(&self, transition: StateTransition) {
        self.total_transitions.fetch_add(1, Ordering::Relaxed);
        if transition.to_state == CircuitState::Open {
            self.last_opened_ms
                .store(transition.timestamp_ms, Ordering::Relaxed);
        }

        let mut transitions = self.transitions.write();
        if transitions.len() == TRANSITION_HISTORY {
            transitions.pop_front();
        }
        transitions.push_back(transition);
    }

    pub fn total_successes(&self) -> u64 {
        self.total_successes.load(Ordering::Relaxed)
    }

    pub fn total_failures(&self) -> u64 {
        self.total_failures.load(Ordering::Relaxed)
    }

    pub fn total_rejected(&self) -> u64 {
        self.total_rejected.load(Ordering::Relaxed)
    }

    pub fn total_cancelled(&self) -> u64 {
        self.total_cancelled.load(Ordering::Relaxed)
    }

    pub fn total_transitions(&self) -> u64 {
        self.total_transitions.load(Ordering::Relaxed)
    }

    /// Get total requests that reached the dependency (success + failure)
    pub fn total_requests(&self) -> u64 {
        self.total_successes() + self.total_failures()
    }

    /// Get failure rate as a percentage (0-100)
    pub fn failure_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            return 0.0;
        }
        (self.total_failures() as f64 / total as f64) * 100.0
    }

    /// Get recent state transitions (last N, oldest first)
    pub fn recent_transitions(&self, n: usize) -> Vec<StateTransition> {
        let transitions = self.transitions.read();
        let skip = transitions.len().saturating_sub(n);
        transitions.iter().skip(skip).cloned().collect()
    }

    /// Take a snapshot of current metrics
    pub fn snapshot(&self) -> CircuitBreakerMetricsSnapshot {
        CircuitBreakerMetricsSnapshot {
            total_successes: self.total_successes(),
            total_failures: self.total_failures(),
            total_rejected: self.total_rejected(),
            total_cancelled: self.total_cancelled(),
            total_requests: self.total_requests(),
            failure_rate: self.failure_rate(),
            total_transitions: self.total_transitions(),
            last_opened_ms: self.last_opened_ms.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics for monitoring/display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerMetricsSnapshot {
    pub total_successes: u64,
    pub total_failures: u64,
    pub total_rejected: u64,
    pub total_cancelled: u64,
    pub total_requests: u64,
    /// Failure rate percentage
    pub failure_rate: f64,
    pub total_transitions: u64,
    /// Last opened timestamp (ms since epoch, 0 if never)
    pub last_opened_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_initialization() {
        let metrics = CircuitBreakerMetrics::new();
        assert_eq!(metrics.total_requests(), 0);
        assert_eq!(metrics.failure_rate(), 0.0);
    }

    #[test]
    fn test_record_failure_rate() {
        let metrics = CircuitBreakerMetrics::new();
        metrics.record_failure();
        metrics.record_failure();
        metrics.record_success();
        metrics.record_rejected();
        metrics.record_cancelled();

        assert_eq!(metrics.total_failures(), 2);
        assert_eq!(metrics.total_successes(), 1);
        assert_eq!(metrics.total_requests(), 3);
        assert_eq!(metrics.total_rejected(), 1);
        assert_eq!(metrics.total_cancelled(), 1);
        assert!((metrics.failure_rate() - 66.67).abs() < 0.1);
    }

    #[test]
    fn test_transition_history_is_bounded() {
        let metrics = CircuitBreakerMetrics::new();
        for i in 0..(TRANSITION_HISTORY + 20) {
            let (from, to) = if i % 2 == 0 {
                (CircuitState::Closed, CircuitState::Open)
            } else {
                (CircuitState::Open, CircuitState::Closed)
            };
            metrics.record_transition(StateTransition::new(from, to));
        }

        assert_eq!(metrics.total_transitions(), (TRANSITION_HISTORY + 20) as u64);
        assert_eq!(metrics.recent_transitions(usize::MAX).len(), TRANSITION_HISTORY);
        let last = metrics.recent_transitions(1);
        assert_eq!(last[0].to_state, CircuitState::Closed);
        assert!(metrics.snapshot().last_opened_ms > 0);
    }
}
