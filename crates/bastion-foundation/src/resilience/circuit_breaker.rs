//! Circuit Breaker State Machine
//!
//! Implements the per-dependency circuit breaker with four states:
//! - Closed: Normal operation, calls pass and failures are counted
//! - Open: Calls are rejected until the break duration has elapsed
//! - Half-Open: A single probe call decides between Closed and Open
//! - Isolated: Forced open by an operator until reset
//!
//! State and counters sit behind one short-lived lock per circuit. The
//! current state is also published through an atomic so health snapshots
//! never contend with callers.

use super::config::CircuitBreakerConfig;
use super::metrics::{CircuitBreakerMetrics, CircuitBreakerMetricsSnapshot, StateTransition};
use bastion_kernel::resilience::{
    CircuitState, NoopRecorder, ResilienceError, ResilienceRecorder, Retryable,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    /// Bumped on every state change; ties a probe to the half-open period
    /// that admitted it.
    generation: u64,
}

impl Inner {
    fn set_state(&mut self, to: CircuitState) -> Option<(CircuitState, CircuitState)> {
        let from = self.state;
        if from == to {
            return None;
        }
        self.state = to;
        self.generation = self.generation.wrapping_add(1);
        Some((from, to))
    }
}

/// How a call was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admission {
    /// Disabled breaker: no accounting at all
    Bypass,
    /// Closed circuit
    Normal,
    /// Half-open probe of the given generation
    Probe(u64),
}

/// How a finished call affects the circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Success,
    Failure,
    /// Cancellations and nested rejections
    Neutral,
}

/// Serializable view of one circuit for the health surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub metrics: CircuitBreakerMetricsSnapshot,
}

/// Circuit Breaker implementation
pub struct CircuitBreaker {
    name: Arc<str>,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
    published: AtomicU8,
    metrics: Arc<CircuitBreakerMetrics>,
    recorder: Arc<dyn ResilienceRecorder>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.published_state())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a new, closed circuit breaker
    pub fn new(name: impl Into<Arc<str>>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
                generation: 0,
            }),
            published: AtomicU8::new(CircuitState::Closed.to_u8()),
            metrics: Arc::new(CircuitBreakerMetrics::new()),
            recorder: Arc::new(NoopRecorder),
        }
    }

    /// Create with default configuration
    pub fn with_default(name: impl Into<Arc<str>>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn ResilienceRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<CircuitBreakerMetrics> {
        &self.metrics
    }

    /// Current state. An expired Open circuit still reads as Open until the
    /// next call turns it half-open.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    /// Last published state, read without taking the lock.
    pub fn published_state(&self) -> CircuitState {
        CircuitState::from_u8(self.published.load(Ordering::Acquire))
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let (state, consecutive_failures) = {
            let inner = self.inner.lock();
            (inner.state, inner.consecutive_failures)
        };
        CircuitSnapshot {
            name: self.name.to_string(),
            state,
            consecutive_failures,
            metrics: self.metrics.snapshot(),
        }
    }

    /// Force the circuit open until [`CircuitBreaker::reset`].
    pub fn isolate(&self) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.probe_in_flight = false;
            let transition = inner.set_state(CircuitState::Isolated);
            self.publish(&inner);
            transition
        };
        self.emit(transition);
    }

    /// Close the circuit and zero its counters.
    pub fn reset(&self) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.consecutive_failures = 0;
            inner.opened_at = None;
            inner.probe_in_flight = false;
            let transition = inner.set_state(CircuitState::Closed);
            self.publish(&inner);
            transition
        };
        self.emit(transition);
    }

    /// Run `action` through the circuit.
    ///
    /// The action already speaks [`ResilienceError`]; its `Cancelled` and
    /// `CircuitOpen` results leave the circuit untouched, every other error
    /// counts as one failure.
    pub async fn execute<T, E, F, Fut>(
        &self,
        cancellation: &CancellationToken,
        action: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, ResilienceError<E>>>,
    {
        if cancellation.is_cancelled() {
            self.metrics.record_cancelled();
            return Err(ResilienceError::Cancelled);
        }

        let admission = self.admit()?;
        let mut guard = ProbeGuard {
            breaker: self,
            generation: match admission {
                Admission::Probe(generation) => Some(generation),
                Admission::Bypass | Admission::Normal => None,
            },
        };

        let result = action(cancellation.child_token()).await;

        let verdict = match &result {
            Ok(_) => Verdict::Success,
            Err(ResilienceError::Cancelled | ResilienceError::CircuitOpen { .. }) => Verdict::Neutral,
            Err(ResilienceError::RetryExhausted { .. } | ResilienceError::Inner(_)) => {
                Verdict::Failure
            }
        };
        guard.generation = None;
        self.complete(admission, verdict);
        result
    }

    /// Run a plain dependency call through the circuit.
    pub async fn call<T, E, F, Fut>(
        &self,
        cancellation: &CancellationToken,
        action: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        self.execute(cancellation, |token| async move {
            action(token).await.map_err(ResilienceError::from_dependency)
        })
        .await
    }

    fn admit<E>(&self) -> Result<Admission, ResilienceError<E>> {
        let mut transition = None;
        let admission = {
            let mut inner = self.inner.lock();
            match inner.state {
                // Isolation holds even when accounting is disabled.
                CircuitState::Isolated => Err(CircuitState::Isolated),
                _ if !self.config.enabled => Ok(Admission::Bypass),
                CircuitState::Closed => Ok(Admission::Normal),
                CircuitState::HalfOpen if inner.probe_in_flight => Err(CircuitState::HalfOpen),
                CircuitState::HalfOpen => {
                    inner.probe_in_flight = true;
                    Ok(Admission::Probe(inner.generation))
                }
                CircuitState::Open => {
                    let cooled = inner
                        .opened_at
                        .is_none_or(|at| at.elapsed() >= self.config.break_duration);
                    if cooled {
                        transition = inner.set_state(CircuitState::HalfOpen);
                        inner.probe_in_flight = true;
                        self.publish(&inner);
                        Ok(Admission::Probe(inner.generation))
                    } else {
                        Err(CircuitState::Open)
                    }
                }
            }
        };
        self.emit(transition);

        admission.map_err(|state| {
            self.metrics.record_rejected();
            debug!(circuit = %self.name, state = %state, "call rejected");
            ResilienceError::CircuitOpen {
                circuit: self.name.to_string(),
                state,
            }
        })
    }

    fn complete(&self, admission: Admission, verdict: Verdict) {
        match verdict {
            Verdict::Success => self.metrics.record_success(),
            Verdict::Failure => self.metrics.record_failure(),
            Verdict::Neutral => self.metrics.record_cancelled(),
        }
        if admission == Admission::Bypass {
            return;
        }

        let transition = {
            let mut inner = self.inner.lock();
            let is_probe = match admission {
                Admission::Probe(generation) => {
                    generation == inner.generation && inner.state == CircuitState::HalfOpen
                }
                Admission::Bypass | Admission::Normal => false,
            };
            if is_probe {
                inner.probe_in_flight = false;
            }

            let transition = match (inner.state, verdict) {
                (_, Verdict::Neutral) => None,
                (CircuitState::Closed, Verdict::Success) => {
                    inner.consecutive_failures = 0;
                    None
                }
                (CircuitState::Closed, Verdict::Failure) => {
                    inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                    if inner.consecutive_failures >= self.config.failure_threshold {
                        inner.opened_at = Some(Instant::now());
                        inner.set_state(CircuitState::Open)
                    } else {
                        None
                    }
                }
                (CircuitState::HalfOpen, Verdict::Success) if is_probe => {
                    inner.consecutive_failures = 0;
                    inner.opened_at = None;
                    inner.set_state(CircuitState::Closed)
                }
                (CircuitState::HalfOpen, Verdict::Failure) if is_probe => {
                    inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
                    inner.opened_at = Some(Instant::now());
                    inner.set_state(CircuitState::Open)
                }
                // Stragglers from an earlier period, and anything while isolated.
                _ => None,
            };
            self.publish(&inner);
            transition
        };
        self.emit(transition);
    }

    fn release_probe(&self, generation: u64) {
        let mut inner = self.inner.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
            debug!(circuit = %self.name, "probe abandoned");
        }
    }

    fn publish(&self, inner: &Inner) {
        self.published.store(inner.state.to_u8(), Ordering::Release);
    }

    fn emit(&self, transition: Option<(CircuitState, CircuitState)>) {
        let Some((from, to)) = transition else {
            return;
        };
        self.metrics.record_transition(StateTransition::new(from, to));
        self.recorder.record_transition(&self.name, from, to);
        match to {
            CircuitState::Open | CircuitState::Isolated => {
                warn!(circuit = %self.name, from = %from, to = %to, "circuit state changed")
            }
            CircuitState::Closed | CircuitState::HalfOpen => {
                info!(circuit = %self.name, from = %from, to = %to, "circuit state changed")
            }
        }
    }
}

/// Frees the half-open probe slot if the probe's future is dropped before
/// it completes.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    generation: Option<u64>,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if let Some(generation) = self.generation.take() {
            self.breaker.release_probe(generation);
        }
    }
}
