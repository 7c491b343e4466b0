//! Resilient executor
//!
//! Composes the per-dependency circuit breaker (outer) with the retry
//! policy (inner). An open circuit fails fast before any attempt is spent,
//! and a retry loop that ends in failure counts once against the circuit.

use super::circuit_breaker::CircuitBreaker;
use super::config::{CircuitBreakerConfig, RetryConfig};
use super::recorder::TracingRecorder;
use super::registry::CircuitBreakerRegistry;
use super::retry::RetryPolicy;
use bastion_kernel::config::ResilienceSettings;
use bastion_kernel::resilience::{CallOutcome, ResilienceError, ResilienceRecorder, Retryable};
use dashmap::DashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info_span};

/// Entry point for every outbound dependency call.
pub struct ResilientExecutor {
    settings: ResilienceSettings,
    registry: Arc<CircuitBreakerRegistry>,
    retries: DashMap<String, Arc<RetryPolicy>>,
    recorder: Arc<dyn ResilienceRecorder>,
}

impl std::fmt::Debug for ResilientExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientExecutor")
            .field("registry", &self.registry)
            .field("retry_policies", &self.retries.len())
            .finish()
    }
}

impl Default for ResilientExecutor {
    fn default() -> Self {
        Self::new(ResilienceSettings::default(), Arc::new(TracingRecorder))
    }
}

impl ResilientExecutor {
    pub fn new(settings: ResilienceSettings, recorder: Arc<dyn ResilienceRecorder>) -> Self {
        let registry = CircuitBreakerRegistry::new(CircuitBreakerConfig::from(&settings.defaults))
            .with_recorder(recorder.clone());
        Self {
            settings,
            registry: Arc::new(registry),
            retries: DashMap::new(),
            recorder,
        }
    }

    pub fn settings(&self) -> &ResilienceSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.registry
    }

    /// Circuit for `dependency`, configured from its settings on first use.
    pub fn breaker(&self, dependency: &str) -> Arc<CircuitBreaker> {
        self.registry.get_or_create(
            dependency,
            CircuitBreakerConfig::from(self.settings.for_dependency(dependency)),
        )
    }

    /// Isolate `dependency`. A circuit created here uses the dependency's
    /// own settings, same as one created by its first call.
    pub fn isolate(&self, dependency: &str) -> Arc<CircuitBreaker> {
        let breaker = self.breaker(dependency);
        breaker.isolate();
        breaker
    }

    fn retry_policy(&self, dependency: &str) -> Arc<RetryPolicy> {
        if let Some(policy) = self.retries.get(dependency) {
            return Arc::clone(policy.value());
        }
        let entry = self.retries.entry(dependency.to_string()).or_insert_with(|| {
            let config = RetryConfig::from(self.settings.for_dependency(dependency));
            Arc::new(RetryPolicy::new(dependency, config).with_recorder(self.recorder.clone()))
        });
        Arc::clone(entry.value())
    }

    /// Run an attempt-aware action against `dependency`.
    pub async fn run<T, E, F, Fut>(
        &self,
        dependency: &str,
        cancellation: &CancellationToken,
        action: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut(u32, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let breaker = self.breaker(dependency);
        let retry = self.retry_policy(dependency);
        let started = Instant::now();

        let result = breaker
            .execute(cancellation, |token| async move {
                retry.execute(&token, action).await
            })
            .instrument(info_span!("resilience.call", dependency))
            .await;

        let outcome = match &result {
            Ok(_) => CallOutcome::Success,
            Err(ResilienceError::CircuitOpen { .. }) => CallOutcome::Rejected,
            Err(ResilienceError::Cancelled) => CallOutcome::Cancelled,
            Err(ResilienceError::RetryExhausted { .. } | ResilienceError::Inner(_)) => {
                CallOutcome::Failure
            }
        };
        self.recorder
            .record_outcome(dependency, outcome, started.elapsed());
        result
    }

    /// Run an attempt-unaware action against `dependency`.
    pub async fn run_simple<T, E, F, Fut>(
        &self,
        dependency: &str,
        cancellation: &CancellationToken,
        mut action: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.run(dependency, cancellation, move |_, _| action()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bastion_kernel::DependencyError;
    use bastion_kernel::config::DependencySettings;
    use bastion_kernel::resilience::CircuitState;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct OutcomeLog(Mutex<Vec<(String, CallOutcome)>>);

    impl ResilienceRecorder for OutcomeLog {
        fn record_outcome(&self, dependency: &str, outcome: CallOutcome, _elapsed: Duration) {
            self.0.lock().push((dependency.to_string(), outcome));
        }
    }

    fn executor(recorder: Arc<dyn ResilienceRecorder>) -> ResilientExecutor {
        let mut settings = ResilienceSettings::default();
        settings.dependencies.insert(
            "llm".into(),
            DependencySettings {
                failure_threshold: 2,
                break_duration_ms: 1_000,
                max_retries: 2,
                initial_delay_ms: 10,
                max_delay_ms: Some(50),
                jitter: false,
                ..Default::default()
            },
        );
        ResilientExecutor::new(settings, recorder)
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retry_counts_once_against_circuit() {
        let executor = executor(Arc::new(OutcomeLog::default()));
        let calls = AtomicU32::new(0);

        let err = executor
            .run_simple("llm", &CancellationToken::new(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(DependencyError::Timeout) }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ResilienceError::RetryExhausted { attempts: 3, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(executor.breaker("llm").consecutive_failures(), 1);
        assert_eq!(executor.breaker("llm").state(), CircuitState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn open_circuit_spends_no_attempts() {
        let log = Arc::new(OutcomeLog::default());
        let executor = executor(log.clone());
        let token = CancellationToken::new();

        for _ in 0..2 {
            executor
                .run("llm", &token, |_, _| async {
                    Err::<(), _>(DependencyError::Validation("bad".into()))
                })
                .await
                .unwrap_err();
        }
        assert_eq!(executor.breaker("llm").state(), CircuitState::Open);

        let calls = AtomicU32::new(0);
        let err = executor
            .run("llm", &token, |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, DependencyError>(()) }
            })
            .await
            .unwrap_err();
        assert!(err.is_circuit_open());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let outcomes: Vec<_> = log.0.lock().iter().map(|(_, o)| *o).collect();
        assert_eq!(
            outcomes,
            vec![CallOutcome::Failure, CallOutcome::Failure, CallOutcome::Rejected]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_reports_attempt_number() {
        let executor = executor(Arc::new(OutcomeLog::default()));
        let value = executor
            .run("llm", &CancellationToken::new(), |attempt, _| async move {
                if attempt < 3 {
                    Err(DependencyError::from_status(503, "busy"))
                } else {
                    Ok(attempt)
                }
            })
            .await
            .unwrap();
        assert_eq!(value, 3);
        assert_eq!(executor.breaker("llm").consecutive_failures(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_leaves_circuit_untouched() {
        let executor = Arc::new(executor(Arc::new(OutcomeLog::default())));
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let task = {
            let executor = executor.clone();
            let token = token.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                executor
                    .run_simple("llm", &token, || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        async { Err::<(), _>(DependencyError::Timeout) }
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(5)).await;
        token.cancel();
        let err = task.await.unwrap().unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(executor.breaker("llm").consecutive_failures(), 0);
    }

    #[tokio::test]
    async fn isolating_before_first_call_keeps_dependency_settings() {
        let executor = executor(Arc::new(OutcomeLog::default()));
        let breaker = executor.isolate("llm");
        assert_eq!(breaker.state(), CircuitState::Isolated);
        assert_eq!(breaker.config().failure_threshold, 2);
        assert_eq!(breaker.config().break_duration, Duration::from_secs(1));

        assert!(executor.registry().reset("llm"));
        let breaker = executor.breaker("llm");
        assert_eq!(breaker.config().failure_threshold, 2);

        for _ in 0..2 {
            executor
                .run("llm", &CancellationToken::new(), |_, _| async {
                    Err::<(), _>(DependencyError::Validation("bad".into()))
                })
                .await
                .unwrap_err();
        }
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn unknown_dependency_uses_defaults() {
        let executor = executor(Arc::new(OutcomeLog::default()));
        let breaker = executor.breaker("vector-store");
        assert_eq!(breaker.config().failure_threshold, 5);
        assert_eq!(executor.retry_policy("vector-store").config().max_retries, 2);
        assert_eq!(executor.registry().len(), 1);
    }
}
