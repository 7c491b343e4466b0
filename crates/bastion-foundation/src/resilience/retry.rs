//! Retry policy with exponential backoff
//!
//! Runs an attempt-aware async action up to `max_retries + 1` times,
//! sleeping between attempts without blocking the executor. Cancellation is
//! observed before each attempt and during each backoff sleep.

use super::config::RetryConfig;
use bastion_kernel::resilience::{
    NoopRecorder, ResilienceError, ResilienceRecorder, RetryContext, Retryable,
};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, warn};

/// Retries transient failures of one dependency.
#[derive(Clone)]
pub struct RetryPolicy {
    label: Arc<str>,
    config: RetryConfig,
    recorder: Arc<dyn ResilienceRecorder>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("label", &self.label)
            .field("config", &self.config)
            .finish()
    }
}

impl RetryPolicy {
    /// `label` names the dependency in logs and recorder events.
    pub fn new(label: impl Into<Arc<str>>, config: RetryConfig) -> Self {
        Self {
            label: label.into(),
            config,
            recorder: Arc::new(NoopRecorder),
        }
    }

    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn ResilienceRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `action` until it succeeds, fails permanently, runs out of
    /// attempts or is cancelled.
    ///
    /// `action` receives the 1-based attempt number and a child token of
    /// `cancellation`.
    pub async fn execute<T, E, F, Fut>(
        &self,
        cancellation: &CancellationToken,
        action: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut(u32, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.execute_with_context(cancellation, action)
            .await
            .map(|(value, _)| value)
    }

    /// Attempt-unaware variant of [`RetryPolicy::execute`].
    pub async fn execute_simple<T, E, F, Fut>(
        &self,
        cancellation: &CancellationToken,
        mut action: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        self.execute(cancellation, |_, _| action()).await
    }

    /// Like [`RetryPolicy::execute`], also returning the context of the
    /// successful attempt.
    pub async fn execute_with_context<T, E, F, Fut>(
        &self,
        cancellation: &CancellationToken,
        mut action: F,
    ) -> Result<(T, RetryContext), ResilienceError<E>>
    where
        F: FnMut(u32, CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + Display,
    {
        let total_attempts = self.config.total_attempts();
        let started = Instant::now();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            if cancellation.is_cancelled() {
                debug!(dependency = %self.label, attempt, "cancelled before attempt");
                return Err(ResilienceError::Cancelled);
            }

            let span = debug_span!("resilience.attempt", dependency = %self.label, attempt);
            let result = action(attempt, cancellation.child_token())
                .instrument(span)
                .await;

            let error = match result {
                Ok(value) => {
                    let context = RetryContext {
                        attempt_number: attempt,
                        total_attempts,
                        last_error: None,
                        elapsed: started.elapsed(),
                        next_delay: None,
                    };
                    self.recorder.record_attempt(&self.label, &context);
                    if attempt > 1 {
                        debug!(dependency = %self.label, attempt, "succeeded after retry");
                    }
                    return Ok((value, context));
                }
                Err(error) => error,
            };

            if error.is_cancellation() || cancellation.is_cancelled() {
                return Err(ResilienceError::Cancelled);
            }

            let retryable = error.is_retryable();
            let last_attempt = attempt >= total_attempts;
            let next_delay = (retryable && !last_attempt).then(|| self.config.delay_for(attempt));
            let context = RetryContext {
                attempt_number: attempt,
                total_attempts,
                last_error: Some(error.to_string()),
                elapsed: started.elapsed(),
                next_delay,
            };
            self.recorder.record_attempt(&self.label, &context);

            if !retryable {
                debug!(dependency = %self.label, attempt, error = %error, "non-retryable failure");
                return Err(ResilienceError::Inner(error));
            }

            let Some(delay) = next_delay else {
                warn!(
                    dependency = %self.label,
                    attempts = attempt,
                    elapsed_ms = context.elapsed.as_millis() as u64,
                    error = %error,
                    "retry attempts exhausted"
                );
                return Err(ResilienceError::RetryExhausted {
                    attempts: attempt,
                    elapsed: context.elapsed,
                    last: error,
                });
            };

            warn!(
                dependency = %self.label,
                attempt,
                total_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "attempt failed, retrying"
            );

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    debug!(dependency = %self.label, attempt, "cancelled during backoff");
                    return Err(ResilienceError::Cancelled);
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
