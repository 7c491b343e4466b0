//! Named circuit breakers, created lazily and kept for the process lifetime.

use super::circuit_breaker::{CircuitBreaker, CircuitSnapshot};
use super::config::CircuitBreakerConfig;
use bastion_kernel::resilience::{NoopRecorder, ResilienceRecorder};
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Owns one [`CircuitBreaker`] per dependency name.
pub struct CircuitBreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    default_config: CircuitBreakerConfig,
    recorder: Arc<dyn ResilienceRecorder>,
}

impl std::fmt::Debug for CircuitBreakerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreakerRegistry")
            .field("circuits", &self.breakers.len())
            .field("default_config", &self.default_config)
            .finish()
    }
}

impl Default for CircuitBreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl CircuitBreakerRegistry {
    /// `default_config` applies to breakers created by [`Self::isolate`].
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            default_config,
            recorder: Arc::new(NoopRecorder),
        }
    }

    /// Recorder handed to every breaker created from now on.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn ResilienceRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// The breaker for `name`, created with `config` on first use. Later
    /// calls return the same instance and ignore `config`.
    pub fn get_or_create(&self, name: &str, config: CircuitBreakerConfig) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return Arc::clone(existing.value());
        }

        let entry = self.breakers.entry(name.to_string()).or_insert_with(|| {
            info!(circuit = name, threshold = config.failure_threshold, "circuit created");
            Arc::new(CircuitBreaker::new(name, config).with_recorder(self.recorder.clone()))
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }

    /// Name to state string for every circuit, from the published states.
    pub fn get_all_states(&self) -> BTreeMap<String, String> {
        self.breakers
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().published_state().as_str().to_string(),
                )
            })
            .collect()
    }

    /// Metrics snapshot of every circuit, sorted by name.
    pub fn snapshots(&self) -> Vec<CircuitSnapshot> {
        let breakers: Vec<_> = self.breakers.iter().map(|e| Arc::clone(e.value())).collect();
        let mut snapshots: Vec<_> = breakers.iter().map(|b| b.snapshot()).collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    /// Isolate `name`, creating its breaker with the default config if needed.
    pub fn isolate(&self, name: &str) -> Arc<CircuitBreaker> {
        let breaker = self.get_or_create(name, self.default_config.clone());
        breaker.isolate();
        breaker
    }

    /// Reset `name` to Closed. Returns `false` if no such circuit exists.
    pub fn reset(&self, name: &str) -> bool {
        match self.get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }
}
