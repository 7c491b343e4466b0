//! Resilience layer
//!
//! Circuit breakers and retries for outbound dependency calls.
//!
//! # Example
//!
//! ```rust,ignore
//! use bastion_foundation::resilience::ResilientExecutor;
//!
//! let executor = ResilientExecutor::default();
//! let answer = executor
//!     .run("llm", &cancellation, |attempt, token| client.complete(request.clone(), token))
//!     .await?;
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod executor;
pub mod metrics;
pub mod recorder;
pub mod registry;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot};
pub use config::{CircuitBreakerConfig, RetryConfig};
pub use executor::ResilientExecutor;
pub use metrics::{CircuitBreakerMetrics, CircuitBreakerMetricsSnapshot, StateTransition};
pub use recorder::TracingRecorder;
pub use registry::CircuitBreakerRegistry;
pub use retry::RetryPolicy;

pub use bastion_kernel::resilience::{CircuitState, ResilienceError, RetryContext};
