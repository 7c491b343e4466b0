//! Bastion foundation.
//!
//! Concrete implementations over the `bastion-kernel` contracts:
//! circuit breakers, retries and the executor that composes them, the
//! semantic cache, and the chat pipeline that ties LLM, SQL and storage
//! together under the per-request policy.

// circuit breaker, retry, registry, executor
pub mod resilience;
pub use resilience::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, ResilientExecutor, RetryConfig,
    RetryPolicy, TracingRecorder,
};

// semantic cache
pub mod cache;
pub use cache::{InMemorySemanticCache, PolicyGatedCache};

// chat orchestration
pub mod chat;
pub use chat::{ChatAnswer, ChatError, ChatService};
