//! Shared application state for the gateway

use bastion_foundation::{ChatService, CircuitBreakerRegistry, ResilientExecutor};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// State shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    /// Executor owning the circuit registry
    pub executor: Arc<ResilientExecutor>,
    /// Chat pipeline; absent when no LLM/SQL backends are wired in
    pub chat: Option<Arc<ChatService>>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(executor: Arc<ResilientExecutor>) -> Self {
        Self {
            executor,
            chat: None,
            started_at: Utc::now(),
        }
    }

    /// Serve chat through `chat`; its executor replaces the current one so
    /// health and admin routes see the same circuits.
    #[must_use]
    pub fn with_chat(mut self, chat: Arc<ChatService>) -> Self {
        self.executor = chat.executor().clone();
        self.chat = Some(chat);
        self
    }

    pub fn registry(&self) -> &Arc<CircuitBreakerRegistry> {
        self.executor.registry()
    }
}
