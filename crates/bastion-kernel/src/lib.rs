//! Bastion kernel.
//!
//! Contracts shared by every layer of the chat backend: the resilience error
//! taxonomy, the per-request sensitivity policy, the collaborator traits for
//! the LLM provider and the SQL surface, and configuration loading.
//! Concrete implementations live in `bastion-foundation`.

// error module
pub mod error;

// config module
pub mod config;

// dependency error classification
pub mod dependency;
pub use dependency::{DependencyError, DependencyResult};

// resilience contracts (circuit state, retry context, recorder)
pub mod resilience;

// sensitivity-aware request policy
pub mod policy;
pub use policy::{HandlingMode, PersistenceDecision, RequestPolicy, SensitivityConfig, SensitivitySignal};

// request-scoped execution context
pub mod context;
pub use context::RequestContext;

// LLM completion contracts
pub mod llm;

// SQL execution contracts
pub mod sql;

// tool registry
pub mod tool;

// semantic cache contracts
pub mod cache;

// tool result persistence contracts
pub mod storage;
