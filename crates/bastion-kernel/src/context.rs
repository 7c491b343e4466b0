//! Request-scoped execution context.
//!
//! Everything a request needs downstream (tenant, module, its single
//! [`RequestPolicy`], its cancellation token) travels in this value, passed
//! explicitly through every call boundary.

use crate::policy::{RequestPolicy, SensitivityConfig, SensitivitySignal};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Per-request context threaded through the chat pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: Uuid,
    tenant: String,
    module: String,
    policy: RequestPolicy,
    cancellation: CancellationToken,
}

impl RequestContext {
    /// Create a context with a fresh request id, a clean policy and a new
    /// cancellation token.
    pub fn new(tenant: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            tenant: tenant.into(),
            module: module.into(),
            policy: RequestPolicy::default(),
            cancellation: CancellationToken::new(),
        }
    }

    /// Derive and attach the request policy.
    #[must_use]
    pub fn with_sensitivity(mut self, signal: SensitivitySignal, config: &SensitivityConfig) -> Self {
        self.policy = RequestPolicy::derive(signal, config);
        self
    }

    /// Attach an already derived policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RequestPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use the caller's cancellation token (e.g. tied to the client
    /// connection).
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn policy(&self) -> &RequestPolicy {
        &self.policy
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Cancel everything still running on behalf of this request.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }
}
