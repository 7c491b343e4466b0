//! Errors raised by outbound dependency calls (LLM provider, SQL surface)
//! and their retry classification.

use crate::resilience::Retryable;
use thiserror::Error;

/// Failure of a single call to an external dependency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DependencyError {
    /// The call did not complete in time
    #[error("dependency call timed out")]
    Timeout,

    /// The dependency asked us to slow down (HTTP 429)
    #[error("rate limited{}", retry_hint(.retry_after_ms))]
    RateLimited {
        /// Server-provided hint, milliseconds
        retry_after_ms: Option<u64>,
    },

    /// The dependency reported itself unavailable (HTTP 503)
    #[error("dependency unavailable: {0}")]
    Unavailable(String),

    /// Connection reset, DNS failure, broken pipe and friends
    #[error("transport failure: {0}")]
    Transport(String),

    /// Any other status-coded response
    #[error("status {code}: {message}")]
    Status {
        /// HTTP (or HTTP-equivalent) status code
        code: u16,
        /// Message returned by the dependency
        message: String,
    },

    /// The request was rejected as malformed
    #[error("validation failed: {0}")]
    Validation(String),

    /// The operation is not supported by this client
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The caller cancelled the call
    #[error("call cancelled")]
    Cancelled,
}

fn retry_hint(retry_after_ms: &Option<u64>) -> String {
    match retry_after_ms {
        Some(ms) => format!(" (retry after {ms}ms)"),
        None => String::new(),
    }
}

impl DependencyError {
    /// Build a status error, mapping the well-known transient codes onto
    /// their dedicated variants.
    pub fn from_status(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            429 => Self::RateLimited { retry_after_ms: None },
            503 => Self::Unavailable(message),
            _ => Self::Status { code, message },
        }
    }
}

impl Retryable for DependencyError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout
            | Self::RateLimited { .. }
            | Self::Unavailable(_)
            | Self::Transport(_) => true,
            Self::Status { code, .. } => *code == 429 || (500..600).contains(code),
            Self::Validation(_) | Self::Unsupported(_) | Self::Cancelled => false,
        }
    }

    fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result alias for dependency calls.
pub type DependencyResult<T> = Result<T, DependencyError>;
